//! Shared types and protocol constants for voicelink.
//!
//! This crate holds the small value types every other voicelink crate
//! passes around: connection parameters and their per-call overrides, the
//! opaque session credential, the derived connection state, inbound data
//! packets, and the agent command message together with its parser.
//!
//! Nothing here performs I/O. The session crate owns the token fetch and
//! the room lifecycle; this crate only describes what flows through them.

use serde::{Deserialize, Serialize};

mod command;
mod params;

pub use command::{decode_command_payload, parse_agent_command, AgentCommandMessage};
pub use params::{ConnectOverride, ConnectParams, SessionCredential};

/// Data-channel topic the agent publishes commands on unless configured otherwise.
pub const DEFAULT_COMMANDS_TOPIC: &str = "agent_commands";

/// Participant attribute key carrying the UI access token for the agent.
pub const UI_ACCESS_TOKEN_ATTRIBUTE: &str = "uiAccessToken";

/// Command name that asks the host application to navigate.
pub const NAVIGATE_COMMAND: &str = "navigate";

/// Connection state of a voice session.
///
/// Always derived from the session's requested flag and credential; there
/// is no way to set it directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No credential is held.
    Disconnected,
    /// A credential fetch is in flight. The room mount that follows already
    /// reports `Connected`.
    Connecting,
    /// A credential is held and a connection was requested.
    Connected,
}

impl ConnectionState {
    /// Derives the state from the session's raw flags.
    pub fn derive(requested: bool, in_flight: bool, has_credential: bool) -> Self {
        if has_credential && requested {
            Self::Connected
        } else if in_flight {
            Self::Connecting
        } else {
            Self::Disconnected
        }
    }

    /// Returns the string label for this state.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delivery mode of a data packet on the real-time connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataPacketKind {
    /// Ordered, retransmitted delivery.
    #[default]
    Reliable,
    /// Best-effort delivery.
    Lossy,
}

/// A message received on the room's data channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPacket {
    /// Raw payload bytes.
    pub payload: Vec<u8>,
    /// Identity of the sending participant, when the transport reports one.
    pub participant: Option<String>,
    /// Delivery mode.
    pub kind: DataPacketKind,
    /// Topic the sender published on.
    pub topic: Option<String>,
}

impl DataPacket {
    /// Builds a reliable packet on `topic` carrying `text`.
    pub fn text(topic: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            payload: text.into().into_bytes(),
            participant: None,
            kind: DataPacketKind::Reliable,
            topic: Some(topic.into()),
        }
    }

    /// Returns a copy of this packet attributed to `identity`.
    pub fn from_participant(mut self, identity: impl Into<String>) -> Self {
        self.participant = Some(identity.into());
        self
    }

    /// Returns `true` if this packet was published on `topic`.
    ///
    /// Packets without a topic never match.
    pub fn is_on_topic(&self, topic: &str) -> bool {
        self.topic.as_deref() == Some(topic)
    }
}
