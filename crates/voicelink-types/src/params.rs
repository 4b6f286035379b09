//! Connection parameters and the session credential.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Everything needed to request a credential and join the room.
///
/// `client_token` authenticates against the token backend; it is not the
/// room credential. `ui_access_token` is optional and an empty string is
/// treated the same as `None`.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectParams {
    pub server_url: String,
    pub livekit_url: String,
    pub client_token: String,
    pub agent_id: String,
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui_access_token: Option<String>,
}

impl fmt::Debug for ConnectParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectParams")
            .field("server_url", &self.server_url)
            .field("livekit_url", &self.livekit_url)
            .field("client_token", &"[REDACTED]")
            .field("agent_id", &self.agent_id)
            .field("session_id", &self.session_id)
            .field(
                "ui_access_token",
                &self.ui_access_token().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl ConnectParams {
    pub fn new(
        server_url: impl Into<String>,
        livekit_url: impl Into<String>,
        client_token: impl Into<String>,
        agent_id: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            server_url: server_url.into(),
            livekit_url: livekit_url.into(),
            client_token: client_token.into(),
            agent_id: agent_id.into(),
            session_id: session_id.into(),
            ui_access_token: None,
        }
    }

    /// Sets the UI access token forwarded to the agent.
    pub fn with_ui_access_token(mut self, token: impl Into<String>) -> Self {
        self.ui_access_token = Some(token.into());
        self
    }

    /// Returns the UI access token if one is set and non-empty.
    pub fn ui_access_token(&self) -> Option<&str> {
        self.ui_access_token.as_deref().filter(|t| !t.is_empty())
    }

    /// Returns a copy with every field supplied by `over` replaced.
    pub fn merged(&self, over: &ConnectOverride) -> Self {
        let pick = |base: &String, o: &Option<String>| o.clone().unwrap_or_else(|| base.clone());
        Self {
            server_url: pick(&self.server_url, &over.server_url),
            livekit_url: pick(&self.livekit_url, &over.livekit_url),
            client_token: pick(&self.client_token, &over.client_token),
            agent_id: pick(&self.agent_id, &over.agent_id),
            session_id: pick(&self.session_id, &over.session_id),
            ui_access_token: over
                .ui_access_token
                .clone()
                .or_else(|| self.ui_access_token.clone()),
        }
    }
}

/// Per-call overrides for [`ConnectParams`]. Unset fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectOverride {
    #[serde(default)]
    pub server_url: Option<String>,
    #[serde(default)]
    pub livekit_url: Option<String>,
    #[serde(default)]
    pub client_token: Option<String>,
    #[serde(default)]
    pub agent_id: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub ui_access_token: Option<String>,
}

impl ConnectOverride {
    /// Overrides only the session id, the most common per-call change.
    pub fn session(session_id: impl Into<String>) -> Self {
        Self {
            session_id: Some(session_id.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Opaque room credential issued by the token backend.
///
/// Lives in memory only and is dropped on disconnect.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionCredential(String);

impl SessionCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SessionCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionCredential(len={})", self.0.len())
    }
}
