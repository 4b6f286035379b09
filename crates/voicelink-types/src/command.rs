//! Agent command messages carried on the data channel.
//!
//! The agent publishes UTF-8 JSON of the form
//! `{"command": "<name>", "data": <anything>}`. Payloads come from a peer
//! the host does not control, so parsing never fails loudly: anything that
//! is not an object with a string `command` yields `None` and is dropped.

use crate::NAVIGATE_COMMAND;
use serde_json::Value;

/// A decoded command from the agent.
///
/// `data` is passed through untyped. It is `None` when the field is absent
/// and `Some(Value::Null)` when the agent sent an explicit `null`.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentCommandMessage {
    pub command: String,
    pub data: Option<Value>,
}

impl AgentCommandMessage {
    /// Returns the destination if this is a `navigate` command with string data.
    pub fn navigate_target(&self) -> Option<&str> {
        if self.command != NAVIGATE_COMMAND {
            return None;
        }
        self.data.as_ref().and_then(Value::as_str)
    }
}

/// Parses a raw text payload into a command.
///
/// Returns `None` for malformed JSON, non-object JSON, and objects whose
/// `command` field is missing or not a string. Unknown command names are
/// returned as-is.
pub fn parse_agent_command(raw: &str) -> Option<AgentCommandMessage> {
    let Value::Object(mut fields) = serde_json::from_str::<Value>(raw).ok()? else {
        return None;
    };
    let Some(Value::String(command)) = fields.remove("command") else {
        return None;
    };
    Some(AgentCommandMessage {
        command,
        data: fields.remove("data"),
    })
}

/// Decodes a data-channel payload as UTF-8 (lossily) and parses it.
pub fn decode_command_payload(payload: &[u8]) -> Option<AgentCommandMessage> {
    parse_agent_command(&String::from_utf8_lossy(payload))
}
