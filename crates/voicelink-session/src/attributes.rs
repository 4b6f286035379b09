//! Local participant attributes read by the server-side agent.

use crate::room::RoomHandle;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use voicelink_types::{ConnectParams, UI_ACCESS_TOKEN_ATTRIBUTE};

/// Attributes to publish for `params`: `{uiAccessToken}` when set, else nothing.
pub fn session_attributes(params: &ConnectParams) -> HashMap<String, String> {
    params
        .ui_access_token()
        .map(|token| {
            HashMap::from([(UI_ACCESS_TOKEN_ATTRIBUTE.to_string(), token.to_string())])
        })
        .unwrap_or_default()
}

/// Publishes `attributes` on the room's local participant in the background.
///
/// Fire-and-forget: failures are logged, never returned. Returns `None`
/// when there is nothing to publish.
pub fn publish_attributes(
    room: Arc<dyn RoomHandle>,
    attributes: HashMap<String, String>,
) -> Option<JoinHandle<()>> {
    if attributes.is_empty() {
        return None;
    }
    let keys: Vec<String> = attributes.keys().cloned().collect();
    Some(tokio::spawn(async move {
        match room.set_local_attributes(attributes).await {
            Ok(()) => debug!(?keys, "published participant attributes"),
            Err(e) => warn!(?keys, error = %e, "failed to publish participant attributes"),
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ConnectParams {
        ConnectParams::new("http://t", "ws://r", "ct", "a", "s")
    }

    #[test]
    fn no_attributes_without_ui_token() {
        assert!(session_attributes(&params()).is_empty());
        assert!(session_attributes(&params().with_ui_access_token("")).is_empty());
    }

    #[test]
    fn ui_token_becomes_attribute() {
        let attrs = session_attributes(&params().with_ui_access_token("abc"));
        assert_eq!(
            attrs,
            HashMap::from([("uiAccessToken".to_string(), "abc".to_string())])
        );
    }
}
