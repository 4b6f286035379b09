//! Relays agent commands from the data channel to the navigator slot.

use crate::navigator::NavigatorRegistry;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use voicelink_types::{decode_command_payload, DataPacket};

/// What the relay did with one packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Packet was published on a different topic (or none).
    OffTopic,
    /// Payload was not a command message; dropped.
    Malformed,
    /// A well-formed command other than a usable `navigate`; ignored.
    Ignored { command: String },
    /// `navigate` arrived but no navigator is registered.
    NoNavigator { destination: String },
    /// The navigator was invoked.
    Navigated { destination: String },
}

/// Subscriber for one commands topic.
#[derive(Debug, Clone)]
pub struct CommandRelay {
    topic: String,
    navigators: NavigatorRegistry,
}

impl CommandRelay {
    pub fn new(topic: impl Into<String>, navigators: NavigatorRegistry) -> Self {
        Self {
            topic: topic.into(),
            navigators,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Handles a single packet. Never fails; bad input is dropped.
    pub fn handle_packet(&self, packet: &DataPacket) -> RelayOutcome {
        if !packet.is_on_topic(&self.topic) {
            return RelayOutcome::OffTopic;
        }

        let Some(message) = decode_command_payload(&packet.payload) else {
            debug!(
                topic = %self.topic,
                participant = ?packet.participant,
                bytes = packet.payload.len(),
                "dropping malformed agent command"
            );
            return RelayOutcome::Malformed;
        };

        let Some(destination) = message.navigate_target() else {
            debug!(command = %message.command, "ignoring agent command");
            return RelayOutcome::Ignored {
                command: message.command,
            };
        };

        let destination = destination.to_string();
        if self.navigators.navigate(&destination) {
            info!(%destination, "agent navigation relayed");
            RelayOutcome::Navigated { destination }
        } else {
            debug!(%destination, "no navigator registered; navigation dropped");
            RelayOutcome::NoNavigator { destination }
        }
    }

    /// Consumes packets until the sender side is closed.
    pub async fn run(self, mut packets: broadcast::Receiver<DataPacket>) {
        loop {
            match packets.recv().await {
                Ok(packet) => {
                    self.handle_packet(&packet);
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, topic = %self.topic, "command relay lagged; packets lost");
                }
                Err(RecvError::Closed) => break,
            }
        }
        debug!(topic = %self.topic, "command relay stopped");
    }

    pub fn spawn(self, packets: broadcast::Receiver<DataPacket>) -> JoinHandle<()> {
        tokio::spawn(self.run(packets))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use voicelink_types::DEFAULT_COMMANDS_TOPIC;

    fn relay_with_recorder() -> (CommandRelay, Arc<Mutex<Vec<String>>>) {
        let registry = NavigatorRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        registry.set_navigator(Some(Arc::new(move |to: &str| {
            sink.lock().push(to.to_string())
        })));
        (CommandRelay::new(DEFAULT_COMMANDS_TOPIC, registry), seen)
    }

    fn packet(text: &str) -> DataPacket {
        DataPacket::text(DEFAULT_COMMANDS_TOPIC, text)
    }

    #[test]
    fn navigate_invokes_navigator() {
        let (relay, seen) = relay_with_recorder();
        let outcome = relay.handle_packet(&packet(r#"{"command":"navigate","data":"/billing"}"#));
        assert_eq!(
            outcome,
            RelayOutcome::Navigated {
                destination: "/billing".into()
            }
        );
        assert_eq!(*seen.lock(), vec!["/billing"]);
    }

    #[test]
    fn ping_does_not_navigate() {
        let (relay, seen) = relay_with_recorder();
        let outcome = relay.handle_packet(&packet(r#"{"command":"ping"}"#));
        assert_eq!(
            outcome,
            RelayOutcome::Ignored {
                command: "ping".into()
            }
        );
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn navigate_with_non_string_data_is_ignored() {
        let (relay, seen) = relay_with_recorder();
        let outcome = relay.handle_packet(&packet(r#"{"command":"navigate","data":{"to":"/x"}}"#));
        assert!(matches!(outcome, RelayOutcome::Ignored { .. }));
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn malformed_payloads_are_dropped() {
        let (relay, seen) = relay_with_recorder();
        for raw in ["not json", "[1,2]", r#"{"data":"/x"}"#, r#"{"command":1}"#] {
            assert_eq!(relay.handle_packet(&packet(raw)), RelayOutcome::Malformed);
        }
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn other_topics_are_ignored() {
        let (relay, seen) = relay_with_recorder();
        let body = r#"{"command":"navigate","data":"/billing"}"#;

        let elsewhere = DataPacket::text("chat", body);
        assert_eq!(relay.handle_packet(&elsewhere), RelayOutcome::OffTopic);

        let untopiced = DataPacket {
            topic: None,
            ..packet(body)
        };
        assert_eq!(relay.handle_packet(&untopiced), RelayOutcome::OffTopic);
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn custom_topic_is_honoured() {
        let registry = NavigatorRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        registry.set_navigator(Some(Arc::new(move |to: &str| {
            sink.lock().push(to.to_string())
        })));
        let relay = CommandRelay::new("ui", registry);

        let body = r#"{"command":"navigate","data":"/x"}"#;
        assert_eq!(
            relay.handle_packet(&DataPacket::text(DEFAULT_COMMANDS_TOPIC, body)),
            RelayOutcome::OffTopic
        );
        relay.handle_packet(&DataPacket::text("ui", body));
        assert_eq!(*seen.lock(), vec!["/x"]);
    }

    #[test]
    fn navigate_without_navigator_is_silent() {
        let relay = CommandRelay::new(DEFAULT_COMMANDS_TOPIC, NavigatorRegistry::new());
        let outcome = relay.handle_packet(&packet(r#"{"command":"navigate","data":"/billing"}"#));
        assert_eq!(
            outcome,
            RelayOutcome::NoNavigator {
                destination: "/billing".into()
            }
        );
    }

    #[tokio::test]
    async fn run_drains_until_sender_closes() {
        let (relay, seen) = relay_with_recorder();
        let (tx, rx) = broadcast::channel(16);
        let task = relay.spawn(rx);

        tx.send(packet(r#"{"command":"navigate","data":"/a"}"#)).unwrap();
        tx.send(packet("garbage")).unwrap();
        tx.send(packet(r#"{"command":"navigate","data":"/b"}"#)).unwrap();
        drop(tx);

        task.await.unwrap();
        assert_eq!(*seen.lock(), vec!["/a", "/b"]);
    }
}
