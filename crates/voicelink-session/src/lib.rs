//! Voice-AI session integration for voicelink.
//!
//! Lets a host application embed a real-time voice agent: it exchanges the
//! caller's bearer token for a short-lived room credential, joins the room
//! through a [`RoomConnector`], publishes the UI access token as a
//! participant attribute, and relays the agent's `navigate` commands from
//! the data channel into the host's own router.
//!
//! The pieces:
//!
//! - [`TokenClient`] issues the credential request ([`TokenSource`] is the seam)
//! - [`VoiceSession`] sequences fetch, mount and teardown
//! - [`CommandRelay`] turns data packets into navigator calls
//! - [`NavigatorRegistry`] and [`RouterBridge`] connect the relay to the host router
//! - [`VoiceWidget`] is the bare variant: join a room, nothing more
//!
//! With the `rtc` feature, `LiveKitConnector` joins rooms with the LiveKit
//! client SDK, publishes the microphone and plays the agent's audio.

pub mod attributes;
pub mod audio;
pub mod bridge;
pub mod config;
pub mod error;
pub mod navigator;
pub mod normalize;
pub mod relay;
pub mod room;
#[cfg(feature = "rtc")]
pub mod rtc;
pub mod session;
pub mod token;
pub mod widget;

pub use audio::AudioSettings;
pub use bridge::{BridgeOptions, NavigateOptions, RouterBridge, UrlNormalizer};
pub use config::{load_config, Config, ConfigError, ConnectionConfig, LoggingConfig};
pub use error::SessionError;
pub use navigator::{Navigator, NavigatorRegistry, RegistrationId};
pub use relay::{CommandRelay, RelayOutcome};
pub use room::{RoomConnector, RoomHandle, DATA_PACKET_CHANNEL_CAPACITY};
#[cfg(feature = "rtc")]
pub use rtc::LiveKitConnector;
pub use session::{SessionOptions, VoiceSession};
pub use token::{TokenClient, TokenRequest, TokenSource, DEFAULT_TOKEN_TIMEOUT};
pub use widget::VoiceWidget;
