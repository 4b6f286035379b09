//! Configuration loading from TOML and environment variables.

use crate::audio::AudioSettings;
use crate::session::SessionOptions;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use url::Url;
use voicelink_types::{ConnectParams, DEFAULT_COMMANDS_TOPIC};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Token backend and room endpoints.
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Session behaviour.
    #[serde(default)]
    pub session: SessionSettings,

    /// Local audio devices used by the real-time adapter.
    #[serde(default)]
    pub audio: AudioSettings,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_request_timeout_secs() -> u64 {
    15
}

/// Where to get a credential and which room to join.
#[derive(Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Token endpoint (`POST`).
    #[serde(default)]
    pub server_url: String,
    /// Real-time server URL.
    #[serde(default)]
    pub livekit_url: String,
    /// Bearer token for the token endpoint.
    #[serde(default, skip_serializing)]
    pub client_token: String,
    #[serde(default)]
    pub agent_id: String,
    #[serde(default)]
    pub session_id: String,
    /// Forwarded to the agent as a participant attribute.
    #[serde(default, skip_serializing)]
    pub ui_access_token: Option<String>,
    /// Token request timeout in seconds. Default: 15.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            server_url: String::new(),
            livekit_url: String::new(),
            client_token: String::new(),
            agent_id: String::new(),
            session_id: String::new(),
            ui_access_token: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("server_url", &self.server_url)
            .field("livekit_url", &self.livekit_url)
            .field("client_token", &"[REDACTED]")
            .field("agent_id", &self.agent_id)
            .field("session_id", &self.session_id)
            .field(
                "ui_access_token",
                &self.ui_access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl ConnectionConfig {
    pub fn connect_params(&self) -> ConnectParams {
        ConnectParams {
            server_url: self.server_url.clone(),
            livekit_url: self.livekit_url.clone(),
            client_token: self.client_token.clone(),
            agent_id: self.agent_id.clone(),
            session_id: self.session_id.clone(),
            ui_access_token: self.ui_access_token.clone(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Checks that both endpoints are well-formed URLs and the agent is named.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_url("connection.server_url", &self.server_url, &["http", "https"])?;
        check_url(
            "connection.livekit_url",
            &self.livekit_url,
            &["ws", "wss", "http", "https"],
        )?;
        if self.agent_id.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "connection.agent_id must not be empty".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "connection.request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn check_url(field: &str, value: &str, schemes: &[&str]) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::Invalid(format!("{field} is not a valid URL: {e}")))?;
    if !schemes.contains(&url.scheme()) {
        return Err(ConfigError::Invalid(format!(
            "{field} has unsupported scheme '{}'",
            url.scheme()
        )));
    }
    Ok(())
}

fn default_commands_topic() -> String {
    DEFAULT_COMMANDS_TOPIC.to_string()
}

/// Session behaviour settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Data-channel topic carrying agent commands.
    #[serde(default = "default_commands_topic")]
    pub commands_topic: String,

    /// Connect as soon as the session starts.
    #[serde(default)]
    pub auto_connect: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            commands_topic: default_commands_topic(),
            auto_connect: false,
        }
    }
}

impl SessionSettings {
    pub fn options(&self) -> SessionOptions {
        SessionOptions {
            commands_topic: self.commands_topic.clone(),
            auto_connect: self.auto_connect,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "voicelink_session=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configuration parsed but is not usable.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `VOICELINK_SERVER_URL` overrides `connection.server_url`
/// - `VOICELINK_LIVEKIT_URL` overrides `connection.livekit_url`
/// - `VOICELINK_CLIENT_TOKEN` overrides `connection.client_token`
/// - `VOICELINK_AGENT_ID` overrides `connection.agent_id`
/// - `VOICELINK_SESSION_ID` overrides `connection.session_id`
/// - `VOICELINK_UI_ACCESS_TOKEN` overrides `connection.ui_access_token`
/// - `VOICELINK_COMMANDS_TOPIC` overrides `session.commands_topic`
/// - `VOICELINK_MICROPHONE` overrides `audio.microphone` ("true" or "1" enables)
/// - `VOICELINK_PLAYBACK` overrides `audio.playback` ("true" or "1" enables)
/// - `VOICELINK_LOG_LEVEL` overrides `logging.level`
/// - `VOICELINK_LOG_JSON` overrides `logging.json` (set to "true" to enable)
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    apply_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

/// Applies `VOICELINK_*` overrides looked up through `lookup`.
pub fn apply_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    let connection = &mut config.connection;
    for (key, slot) in [
        ("VOICELINK_SERVER_URL", &mut connection.server_url),
        ("VOICELINK_LIVEKIT_URL", &mut connection.livekit_url),
        ("VOICELINK_CLIENT_TOKEN", &mut connection.client_token),
        ("VOICELINK_AGENT_ID", &mut connection.agent_id),
        ("VOICELINK_SESSION_ID", &mut connection.session_id),
        ("VOICELINK_COMMANDS_TOPIC", &mut config.session.commands_topic),
        ("VOICELINK_LOG_LEVEL", &mut config.logging.level),
    ] {
        if let Some(value) = lookup(key) {
            *slot = value;
        }
    }
    if let Some(token) = lookup("VOICELINK_UI_ACCESS_TOKEN") {
        connection.ui_access_token = Some(token);
    }
    for (key, slot) in [
        ("VOICELINK_MICROPHONE", &mut config.audio.microphone),
        ("VOICELINK_PLAYBACK", &mut config.audio.playback),
        ("VOICELINK_LOG_JSON", &mut config.logging.json),
    ] {
        if let Some(value) = lookup(key) {
            *slot = is_truthy(&value);
        }
    }
}

fn is_truthy(value: &str) -> bool {
    value == "true" || value == "1"
}
