//! Command-line driver for voicelink sessions.
//!
//! `token` exchanges the configured client token for a room credential and
//! reports its length. `listen` joins the agent's room and logs every
//! navigation the agent requests until interrupted.

use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use voicelink_session::normalize::path_only;
use voicelink_session::{
    BridgeOptions, Config, ConfigError, NavigateOptions, RoomConnector, RouterBridge,
    SessionError, TokenClient, TokenSource, VoiceSession,
};
use voicelink_types::SessionCredential;

/// Errors surfaced by the CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Session(#[from] SessionError),

    /// `listen` needs the `rtc` feature to join a real room.
    #[error("this build cannot join rooms; rebuild with `--features rtc`")]
    RtcUnavailable,
}

/// Picks the config file: CLI flag, then `VOICELINK_CONFIG_PATH`, then none.
///
/// Returns the path together with where it came from, for logging.
pub fn resolve_config_path(
    cli: Option<String>,
    env: Option<String>,
) -> (Option<String>, &'static str) {
    if let Some(path) = cli.filter(|value| !value.trim().is_empty()) {
        return (Some(path), "cli-arg");
    }
    if let Some(path) = env.filter(|value| !value.trim().is_empty()) {
        return (Some(path), "env-var");
    }
    (None, "default")
}

/// Requests a credential for the configured agent and session.
pub async fn request_token(config: &Config) -> Result<SessionCredential, CliError> {
    let client = TokenClient::with_timeout(config.connection.request_timeout())?;
    let credential = client
        .fetch_token(&config.connection.connect_params())
        .await?;
    info!(
        agent_id = %config.connection.agent_id,
        session_id = %config.connection.session_id,
        token_len = credential.len(),
        "token issued"
    );
    Ok(credential)
}

/// Joins the configured room and forwards agent navigations to `navigate`
/// until `shutdown` resolves.
///
/// Destinations are reduced to path, query and fragment before delivery.
pub async fn listen_with<F, S>(
    config: &Config,
    connector: Arc<dyn RoomConnector>,
    navigate: F,
    shutdown: S,
) -> Result<(), CliError>
where
    F: Fn(&str, NavigateOptions) + Send + Sync + 'static,
    S: Future<Output = ()>,
{
    let tokens = TokenClient::with_timeout(config.connection.request_timeout())?;
    let session = VoiceSession::new(
        config.connection.connect_params(),
        Arc::new(tokens),
        connector,
        config.session.options(),
    );
    let bridge = RouterBridge::mount(
        session.navigator_registry(),
        navigate,
        BridgeOptions::default().normalize_with(path_only),
    );

    session.connect(None).await?;
    info!(
        state = %session.state(),
        topic = %session.options().commands_topic,
        "listening for agent commands"
    );

    shutdown.await;

    bridge.unmount();
    session.shutdown().await;
    info!("session closed");
    Ok(())
}

/// Joins a real room with the LiveKit client SDK.
#[cfg(feature = "rtc")]
pub async fn listen<F, S>(config: &Config, navigate: F, shutdown: S) -> Result<(), CliError>
where
    F: Fn(&str, NavigateOptions) + Send + Sync + 'static,
    S: Future<Output = ()>,
{
    let connector = Arc::new(voicelink_session::LiveKitConnector::new().with_audio(config.audio));
    listen_with(config, connector, navigate, shutdown).await
}

#[cfg(not(feature = "rtc"))]
pub async fn listen<F, S>(_config: &Config, _navigate: F, _shutdown: S) -> Result<(), CliError>
where
    F: Fn(&str, NavigateOptions) + Send + Sync + 'static,
    S: Future<Output = ()>,
{
    Err(CliError::RtcUnavailable)
}

/// Waits for a SIGINT (Ctrl+C) or SIGTERM signal.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { tracing::info!("received SIGINT, shutting down"); }
        () = terminate => { tracing::info!("received SIGTERM, shutting down"); }
    }
}
