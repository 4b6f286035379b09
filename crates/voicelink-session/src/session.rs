//! Voice session lifecycle: fetch a credential, mount the room, tear down.
//!
//! States are exactly:
//!
//! | requested | credential | in flight | state          |
//! |-----------|------------|-----------|----------------|
//! | no        | none       | no        | `Disconnected` |
//! | yes       | none       | yes       | `Connecting`   |
//! | yes       | held       | -         | `Connected`    |
//!
//! `disconnect()` returns to the first row from anywhere. Every disconnect
//! bumps a generation counter; a fetch or mount that completes for an old
//! generation is discarded instead of reviving the session.

use crate::attributes::{publish_attributes, session_attributes};
use crate::error::SessionError;
use crate::navigator::{Navigator, NavigatorRegistry, RegistrationId};
use crate::relay::CommandRelay;
use crate::room::{RoomConnector, RoomHandle};
use crate::token::TokenSource;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use voicelink_types::{
    ConnectOverride, ConnectParams, ConnectionState, SessionCredential, DEFAULT_COMMANDS_TOPIC,
};

/// Behavioural switches for a [`VoiceSession`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Data-channel topic carrying agent commands.
    pub commands_topic: String,
    /// Whether [`VoiceSession::start`] connects immediately.
    pub auto_connect: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            commands_topic: DEFAULT_COMMANDS_TOPIC.to_string(),
            auto_connect: false,
        }
    }
}

struct Mounted {
    room: Arc<dyn RoomHandle>,
    relay: JoinHandle<()>,
}

impl Drop for Mounted {
    fn drop(&mut self) {
        self.relay.abort();
    }
}

/// Stops the relay now and closes the room on the current runtime.
fn close_in_background(mounted: Mounted) {
    let room = mounted.room.clone();
    drop(mounted);

    match tokio::runtime::Handle::try_current() {
        Ok(runtime) => {
            runtime.spawn(async move { room.close().await });
        }
        Err(_) => warn!("no async runtime available; room dropped without close"),
    }
}

struct SessionState {
    params: ConnectParams,
    requested: bool,
    /// Generation of the fetch currently in flight, if any.
    in_flight: Option<u64>,
    credential: Option<SessionCredential>,
    generation: u64,
    mounted: Option<Mounted>,
}

// Runs when the last session clone goes away.
impl Drop for SessionState {
    fn drop(&mut self) {
        if let Some(mounted) = self.mounted.take() {
            debug!("session dropped while connected; leaving room");
            close_in_background(mounted);
        }
    }
}

impl SessionState {
    fn connection_state(&self) -> ConnectionState {
        ConnectionState::derive(
            self.requested,
            self.in_flight.is_some(),
            self.credential.is_some(),
        )
    }

    /// Drops back to `Disconnected`, returning the mounted room if any.
    fn reset(&mut self) -> Option<Mounted> {
        self.requested = false;
        self.credential = None;
        self.in_flight = None;
        self.generation += 1;
        self.mounted.take()
    }
}

/// Clears the in-flight marker on every exit path of a connect attempt.
struct InFlightGuard<'a> {
    state: &'a Mutex<SessionState>,
    generation: u64,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        if state.in_flight == Some(self.generation) {
            state.in_flight = None;
        }
    }
}

/// A voice-AI session bound to one agent.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct VoiceSession {
    state: Arc<Mutex<SessionState>>,
    token_source: Arc<dyn TokenSource>,
    connector: Arc<dyn RoomConnector>,
    navigators: NavigatorRegistry,
    options: SessionOptions,
}

impl fmt::Debug for VoiceSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("VoiceSession")
            .field("params", &state.params)
            .field("state", &state.connection_state())
            .field("generation", &state.generation)
            .field("options", &self.options)
            .finish()
    }
}

impl VoiceSession {
    pub fn new(
        params: ConnectParams,
        token_source: Arc<dyn TokenSource>,
        connector: Arc<dyn RoomConnector>,
        options: SessionOptions,
    ) -> Self {
        let state = SessionState {
            params,
            requested: false,
            in_flight: None,
            credential: None,
            generation: 0,
            mounted: None,
        };
        Self {
            state: Arc::new(Mutex::new(state)),
            token_source,
            connector,
            navigators: NavigatorRegistry::new(),
            options,
        }
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Connects now if `auto_connect` is set. Returns whether it connected.
    pub async fn start(&self) -> Result<bool, SessionError> {
        if !self.options.auto_connect {
            return Ok(false);
        }
        self.connect(None).await?;
        Ok(true)
    }

    /// Replaces the parameters used by every later fetch.
    pub fn update_params(&self, params: ConnectParams) {
        self.state.lock().params = params;
    }

    pub fn params(&self) -> ConnectParams {
        self.state.lock().params.clone()
    }

    /// Requests a connection.
    ///
    /// `over` is merged into the latest parameters for this attempt only.
    /// A fetch starts only when no credential is held and none is already
    /// in flight; otherwise the call just records the request and returns.
    /// Token-fetch and room errors propagate to the caller.
    pub async fn connect(&self, over: Option<ConnectOverride>) -> Result<(), SessionError> {
        let (params, generation) = {
            let mut state = self.state.lock();
            state.requested = true;
            if state.credential.is_some() {
                debug!("credential already held; connect is a no-op");
                return Ok(());
            }
            if state.in_flight == Some(state.generation) {
                debug!("token fetch already in flight; connect is a no-op");
                return Ok(());
            }
            state.in_flight = Some(state.generation);
            let params = match &over {
                Some(over) => state.params.merged(over),
                None => state.params.clone(),
            };
            (params, state.generation)
        };
        let _in_flight = InFlightGuard {
            state: &self.state,
            generation,
        };

        info!(
            agent_id = %params.agent_id,
            session_id = %params.session_id,
            generation,
            "connecting voice session"
        );
        let credential = self.token_source.fetch_token(&params).await?;

        {
            let mut state = self.state.lock();
            if state.generation != generation || !state.requested {
                info!(generation, "discarding credential that arrived after disconnect");
                return Ok(());
            }
            state.credential = Some(credential.clone());
            state.in_flight = None;
        }

        let room = match self.connector.connect(&params.livekit_url, &credential).await {
            Ok(room) => room,
            Err(e) => {
                let mut state = self.state.lock();
                if state.generation != generation {
                    info!(generation, error = %e, "room join failed after disconnect; ignoring");
                    return Ok(());
                }
                state.reset();
                warn!(error = %e, "failed to join room");
                return Err(e);
            }
        };

        let mounted = {
            let mut state = self.state.lock();
            if state.generation == generation {
                let relay = CommandRelay::new(
                    self.options.commands_topic.clone(),
                    self.navigators.clone(),
                )
                .spawn(room.data_packets());
                publish_attributes(room.clone(), session_attributes(&params));
                state.mounted = Some(Mounted {
                    room: room.clone(),
                    relay,
                });
                true
            } else {
                false
            }
        };
        if !mounted {
            info!(generation, "room joined after disconnect; leaving it");
            room.close().await;
            return Ok(());
        }

        info!(
            session_id = %params.session_id,
            token_len = credential.len(),
            topic = %self.options.commands_topic,
            "voice session connected"
        );
        Ok(())
    }

    /// Drops the credential and unmounts the room immediately.
    ///
    /// State is cleared before this returns. The room is closed on a
    /// background task; use [`VoiceSession::shutdown`] to wait for it.
    pub fn disconnect(&self) {
        let mounted = self.state.lock().reset();
        let Some(mounted) = mounted else {
            debug!("disconnect requested with no mounted room");
            return;
        };
        close_in_background(mounted);
        info!("voice session disconnected");
    }

    /// Disconnects and waits for the room to close.
    pub async fn shutdown(&self) {
        let mounted = self.state.lock().reset();
        if let Some(mounted) = mounted {
            let room = mounted.room.clone();
            drop(mounted);
            room.close().await;
            info!("voice session shut down");
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state.lock().connection_state()
    }

    pub fn is_connecting(&self) -> bool {
        self.state.lock().in_flight.is_some()
    }

    pub fn is_connected(&self) -> bool {
        let state = self.state.lock();
        state.requested && state.credential.is_some()
    }

    /// The held credential, if any.
    pub fn credential(&self) -> Option<SessionCredential> {
        self.state.lock().credential.clone()
    }

    /// The mounted room, if the session is connected.
    pub fn room(&self) -> Option<Arc<dyn RoomHandle>> {
        self.state.lock().mounted.as_ref().map(|m| m.room.clone())
    }

    /// The navigator slot shared with [`crate::RouterBridge`].
    pub fn navigator_registry(&self) -> &NavigatorRegistry {
        &self.navigators
    }

    pub fn set_navigator(&self, navigator: Option<Navigator>) -> RegistrationId {
        self.navigators.set_navigator(navigator)
    }

    pub fn navigator(&self) -> Option<Navigator> {
        self.navigators.navigator()
    }
}
