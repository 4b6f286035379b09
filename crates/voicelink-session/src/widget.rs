//! Minimal one-room embedding without command relay or attributes.

use crate::error::SessionError;
use crate::room::{RoomConnector, RoomHandle};
use crate::token::TokenSource;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};
use voicelink_types::ConnectParams;

#[derive(Default)]
struct WidgetState {
    room: Option<Arc<dyn RoomHandle>>,
    /// Generation of the open currently in flight, if any.
    opening: Option<u64>,
    /// Bumped by every `close()`.
    generation: u64,
}

struct OpeningGuard<'a> {
    state: &'a Mutex<WidgetState>,
    generation: u64,
}

impl Drop for OpeningGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        if state.opening == Some(self.generation) {
            state.opening = None;
        }
    }
}

/// Fetches one credential and joins the room; nothing else.
///
/// The token request never carries a UI access token. A `close()` issued
/// while `open()` is pending wins: the late credential or room is dropped.
pub struct VoiceWidget {
    params: ConnectParams,
    token_source: Arc<dyn TokenSource>,
    connector: Arc<dyn RoomConnector>,
    state: Mutex<WidgetState>,
}

impl std::fmt::Debug for VoiceWidget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceWidget")
            .field("params", &self.params)
            .field("open", &self.is_open())
            .finish()
    }
}

impl VoiceWidget {
    pub fn new(
        params: ConnectParams,
        token_source: Arc<dyn TokenSource>,
        connector: Arc<dyn RoomConnector>,
    ) -> Self {
        Self {
            params: ConnectParams {
                ui_access_token: None,
                ..params
            },
            token_source,
            connector,
            state: Mutex::new(WidgetState::default()),
        }
    }

    /// Fetches a credential and joins the room.
    ///
    /// No-op when already open or while another `open()` is pending.
    pub async fn open(&self) -> Result<(), SessionError> {
        let generation = {
            let mut state = self.state.lock();
            if state.room.is_some() || state.opening == Some(state.generation) {
                return Ok(());
            }
            state.opening = Some(state.generation);
            state.generation
        };
        let _opening = OpeningGuard {
            state: &self.state,
            generation,
        };

        let credential = self.token_source.fetch_token(&self.params).await?;
        if self.is_stale(generation) {
            debug!(generation, "widget closed during token fetch; not joining");
            return Ok(());
        }

        let room = match self
            .connector
            .connect(&self.params.livekit_url, &credential)
            .await
        {
            Ok(room) => room,
            Err(e) if self.is_stale(generation) => {
                debug!(generation, error = %e, "room join failed after close; ignoring");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let stored = {
            let mut state = self.state.lock();
            if state.generation == generation {
                state.room = Some(room.clone());
                state.opening = None;
                true
            } else {
                false
            }
        };
        if !stored {
            debug!(generation, "widget closed during room join; leaving it");
            room.close().await;
            return Ok(());
        }

        info!(session_id = %self.params.session_id, "voice widget opened");
        Ok(())
    }

    /// Leaves the room and cancels any pending `open()`.
    pub async fn close(&self) {
        let room = {
            let mut state = self.state.lock();
            state.generation += 1;
            state.opening = None;
            state.room.take()
        };
        if let Some(room) = room {
            room.close().await;
            info!(session_id = %self.params.session_id, "voice widget closed");
        }
    }

    fn is_stale(&self, generation: u64) -> bool {
        self.state.lock().generation != generation
    }

    pub fn is_open(&self) -> bool {
        self.state.lock().room.is_some()
    }

    pub fn room(&self) -> Option<Arc<dyn RoomHandle>> {
        self.state.lock().room.clone()
    }
}

impl Drop for VoiceWidget {
    fn drop(&mut self) {
        let Some(room) = self.state.get_mut().room.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move { room.close().await });
            }
            Err(_) => warn!("no async runtime available; widget room dropped without close"),
        }
    }
}
