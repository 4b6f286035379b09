#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, Semaphore};
use voicelink_session::{
    Navigator, RoomConnector, RoomHandle, SessionError, SessionOptions, TokenSource, VoiceSession,
    DATA_PACKET_CHANNEL_CAPACITY,
};
use voicelink_types::{ConnectParams, DataPacket, SessionCredential, DEFAULT_COMMANDS_TOPIC};

pub const LIVEKIT_URL: &str = "wss://rtc.example.com";

pub fn params() -> ConnectParams {
    ConnectParams::new(
        "https://api.example.com/voice/token",
        LIVEKIT_URL,
        "client-123",
        "support-agent",
        "session-1",
    )
}

/// Token source that hands out `token-1`, `token-2`, ... and records every request.
///
/// When gated, each fetch waits for a permit added with [`StubTokenSource::release`].
#[derive(Default)]
pub struct StubTokenSource {
    calls: AtomicUsize,
    seen: Mutex<Vec<ConnectParams>>,
    gate: Option<Semaphore>,
    fail_status: Option<u16>,
}

impl StubTokenSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn gated() -> Arc<Self> {
        Arc::new(Self {
            gate: Some(Semaphore::new(0)),
            ..Self::default()
        })
    }

    pub fn failing(status: u16) -> Arc<Self> {
        Arc::new(Self {
            fail_status: Some(status),
            ..Self::default()
        })
    }

    pub fn release(&self, fetches: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(fetches);
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<ConnectParams> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl TokenSource for StubTokenSource {
    async fn fetch_token(&self, params: &ConnectParams) -> Result<SessionCredential, SessionError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.seen.lock().push(params.clone());
        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        }
        if let Some(status) = self.fail_status {
            return Err(SessionError::TokenStatus {
                status,
                body: "denied".to_string(),
            });
        }
        Ok(SessionCredential::new(format!("token-{n}")))
    }
}

/// In-memory room that records attributes and close calls.
pub struct MockRoom {
    packets: broadcast::Sender<DataPacket>,
    attributes: Mutex<Vec<HashMap<String, String>>>,
    closed: AtomicBool,
    fail_attributes: bool,
}

impl MockRoom {
    fn new(fail_attributes: bool) -> Self {
        let (packets, _) = broadcast::channel(DATA_PACKET_CHANNEL_CAPACITY);
        Self {
            packets,
            attributes: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
            fail_attributes,
        }
    }

    /// Delivers a packet to current subscribers; returns how many there were.
    pub fn send(&self, packet: DataPacket) -> usize {
        self.packets.send(packet).unwrap_or(0)
    }

    pub fn send_command(&self, json: &str) -> usize {
        self.send(DataPacket::text(DEFAULT_COMMANDS_TOPIC, json).from_participant("agent"))
    }

    pub fn attribute_calls(&self) -> Vec<HashMap<String, String>> {
        self.attributes.lock().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RoomHandle for MockRoom {
    fn data_packets(&self) -> broadcast::Receiver<DataPacket> {
        self.packets.subscribe()
    }

    async fn set_local_attributes(
        &self,
        attributes: HashMap<String, String>,
    ) -> Result<(), SessionError> {
        self.attributes.lock().push(attributes);
        if self.fail_attributes {
            return Err(SessionError::Room("permission denied".to_string()));
        }
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Connector that builds [`MockRoom`]s and records `(url, token)` per join.
#[derive(Default)]
pub struct MockConnector {
    joins: Mutex<Vec<(String, String)>>,
    rooms: Mutex<Vec<Arc<MockRoom>>>,
    refuse: bool,
    fail_attributes: bool,
    gate: Option<Semaphore>,
}

impl MockConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn refusing() -> Arc<Self> {
        Arc::new(Self {
            refuse: true,
            ..Self::default()
        })
    }

    pub fn with_failing_attributes() -> Arc<Self> {
        Arc::new(Self {
            fail_attributes: true,
            ..Self::default()
        })
    }

    /// Each join waits for a permit added with [`MockConnector::release`].
    pub fn gated() -> Arc<Self> {
        Arc::new(Self {
            gate: Some(Semaphore::new(0)),
            ..Self::default()
        })
    }

    pub fn gated_refusing() -> Arc<Self> {
        Arc::new(Self {
            gate: Some(Semaphore::new(0)),
            refuse: true,
            ..Self::default()
        })
    }

    pub fn release(&self, joins: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(joins);
        }
    }

    pub fn joins(&self) -> Vec<(String, String)> {
        self.joins.lock().clone()
    }

    pub fn last_room(&self) -> Arc<MockRoom> {
        self.rooms.lock().last().cloned().expect("no room joined")
    }
}

#[async_trait]
impl RoomConnector for MockConnector {
    async fn connect(
        &self,
        url: &str,
        credential: &SessionCredential,
    ) -> Result<Arc<dyn RoomHandle>, SessionError> {
        self.joins
            .lock()
            .push((url.to_string(), credential.as_str().to_string()));
        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        }
        if self.refuse {
            return Err(SessionError::Room("connection refused".to_string()));
        }
        let room = Arc::new(MockRoom::new(self.fail_attributes));
        self.rooms.lock().push(room.clone());
        Ok(room)
    }
}

pub fn session(
    tokens: Arc<StubTokenSource>,
    connector: Arc<MockConnector>,
    params: ConnectParams,
) -> VoiceSession {
    VoiceSession::new(params, tokens, connector, SessionOptions::default())
}

/// Navigator that forwards every destination into a channel.
pub fn channel_navigator() -> (Navigator, mpsc::UnboundedReceiver<String>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let navigator: Navigator = Arc::new(move |to: &str| {
        let _ = tx.send(to.to_string());
    });
    (navigator, rx)
}

pub async fn next_destination(rx: &mut mpsc::UnboundedReceiver<String>) -> String {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for navigation")
        .expect("navigator channel closed")
}

/// Lets spawned tasks run, then asserts nothing was navigated.
pub async fn assert_no_navigation(rx: &mut mpsc::UnboundedReceiver<String>) {
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(rx.try_recv().is_err(), "unexpected navigation");
}

/// Polls `check` until it holds or two seconds pass.
pub async fn eventually(mut check: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !check() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached in time"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
