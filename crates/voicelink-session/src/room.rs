//! The real-time room seam.
//!
//! Session code never talks to a transport directly. It asks a
//! [`RoomConnector`] to join a room with a credential and gets back a
//! [`RoomHandle`] that exposes the three things voicelink needs: inbound
//! data packets, local participant attributes, and teardown. Microphone
//! capture and playback of remote audio belong to the connector
//! implementation (see `LiveKitConnector` with the `rtc` feature).

use crate::error::SessionError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use voicelink_types::{DataPacket, SessionCredential};

/// Capacity of the per-room data packet broadcast channel.
pub const DATA_PACKET_CHANNEL_CAPACITY: usize = 256;

/// Joins real-time rooms.
#[async_trait]
pub trait RoomConnector: Send + Sync {
    async fn connect(
        &self,
        url: &str,
        credential: &SessionCredential,
    ) -> Result<Arc<dyn RoomHandle>, SessionError>;
}

/// A live room connection.
#[async_trait]
pub trait RoomHandle: Send + Sync {
    /// Subscribes to data packets received from now on.
    fn data_packets(&self) -> broadcast::Receiver<DataPacket>;

    /// Replaces key/value attributes on the local participant.
    async fn set_local_attributes(
        &self,
        attributes: HashMap<String, String>,
    ) -> Result<(), SessionError>;

    /// Leaves the room. Idempotent.
    async fn close(&self);
}
