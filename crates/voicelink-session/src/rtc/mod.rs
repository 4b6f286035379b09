//! [`RoomConnector`] over the LiveKit client SDK.
//!
//! Rooms are joined with the SDK defaults, which auto-subscribe to remote
//! tracks. With audio enabled the connector publishes the default input
//! device as the microphone track and plays every subscribed remote audio
//! track on the default output device.

mod devices;

use crate::audio::{f32_to_i16, frame_samples, i16_to_f32, AudioSettings, FRAME_MILLIS};
use crate::error::SessionError;
use crate::room::{RoomConnector, RoomHandle, DATA_PACKET_CHANNEL_CAPACITY};
use ::livekit::options::TrackPublishOptions;
use ::livekit::prelude::*;
use ::livekit::track::{LocalAudioTrack, LocalTrack, RemoteTrack, TrackSource};
use ::livekit::webrtc::audio_source::native::NativeAudioSource;
use ::livekit::webrtc::audio_stream::native::NativeAudioStream;
use ::livekit::webrtc::prelude::{AudioFrame, AudioSourceOptions, RtcAudioSource, RtcAudioTrack};
use async_trait::async_trait;
use devices::{AudioDevices, Capture, Playback};
use futures_util::StreamExt;
use parking_lot::Mutex;
use ringbuf::traits::*;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use voicelink_types::{DataPacket, DataPacketKind as PacketKind, SessionCredential};

/// Milliseconds of microphone audio the source may queue.
const SOURCE_QUEUE_MS: u32 = 1000;

#[derive(Debug, Clone, Default)]
pub struct LiveKitConnector {
    audio: AudioSettings,
}

impl LiveKitConnector {
    /// Connector with microphone and playback enabled.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_audio(mut self, audio: AudioSettings) -> Self {
        self.audio = audio;
        self
    }

    async fn open_devices(&self) -> Option<AudioDevices> {
        if !self.audio.is_enabled() {
            return None;
        }
        let settings = self.audio;
        match tokio::task::spawn_blocking(move || AudioDevices::open(settings)).await {
            Ok(Ok(devices)) => Some(devices),
            Ok(Err(e)) => {
                warn!(error = %e, "audio devices unavailable; joining without audio");
                None
            }
            Err(e) => {
                warn!(error = %e, "audio device task failed; joining without audio");
                None
            }
        }
    }
}

#[async_trait]
impl RoomConnector for LiveKitConnector {
    async fn connect(
        &self,
        url: &str,
        credential: &SessionCredential,
    ) -> Result<Arc<dyn RoomHandle>, SessionError> {
        info!(url, token_len = credential.len(), "joining LiveKit room");
        let (room, mut events) = Room::connect(url, credential.as_str(), RoomOptions::default())
            .await
            .map_err(|e| SessionError::Room(e.to_string()))?;

        let devices = self.open_devices().await;

        let microphone = match devices.as_ref().and_then(|d| d.capture.clone()) {
            Some(capture) => match publish_microphone(&room, capture).await {
                Ok(task) => Some(task),
                Err(e) => {
                    warn!(error = %e, "failed to publish microphone");
                    None
                }
            },
            None => None,
        };

        let speaker = devices.as_ref().and_then(|d| d.playback.clone());
        let players: Arc<Mutex<Vec<JoinHandle<()>>>> = Arc::default();

        let (packets, _) = broadcast::channel(DATA_PACKET_CHANNEL_CAPACITY);
        let forward = packets.clone();
        let pump_players = players.clone();
        let pump = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match event {
                    RoomEvent::DataReceived {
                        payload,
                        topic,
                        kind,
                        participant,
                        ..
                    } => {
                        let packet = DataPacket {
                            payload: payload.to_vec(),
                            participant: participant.map(|p| p.identity().0),
                            kind: match kind {
                                DataPacketKind::Lossy => PacketKind::Lossy,
                                _ => PacketKind::Reliable,
                            },
                            topic,
                        };
                        // No receivers just means the relay is not running.
                        let _ = forward.send(packet);
                    }
                    RoomEvent::TrackSubscribed {
                        track, participant, ..
                    } => {
                        debug!(participant = %participant.identity().0, "subscribed to remote track");
                        if let (RemoteTrack::Audio(audio), Some(speaker)) = (track, &speaker) {
                            let player = play_remote_audio(audio.rtc_track(), speaker.clone());
                            pump_players.lock().push(player);
                        }
                    }
                    RoomEvent::Disconnected { .. } => {
                        info!("LiveKit room disconnected");
                        break;
                    }
                    _ => {}
                }
            }
        });

        Ok(Arc::new(LiveKitRoomHandle {
            room,
            packets,
            pump,
            microphone,
            players,
            devices: Mutex::new(devices),
        }))
    }
}

/// Publishes `capture` as the local microphone track and feeds it in
/// fixed-size frames.
async fn publish_microphone(room: &Room, capture: Capture) -> Result<JoinHandle<()>, SessionError> {
    let source = NativeAudioSource::new(
        AudioSourceOptions::default(),
        capture.sample_rate,
        1,
        SOURCE_QUEUE_MS,
    );
    let track =
        LocalAudioTrack::create_audio_track("microphone", RtcAudioSource::Native(source.clone()));
    room.local_participant()
        .publish_track(
            LocalTrack::Audio(track),
            TrackPublishOptions {
                source: TrackSource::Microphone,
                ..Default::default()
            },
        )
        .await
        .map_err(|e| SessionError::Room(e.to_string()))?;
    info!(sample_rate = capture.sample_rate, "microphone published");

    Ok(tokio::spawn(async move {
        let sample_rate = capture.sample_rate;
        let frame_len = frame_samples(sample_rate);
        let mut scratch = vec![0.0f32; frame_len];
        let mut tick = tokio::time::interval(Duration::from_millis(FRAME_MILLIS as u64));
        loop {
            tick.tick().await;
            loop {
                let data: Vec<i16> = {
                    let mut ring = capture.samples.lock();
                    if ring.occupied_len() < frame_len {
                        break;
                    }
                    ring.pop_slice(&mut scratch);
                    scratch.iter().copied().map(f32_to_i16).collect()
                };
                let frame = AudioFrame {
                    data: data.into(),
                    sample_rate,
                    num_channels: 1,
                    samples_per_channel: frame_len as u32,
                };
                if let Err(e) = source.capture_frame(&frame).await {
                    warn!(error = %e, "dropping microphone frame");
                }
            }
        }
    }))
}

/// Decodes a remote audio track at the speaker's format into its ring.
fn play_remote_audio(track: RtcAudioTrack, speaker: Playback) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut stream =
            NativeAudioStream::new(track, speaker.sample_rate as i32, speaker.channels as i32);
        while let Some(frame) = stream.next().await {
            let samples: Vec<f32> = frame.data.iter().copied().map(i16_to_f32).collect();
            speaker.samples.lock().push_slice(&samples);
        }
        debug!("remote audio track ended");
    })
}

struct LiveKitRoomHandle {
    room: Room,
    packets: broadcast::Sender<DataPacket>,
    pump: JoinHandle<()>,
    microphone: Option<JoinHandle<()>>,
    players: Arc<Mutex<Vec<JoinHandle<()>>>>,
    devices: Mutex<Option<AudioDevices>>,
}

#[async_trait]
impl RoomHandle for LiveKitRoomHandle {
    fn data_packets(&self) -> broadcast::Receiver<DataPacket> {
        self.packets.subscribe()
    }

    async fn set_local_attributes(
        &self,
        attributes: HashMap<String, String>,
    ) -> Result<(), SessionError> {
        self.room
            .local_participant()
            .set_attributes(attributes)
            .await
            .map_err(|e| SessionError::Room(e.to_string()))
    }

    async fn close(&self) {
        self.pump.abort();
        if let Some(microphone) = &self.microphone {
            microphone.abort();
        }
        let players = std::mem::take(&mut *self.players.lock());
        for player in players {
            player.abort();
        }
        if let Err(e) = self.room.close().await {
            warn!(error = %e, "error while leaving LiveKit room");
        }
        // Stops the device streams.
        self.devices.lock().take();
    }
}
