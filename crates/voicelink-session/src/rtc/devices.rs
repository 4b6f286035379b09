//! Default input and output devices through cpal.
//!
//! cpal streams are not `Send`, so they live on a dedicated thread for as
//! long as [`AudioDevices`] exists. Samples cross over through ring buffers:
//! the capture ring holds mono samples, the playback ring holds samples
//! interleaved for the output device.

use crate::audio::{downmix_to_mono, AudioSettings};
use crate::error::SessionError;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, SampleRate, Stream, StreamConfig, SupportedStreamConfigRange};
use parking_lot::Mutex;
use ringbuf::{traits::*, HeapRb};
use std::sync::{mpsc, Arc};
use tracing::{error, info, warn};

/// Device rate asked for first.
const PREFERRED_SAMPLE_RATE: u32 = 48_000;

/// Seconds of audio each ring can buffer before new samples are dropped.
const RING_SECONDS: usize = 1;

pub(crate) type SampleRing = Arc<Mutex<HeapRb<f32>>>;

fn ring(sample_rate: u32, channels: u16) -> SampleRing {
    let capacity = sample_rate as usize * channels as usize * RING_SECONDS;
    Arc::new(Mutex::new(HeapRb::new(capacity)))
}

fn audio_err(e: impl std::fmt::Display) -> SessionError {
    SessionError::Audio(e.to_string())
}

/// Microphone samples, mono at `sample_rate`.
#[derive(Clone)]
pub(crate) struct Capture {
    pub samples: SampleRing,
    pub sample_rate: u32,
}

/// Speaker samples, interleaved `channels`-wide at `sample_rate`.
#[derive(Clone)]
pub(crate) struct Playback {
    pub samples: SampleRing,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Running device streams. Dropping this stops them.
pub(crate) struct AudioDevices {
    pub capture: Option<Capture>,
    pub playback: Option<Playback>,
    _stop: mpsc::Sender<()>,
}

impl AudioDevices {
    /// Opens the default devices `settings` asks for and starts them.
    ///
    /// Blocks until the streams are running. A missing device disables that
    /// direction with a warning; a device that fails to start is an error.
    pub fn open(settings: AudioSettings) -> Result<Self, SessionError> {
        let (ready_tx, ready_rx) = mpsc::channel();
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        std::thread::Builder::new()
            .name("voicelink-audio".to_string())
            .spawn(move || {
                let streams = match start_streams(settings) {
                    Ok((streams, capture, playback)) => {
                        let _ = ready_tx.send(Ok((capture, playback)));
                        streams
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                // Returns once the owning AudioDevices is dropped.
                let _ = stop_rx.recv();
                drop(streams);
                info!("audio streams stopped");
            })
            .map_err(audio_err)?;

        let (capture, playback) = ready_rx
            .recv()
            .map_err(|_| SessionError::Audio("audio thread exited during startup".to_string()))??;

        Ok(Self {
            capture,
            playback,
            _stop: stop_tx,
        })
    }
}

type Started = (Vec<Stream>, Option<Capture>, Option<Playback>);

fn start_streams(settings: AudioSettings) -> Result<Started, SessionError> {
    let host = cpal::default_host();
    let mut streams = Vec::new();

    let capture = match (settings.microphone, host.default_input_device()) {
        (false, _) => None,
        (true, None) => {
            warn!("no audio input device found; microphone disabled");
            None
        }
        (true, Some(device)) => {
            let (stream, capture) = start_capture(&device)?;
            streams.push(stream);
            Some(capture)
        }
    };

    let playback = match (settings.playback, host.default_output_device()) {
        (false, _) => None,
        (true, None) => {
            warn!("no audio output device found; playback disabled");
            None
        }
        (true, Some(device)) => {
            let (stream, playback) = start_playback(&device)?;
            streams.push(stream);
            Some(playback)
        }
    };

    Ok((streams, capture, playback))
}

fn start_capture(device: &Device) -> Result<(Stream, Capture), SessionError> {
    let configs = device.supported_input_configs().map_err(audio_err)?;
    let config = select_config(configs.collect())?;
    let channels = config.channels as usize;
    let capture = Capture {
        samples: ring(config.sample_rate.0, 1),
        sample_rate: config.sample_rate.0,
    };

    let samples = capture.samples.clone();
    let stream = device
        .build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let mono = downmix_to_mono(data, channels);
                samples.lock().push_slice(&mono);
            },
            |err| error!(error = %err, "audio capture error"),
            None,
        )
        .map_err(audio_err)?;
    stream.play().map_err(audio_err)?;

    info!(
        sample_rate = capture.sample_rate,
        channels, "microphone capture started"
    );
    Ok((stream, capture))
}

fn start_playback(device: &Device) -> Result<(Stream, Playback), SessionError> {
    let configs = device.supported_output_configs().map_err(audio_err)?;
    let config = select_config(configs.collect())?;
    let playback = Playback {
        samples: ring(config.sample_rate.0, config.channels),
        sample_rate: config.sample_rate.0,
        channels: config.channels,
    };

    let samples = playback.samples.clone();
    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let filled = samples.lock().pop_slice(data);
                data[filled..].fill(0.0);
            },
            |err| error!(error = %err, "audio playback error"),
            None,
        )
        .map_err(audio_err)?;
    stream.play().map_err(audio_err)?;

    info!(
        sample_rate = playback.sample_rate,
        channels = playback.channels,
        "audio playback started"
    );
    Ok((stream, playback))
}

/// Picks an `f32` configuration, at 48 kHz when the device allows it.
fn select_config(configs: Vec<SupportedStreamConfigRange>) -> Result<StreamConfig, SessionError> {
    let preferred = SampleRate(PREFERRED_SAMPLE_RATE);
    let float: Vec<_> = configs
        .into_iter()
        .filter(|c| c.sample_format() == SampleFormat::F32)
        .collect();

    if let Some(range) = float
        .iter()
        .find(|c| c.min_sample_rate() <= preferred && c.max_sample_rate() >= preferred)
    {
        return Ok(range.clone().with_sample_rate(preferred).into());
    }

    float
        .into_iter()
        .next()
        .map(|range| range.with_max_sample_rate().into())
        .ok_or_else(|| SessionError::Audio("no f32 stream configuration available".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cpal::SupportedBufferSize;

    fn range(format: SampleFormat, min: u32, max: u32, channels: u16) -> SupportedStreamConfigRange {
        SupportedStreamConfigRange::new(
            channels,
            SampleRate(min),
            SampleRate(max),
            SupportedBufferSize::Unknown,
            format,
        )
    }

    #[test]
    fn prefers_48k_float() {
        let config = select_config(vec![
            range(SampleFormat::I16, 8_000, 96_000, 1),
            range(SampleFormat::F32, 8_000, 96_000, 2),
        ])
        .unwrap();
        assert_eq!(config.sample_rate, SampleRate(48_000));
        assert_eq!(config.channels, 2);
    }

    #[test]
    fn falls_back_to_max_rate_of_first_float_range() {
        let config = select_config(vec![range(SampleFormat::F32, 8_000, 44_100, 1)]).unwrap();
        assert_eq!(config.sample_rate, SampleRate(44_100));
    }

    #[test]
    fn integer_only_devices_are_rejected() {
        let err = select_config(vec![range(SampleFormat::I16, 8_000, 48_000, 1)]).unwrap_err();
        assert!(matches!(err, SessionError::Audio(_)));
    }
}
