//! Audio settings and PCM helpers shared by the room adapters.
//!
//! Device I/O lives behind the `rtc` feature; the conversions here are
//! plain functions so they build and test without an audio stack.

use serde::{Deserialize, Serialize};

/// Frames handed to the room carry this much audio.
pub const FRAME_MILLIS: u32 = 10;

fn enabled() -> bool {
    true
}

/// Which local audio devices a room uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioSettings {
    /// Capture the default input device and publish it as the microphone track.
    #[serde(default = "enabled")]
    pub microphone: bool,

    /// Play subscribed remote audio on the default output device.
    #[serde(default = "enabled")]
    pub playback: bool,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            microphone: true,
            playback: true,
        }
    }
}

impl AudioSettings {
    /// No capture and no playback.
    pub fn muted() -> Self {
        Self {
            microphone: false,
            playback: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.microphone || self.playback
    }
}

/// Samples per channel in one frame at `sample_rate`.
pub fn frame_samples(sample_rate: u32) -> usize {
    (sample_rate * FRAME_MILLIS / 1000) as usize
}

/// Averages interleaved `channels`-wide samples down to mono.
///
/// A trailing partial frame is dropped.
pub fn downmix_to_mono(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Converts a float sample in `[-1.0, 1.0]` to 16-bit PCM, clamping overshoot.
pub fn f32_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

pub fn i16_to_f32(sample: i16) -> f32 {
    sample as f32 / i16::MAX as f32
}
