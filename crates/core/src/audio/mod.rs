//! Boundary to the host's audio resource service.
//!
//! The controller never blocks on the host: loads are requested and their
//! completions arrive later as [`AudioNotification`]s returned by
//! [`AudioService::poll`].

use std::{fmt, sync::Arc, time::Duration};

use crate::{Analyser, Result, RetroDeskError};

pub mod decode;
pub mod headless;

pub use decode::{ResourceDecoder, ToneDecoder};
pub use headless::HeadlessAudio;

/// Decoded, ready-to-play audio. Cloning only bumps a reference count.
#[derive(Clone, PartialEq)]
pub struct DecodedBuffer {
    samples: Arc<[f32]>,
    sample_rate: u32,
    channels: u16,
}

impl DecodedBuffer {
    /// Wraps interleaved samples.
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Result<Self> {
        if channels == 0 || sample_rate == 0 {
            return Err(RetroDeskError::invalid(
                "decoded audio needs at least one channel and a positive sample rate",
            ));
        }
        if samples.len() % channels as usize != 0 {
            return Err(RetroDeskError::invalid(format!(
                "{} samples do not divide into {channels} channels",
                samples.len()
            )));
        }

        Ok(Self {
            samples: Arc::from(samples),
            sample_rate,
            channels,
        })
    }

    #[inline]
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    #[inline]
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }
}

impl fmt::Debug for DecodedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodedBuffer")
            .field("frames", &self.frames())
            .field("sample_rate", &self.sample_rate)
            .field("channels", &self.channels)
            .finish()
    }
}

/// Identifies one sounding handle for the lifetime of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(pub u64);

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handle#{}", self.0)
    }
}

/// Completion delivered by the host after the call that caused it returned.
#[derive(Debug)]
pub enum AudioNotification {
    Decoded { uri: String, buffer: DecodedBuffer },
    LoadFailed { uri: String, error: RetroDeskError },
    /// A handle played to its natural end. Never sent for stopped handles.
    Ended(HandleId),
}

/// Audio output, resource loading and analysis provided by the host.
pub trait AudioService {
    /// Creates the output pipeline and its analyser. Calling it again once
    /// the pipeline exists is a no-op.
    fn open_output(&mut self) -> Result<()>;

    /// Starts fetching and decoding `uri`. The outcome is reported later
    /// through [`AudioService::poll`].
    fn request_buffer(&mut self, uri: &str);

    /// Creates a one-shot handle playing `buffer` from the start.
    fn start(&mut self, buffer: &DecodedBuffer) -> Result<HandleId>;

    /// Stops `handle` immediately. A stopped handle reports no end.
    fn stop(&mut self, handle: HandleId) -> Result<()>;

    /// The analysis pipeline, present once the output exists.
    fn analyser_mut(&mut self) -> Option<&mut Analyser>;

    /// Advances host time and drains pending notifications.
    fn poll(&mut self, elapsed: Duration) -> Vec<AudioNotification>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_reports_frames_and_duration() {
        let buffer = DecodedBuffer::new(vec![0.0; 96_000], 48_000, 2).unwrap();
        assert_eq!(buffer.frames(), 48_000);
        assert_eq!(buffer.duration(), Duration::from_secs(1));

        let shared = buffer.clone();
        assert_eq!(shared, buffer);
    }

    #[test]
    fn rejects_ragged_interleaving() {
        assert!(DecodedBuffer::new(vec![0.0; 3], 48_000, 2).is_err());
        assert!(DecodedBuffer::new(vec![0.0; 4], 48_000, 0).is_err());
    }
}
