use std::{f32::consts::PI, time::Duration};

use crate::{DecodedBuffer, Result};

/// Turns a resource locator into playable audio.
pub trait ResourceDecoder {
    /// Fetches and decodes `uri`. Fetch problems are reported as
    /// [`crate::RetroDeskError::Transport`], codec problems as
    /// [`crate::RetroDeskError::Decode`].
    fn decode(&self, uri: &str) -> Result<DecodedBuffer>;
}

impl<F> ResourceDecoder for F
where
    F: Fn(&str) -> Result<DecodedBuffer>,
{
    fn decode(&self, uri: &str) -> Result<DecodedBuffer> {
        self(uri)
    }
}

/// Synthesises a mono tone for any locator. The pitch is derived from the
/// locator so different tracks sound, and visualise, differently.
#[derive(Debug, Clone)]
pub struct ToneDecoder {
    sample_rate: u32,
    length: Duration,
}

impl ToneDecoder {
    pub fn new(sample_rate: u32, length: Duration) -> Self {
        Self {
            sample_rate,
            length,
        }
    }

    pub fn frequency_for(uri: &str) -> f32 {
        let semitone = uri.bytes().fold(0u32, |acc, byte| {
            acc.wrapping_mul(31).wrapping_add(u32::from(byte))
        }) % 36;
        110.0 * 2f32.powf(semitone as f32 / 12.0)
    }
}

impl ResourceDecoder for ToneDecoder {
    fn decode(&self, uri: &str) -> Result<DecodedBuffer> {
        let frequency = Self::frequency_for(uri);
        let rate = self.sample_rate as f32;
        let frames = (self.length.as_secs_f64() * self.sample_rate as f64).round() as usize;
        let samples = (0..frames)
            .map(|n| 0.5 * (2.0 * PI * frequency * n as f32 / rate).sin())
            .collect();
        DecodedBuffer::new(samples, self.sample_rate, 1)
    }
}
