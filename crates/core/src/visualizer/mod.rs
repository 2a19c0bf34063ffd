use std::time::Duration;

use serde::Serialize;
use tracing::warn;

use crate::{Analyser, VisualizerConfig};

/// Bar magnitudes for one display refresh. Values are non-negative.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarFrame {
    values: Vec<f32>,
}

impl BarFrame {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn is_silent(&self) -> bool {
        self.values.iter().all(|value| *value == 0.0)
    }
}

/// Turns the analyser's byte spectrum into a fixed number of bars.
///
/// Bar `i` reads bin `i * bin_stride` and multiplies it by `scale`, so with
/// the defaults the bars range over `[0, 3.825]`.
#[derive(Debug)]
pub struct VisualizerSampler {
    config: VisualizerConfig,
    bins: Vec<u8>,
}

impl VisualizerSampler {
    pub fn new(config: VisualizerConfig) -> Self {
        Self {
            config,
            bins: Vec::new(),
        }
    }

    pub fn bar_count(&self) -> usize {
        self.config.bar_count
    }

    /// Frame period for the configured refresh rate.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.config.fps.max(1)))
    }

    /// Samples the current spectrum. Returns `None` while no analysis
    /// pipeline exists; a silent pipeline yields all-zero bars.
    pub fn sample(&mut self, analyser: Option<&mut Analyser>) -> Option<BarFrame> {
        let analyser = analyser?;

        self.bins.resize(analyser.frequency_bin_count(), 0);
        if let Err(err) = analyser.byte_frequency_data(&mut self.bins) {
            warn!(%err, "frequency analysis failed, skipping frame");
            return None;
        }

        let values = (0..self.config.bar_count)
            .map(|bar| {
                self.bins
                    .get(bar * self.config.bin_stride)
                    .map(|bin| f32::from(*bin) * self.config.scale)
                    .unwrap_or(0.0)
            })
            .collect();
        Some(BarFrame::new(values))
    }
}

/// Source of display refreshes for the per-frame loop.
pub trait FrameClock {
    /// Waits for the next refresh and returns the time elapsed since the
    /// previous one, or `None` once the loop should end.
    fn next_frame(&mut self) -> Option<Duration>;
}

/// Ticks a fixed interval without waiting, for a bounded number of frames.
#[derive(Debug, Clone)]
pub struct FixedStep {
    interval: Duration,
    remaining: u64,
}

impl FixedStep {
    pub fn new(interval: Duration, frames: u64) -> Self {
        Self {
            interval,
            remaining: frames,
        }
    }
}

impl FrameClock for FixedStep {
    fn next_frame(&mut self) -> Option<Duration> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        Some(self.interval)
    }
}
