use std::{collections::VecDeque, f32::consts::PI, fmt, sync::Arc};

use realfft::{num_complex::Complex32, RealFftPlanner, RealToComplex};

use crate::{AudioConfig, Result};

/// Frequency-domain tap attached to the audio output.
///
/// Mirrors the behaviour of a browser analyser node: the most recent
/// `fft_size` mono samples are Blackman-windowed, transformed, smoothed
/// over time and mapped from decibels onto the byte range `[0, 255]`
/// between `min_db` and `max_db`.
pub struct Analyser {
    fft_size: usize,
    smoothing: f32,
    min_db: f32,
    max_db: f32,
    history: VecDeque<f32>,
    smoothed: Vec<f32>,
    window: Vec<f32>,
    fft: FftResources,
}

impl Analyser {
    /// Builds an analyser from a validated audio configuration.
    pub fn new(config: &AudioConfig) -> Self {
        let fft_size = config.fft_size;
        let mut planner = RealFftPlanner::<f32>::new();
        let plan = planner.plan_fft_forward(fft_size);
        let fft = FftResources {
            scratch: plan.make_scratch_vec(),
            spectrum: plan.make_output_vec(),
            input: plan.make_input_vec(),
            plan,
        };

        Self {
            fft_size,
            smoothing: config.smoothing,
            min_db: config.min_db,
            max_db: config.max_db,
            history: VecDeque::from(vec![0.0; fft_size]),
            smoothed: vec![0.0; fft_size / 2],
            window: (0..fft_size).map(|n| blackman_value(n, fft_size)).collect(),
            fft,
        }
    }

    /// Number of frequency bins produced per sample, half the FFT size.
    pub fn frequency_bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Appends mono samples to the analysis window.
    pub fn push_samples(&mut self, samples: &[f32]) {
        let skip = samples.len().saturating_sub(self.fft_size);
        for sample in &samples[skip..] {
            if self.history.len() == self.fft_size {
                self.history.pop_front();
            }
            self.history.push_back(*sample);
        }
    }

    /// Writes the current byte spectrum into `out`. Extra slots are left
    /// untouched, missing ones are skipped.
    pub fn byte_frequency_data(&mut self, out: &mut [u8]) -> Result<()> {
        self.update_spectrum()?;

        let range = self.max_db - self.min_db;
        for (slot, magnitude) in out.iter_mut().zip(&self.smoothed) {
            *slot = if *magnitude <= 0.0 {
                0
            } else {
                let db = 20.0 * magnitude.log10();
                (255.0 / range * (db - self.min_db)).clamp(0.0, 255.0) as u8
            };
        }
        Ok(())
    }

    pub fn byte_frequency_vec(&mut self) -> Result<Vec<u8>> {
        let mut bins = vec![0; self.frequency_bin_count()];
        self.byte_frequency_data(&mut bins)?;
        Ok(bins)
    }

    fn update_spectrum(&mut self) -> Result<()> {
        let fft = &mut self.fft;
        let windowed = self.history.iter().zip(&self.window);
        for (slot, (sample, weight)) in fft.input.iter_mut().zip(windowed) {
            *slot = sample * weight;
        }

        fft.plan
            .process_with_scratch(&mut fft.input, &mut fft.spectrum, &mut fft.scratch)?;

        let scale = 1.0 / self.fft_size as f32;
        let tau = self.smoothing;
        for (smoothed, bin) in self.smoothed.iter_mut().zip(&fft.spectrum) {
            let magnitude = bin.norm() * scale;
            let next = tau * *smoothed + (1.0 - tau) * magnitude;
            *smoothed = if next.is_finite() { next } else { 0.0 };
        }
        Ok(())
    }
}

struct FftResources {
    plan: Arc<dyn RealToComplex<f32>>,
    scratch: Vec<Complex32>,
    spectrum: Vec<Complex32>,
    input: Vec<f32>,
}

impl fmt::Debug for Analyser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Analyser")
            .field("fft_size", &self.fft_size)
            .field("smoothing", &self.smoothing)
            .field("min_db", &self.min_db)
            .field("max_db", &self.max_db)
            .finish()
    }
}

fn blackman_value(index: usize, len: usize) -> f32 {
    const A0: f32 = 0.42;
    const A1: f32 = 0.5;
    const A2: f32 = 0.08;

    let phase = 2.0 * PI * index as f32 / len as f32;
    A0 - A1 * phase.cos() + A2 * (2.0 * phase).cos()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_analyser() -> Analyser {
        Analyser::new(&AudioConfig::default())
    }

    fn sine(frequency: f32, sample_rate: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|n| (2.0 * PI * frequency * n as f32 / sample_rate).sin())
            .collect()
    }

    #[test]
    fn silence_produces_zero_bytes() {
        let mut analyser = build_analyser();
        analyser.push_samples(&vec![0.0; 4096]);
        let bins = analyser.byte_frequency_vec().unwrap();

        assert_eq!(bins.len(), 1024);
        assert!(bins.iter().all(|bin| *bin == 0));
    }

    #[test]
    fn sine_peaks_at_its_bin() {
        let mut analyser = build_analyser();
        // Bin 32 of a 2048-point transform at 48 kHz.
        analyser.push_samples(&sine(750.0, 48_000.0, 2048));
        let bins = analyser.byte_frequency_vec().unwrap();

        assert_eq!(bins[32], 255);
        assert!(bins[500] < bins[32]);
    }

    #[test]
    fn smoothing_holds_energy_after_input_stops() {
        let mut analyser = build_analyser();
        analyser.push_samples(&sine(750.0, 48_000.0, 2048));
        analyser.byte_frequency_vec().unwrap();

        analyser.push_samples(&vec![0.0; 2048]);
        let bins = analyser.byte_frequency_vec().unwrap();
        assert!(bins[32] > 0);
    }
}
