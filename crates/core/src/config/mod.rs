use std::{collections::BTreeMap, fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{input::KeyAction, tracks::TrackEntry, Result, RetroDeskError};

/// Upper bound for the first window's stacking value. Leaves room for
/// 2^63 raises before the focus counter would run out.
pub const MAX_BASE_Z: u64 = u64::MAX / 2;

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub audio: AudioConfig,
    pub visualizer: VisualizerConfig,
    pub windows: WindowConfig,
    pub keys: BTreeMap<String, KeyAction>,
    /// Replaces the built-in playlist when present.
    pub tracks: Option<Vec<TrackEntry>>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            audio: AudioConfig::default(),
            visualizer: VisualizerConfig::default(),
            windows: WindowConfig::default(),
            keys: crate::input::default_bindings(),
            tracks: None,
        }
    }
}

impl AppConfig {
    /// Reads and validates a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path.as_ref())?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let config: AppConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        let audio = &self.audio;
        if audio.fft_size < 32 || !audio.fft_size.is_power_of_two() {
            return Err(RetroDeskError::Config(format!(
                "fft_size must be a power of two >= 32, got {}",
                audio.fft_size
            )));
        }
        if audio.sample_rate == 0 {
            return Err(RetroDeskError::Config("sample_rate must be positive".into()));
        }
        if !(0.0..=1.0).contains(&audio.smoothing) {
            return Err(RetroDeskError::Config(format!(
                "smoothing must lie in [0, 1], got {}",
                audio.smoothing
            )));
        }
        if audio.min_db >= audio.max_db {
            return Err(RetroDeskError::Config(format!(
                "min_db ({}) must be below max_db ({})",
                audio.min_db, audio.max_db
            )));
        }

        let vis = &self.visualizer;
        if vis.bar_count == 0 || vis.bin_stride == 0 || vis.fps == 0 {
            return Err(RetroDeskError::Config(
                "bar_count, bin_stride and fps must be positive".into(),
            ));
        }
        let bins = audio.fft_size / 2;
        match (vis.bar_count - 1).checked_mul(vis.bin_stride) {
            Some(last_bin) if last_bin < bins => {}
            _ => {
                return Err(RetroDeskError::Config(format!(
                    "{} bars every {} bins do not fit the analyser's {bins} bins",
                    vis.bar_count, vis.bin_stride
                )));
            }
        }

        if self.windows.base_z > MAX_BASE_Z {
            return Err(RetroDeskError::Config(format!(
                "base_z must not exceed {MAX_BASE_Z}, got {}",
                self.windows.base_z
            )));
        }

        if matches!(&self.tracks, Some(tracks) if tracks.is_empty()) {
            return Err(RetroDeskError::Config("playlist override is empty".into()));
        }
        Ok(())
    }
}

/// Configuration specific to the audio subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub fft_size: usize,
    pub smoothing: f32,
    pub min_db: f32,
    pub max_db: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            fft_size: 2048,
            smoothing: 0.8,
            min_db: -100.0,
            max_db: -30.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualizerConfig {
    pub bar_count: usize,
    /// Distance between sampled frequency bins.
    pub bin_stride: usize,
    pub scale: f32,
    pub fps: u32,
}

impl Default for VisualizerConfig {
    fn default() -> Self {
        Self {
            bar_count: 11,
            bin_stride: 2,
            scale: 0.015,
            fps: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub base_z: u64,
    pub initial: Vec<String>,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            base_z: 100,
            initial: [
                "playlistWindow",
                "nowPlayingWindow",
                "analyzerWindow",
                "workFuelWindow",
                "dogFrame",
                "workHistoryWindow",
                "educationHistoryWindow",
                "contactWindow",
                "skillsWindow",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        config.validate().unwrap();
        assert_eq!(config.visualizer.bar_count, 11);
        assert_eq!(config.windows.initial.len(), 9);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config = AppConfig::from_json(r#"{ "visualizer": { "bar_count": 10 } }"#).unwrap();
        assert_eq!(config.visualizer.bar_count, 10);
        assert_eq!(config.visualizer.bin_stride, 2);
        assert_eq!(config.audio.fft_size, 2048);
        assert!(!config.keys.is_empty());
    }

    #[test]
    fn rejects_bad_fft_size() {
        let err = AppConfig::from_json(r#"{ "audio": { "fft_size": 1000 } }"#).unwrap_err();
        assert!(format!("{err}").contains("fft_size"));
    }

    #[test]
    fn rejects_bars_beyond_bin_count() {
        let err = AppConfig::from_json(
            r#"{ "audio": { "fft_size": 32 }, "visualizer": { "bar_count": 11, "bin_stride": 2 } }"#,
        )
        .unwrap_err();
        assert!(matches!(err, RetroDeskError::Config(_)));
    }

    #[test]
    fn rejects_stride_that_overflows() {
        let err = AppConfig::from_json(&format!(
            r#"{{ "visualizer": {{ "bar_count": 3, "bin_stride": {} }} }}"#,
            usize::MAX
        ))
        .unwrap_err();
        assert!(matches!(err, RetroDeskError::Config(_)));
    }

    #[test]
    fn rejects_base_z_near_the_counter_limit() {
        let err = AppConfig::from_json(&format!(r#"{{ "windows": {{ "base_z": {} }} }}"#, u64::MAX))
            .unwrap_err();
        assert!(format!("{err}").contains("base_z"));

        let json = format!(r#"{{ "windows": {{ "base_z": {MAX_BASE_Z} }} }}"#);
        assert!(AppConfig::from_json(&json).is_ok());
    }

    #[test]
    fn explicit_empty_keys_disable_bindings() {
        let config = AppConfig::from_json(r#"{ "keys": {} }"#).unwrap();
        assert!(config.keys.is_empty());
        assert!(crate::KeyMap::new(config.keys).resolve("Space").is_none());
    }

    #[test]
    fn rejects_empty_playlist_override() {
        assert!(AppConfig::from_json(r#"{ "tracks": [] }"#).is_err());
    }

    #[test]
    fn json_round_trip_keeps_keys() {
        let config = AppConfig::default();
        let json = config.to_json_pretty().unwrap();
        let parsed = AppConfig::from_json(&json).unwrap();
        assert_eq!(parsed.keys, config.keys);
    }
}
