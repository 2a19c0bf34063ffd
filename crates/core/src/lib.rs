//! Core library for the Retrodesk portfolio desktop.
//!
//! The desktop itself is drawn elsewhere; this crate owns the state behind
//! it. A playback controller keeps at most one track sounding, a visualizer
//! samples the output spectrum once per display refresh, and a focus
//! manager decides which draggable window renders on top. Everything is
//! owned by a [`Desk`] session and driven by explicit events.

pub mod analysis;
pub mod audio;
pub mod config;
pub mod desk;
pub mod error;
pub mod input;
pub mod mapping;
pub mod playback;
pub mod render;
pub mod tracks;
pub mod visualizer;
pub mod windows;

pub use analysis::Analyser;
pub use audio::{
    AudioNotification, AudioService, DecodedBuffer, HandleId, HeadlessAudio, ResourceDecoder,
    ToneDecoder,
};
pub use config::{AppConfig, AudioConfig, VisualizerConfig, WindowConfig};
pub use desk::{Desk, DeskEvent};
pub use error::{Result, RetroDeskError};
pub use input::{KeyAction, KeyMap};
pub use mapping::{MappingMatrix, ParameterUpdate};
pub use playback::{Direction, PlaybackController, PlaybackEvent};
pub use render::{RenderGraph, RenderSurface};
pub use tracks::{Track, TrackEntry, TrackRegistry};
pub use visualizer::{BarFrame, FixedStep, FrameClock, VisualizerSampler};
pub use windows::{FocusManager, WindowEvent, WindowLayer};
