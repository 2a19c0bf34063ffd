use std::time::Duration;

use tracing::{debug, info, warn};

use crate::{
    AppConfig, AudioService, BarFrame, FocusManager, FrameClock, KeyMap, MappingMatrix,
    PlaybackController, PlaybackEvent, RenderGraph, RenderSurface, Result, TrackRegistry,
    VisualizerSampler, WindowEvent,
};

/// Input accepted by the desktop session.
#[derive(Debug)]
pub enum DeskEvent {
    Playback(PlaybackEvent),
    Window(WindowEvent),
    /// A key name such as `ArrowRight`.
    Key(String),
}

/// The desktop session: built once at startup and owning every piece of
/// mutable state the UI touches.
#[derive(Debug)]
pub struct Desk<S: AudioService, R: RenderSurface = RenderGraph> {
    player: PlaybackController,
    windows: FocusManager,
    sampler: VisualizerSampler,
    mapping: MappingMatrix,
    keys: KeyMap,
    audio: S,
    surface: R,
}

impl<S: AudioService, R: RenderSurface> Desk<S, R> {
    pub fn new(config: &AppConfig, audio: S, mut surface: R) -> Result<Self> {
        config.validate()?;
        let tracks = match &config.tracks {
            Some(entries) => TrackRegistry::new(entries.clone())?,
            None => TrackRegistry::portfolio(),
        };
        let windows = FocusManager::from_config(&config.windows);
        surface.paint_windows(&windows.stacking());
        info!(tracks = tracks.len(), windows = config.windows.initial.len(), "desk ready");

        Ok(Self {
            player: PlaybackController::new(tracks),
            windows,
            sampler: VisualizerSampler::new(config.visualizer.clone()),
            mapping: MappingMatrix::new(),
            keys: KeyMap::new(config.keys.clone()),
            audio,
            surface,
        })
    }

    pub fn player(&self) -> &PlaybackController {
        &self.player
    }

    pub fn windows(&self) -> &FocusManager {
        &self.windows
    }

    pub fn audio(&self) -> &S {
        &self.audio
    }

    pub fn audio_mut(&mut self) -> &mut S {
        &mut self.audio
    }

    pub fn surface(&self) -> &R {
        &self.surface
    }

    pub fn frame_interval(&self) -> Duration {
        self.sampler.frame_interval()
    }

    pub fn handle(&mut self, event: DeskEvent) {
        match event {
            DeskEvent::Playback(event) => self.player.handle(event, &mut self.audio),
            DeskEvent::Window(event) => match self.windows.handle(&event) {
                Ok(true) => self.surface.paint_windows(&self.windows.stacking()),
                Ok(false) => {}
                Err(err) => warn!(%err, "ignoring window event"),
            },
            DeskEvent::Key(key) => match self.keys.resolve(&key) {
                Some(event) => self.player.handle(event, &mut self.audio),
                None => debug!(%key, "unbound key"),
            },
        }
    }

    /// One display refresh: delivers host completions, then samples and
    /// draws the visualizer if the analysis pipeline exists.
    pub fn frame(&mut self, elapsed: Duration) -> Option<BarFrame> {
        for notification in self.audio.poll(elapsed) {
            self.player.handle(notification.into(), &mut self.audio);
        }

        let frame = self.sampler.sample(self.audio.analyser_mut())?;
        let updates = self.mapping.apply_from_frame(&frame);
        self.surface.draw_bars(updates);
        Some(frame)
    }

    /// Runs frames until the clock stops and returns how many ran.
    pub fn run(&mut self, clock: &mut dyn FrameClock) -> u64 {
        let mut frames = 0;
        while let Some(elapsed) = clock.next_frame() {
            self.frame(elapsed);
            frames += 1;
        }
        frames
    }
}
