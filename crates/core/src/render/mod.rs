use crate::{mapping::ParameterUpdate, windows::WindowLayer};

/// Whatever draws the desktop. The core only hands over values; how they
/// become pixels is up to the implementation.
pub trait RenderSurface {
    /// Receives the named bar magnitudes of the latest frame.
    fn draw_bars(&mut self, updates: &[ParameterUpdate]);

    /// Receives the open windows ordered bottom to top.
    fn paint_windows(&mut self, layers: &[WindowLayer]);
}

/// In-memory surface that keeps the latest values it was given.
#[derive(Debug, Default)]
pub struct RenderGraph {
    bars: Vec<ParameterUpdate>,
    layers: Vec<WindowLayer>,
    frames_drawn: u64,
}

impl RenderGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bars(&self) -> &[ParameterUpdate] {
        &self.bars
    }

    pub fn bar(&self, name: &str) -> Option<f32> {
        self.bars
            .iter()
            .find(|update| update.target == name)
            .map(|update| update.value)
    }

    pub fn layers(&self) -> &[WindowLayer] {
        &self.layers
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }
}

impl RenderSurface for RenderGraph {
    fn draw_bars(&mut self, updates: &[ParameterUpdate]) {
        self.bars.clear();
        self.bars.extend_from_slice(updates);
        self.frames_drawn += 1;
    }

    fn paint_windows(&mut self, layers: &[WindowLayer]) {
        self.layers = layers.to_vec();
    }
}
