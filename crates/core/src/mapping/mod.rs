use serde::{Deserialize, Serialize};

use crate::BarFrame;

/// Prefix of the named values the bars are published under.
pub const BAR_PROPERTY_PREFIX: &str = "--top";

/// Named scalar handed to the rendering surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterUpdate {
    pub target: String,
    pub value: f32,
}

/// Republishes bar frames as named values, reusing the allocated names
/// between frames.
#[derive(Debug, Default, Clone)]
pub struct MappingMatrix {
    updates: Vec<ParameterUpdate>,
}

impl MappingMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn updates(&self) -> &[ParameterUpdate] {
        &self.updates
    }

    pub fn apply_from_frame(&mut self, frame: &BarFrame) -> &[ParameterUpdate] {
        let bars = frame.values();
        self.updates.truncate(bars.len());
        for (index, value) in bars.iter().enumerate() {
            match self.updates.get_mut(index) {
                Some(update) => update.value = *value,
                None => self.updates.push(ParameterUpdate {
                    target: format!("{BAR_PROPERTY_PREFIX}{index}"),
                    value: *value,
                }),
            }
        }
        &self.updates
    }
}
