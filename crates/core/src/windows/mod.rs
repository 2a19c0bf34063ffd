use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, warn};

use crate::{Result, RetroDeskError, WindowConfig};

/// Pointer and lifecycle input that affects stacking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowEvent {
    Press(String),
    DragStart(String),
    RaiseFocus(String),
    Opened(String),
    Closed(String),
}

/// A visible window and its relative stacking value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WindowLayer {
    pub id: String,
    pub z_order: u64,
}

#[derive(Debug, Clone, Copy)]
struct WindowState {
    z_order: u64,
    open: bool,
}

/// Keeps the most recently focused window on top.
///
/// `top` only ever grows and is held by exactly one window. Registration
/// and each raise of a window that is not already on top hand out
/// `top + 1`. Absolute values carry no meaning.
#[derive(Debug)]
pub struct FocusManager {
    base_z: u64,
    top: u64,
    windows: HashMap<String, WindowState>,
}

impl FocusManager {
    pub fn new(base_z: u64) -> Self {
        Self {
            base_z,
            top: base_z,
            windows: HashMap::new(),
        }
    }

    /// Registers the configured windows in order, so later entries start
    /// above earlier ones.
    pub fn from_config(config: &WindowConfig) -> Self {
        let mut manager = Self::new(config.base_z);
        for id in &config.initial {
            manager.register(id);
        }
        manager
    }

    /// Mounts a window, open, above every previously registered one.
    /// Registering an existing id changes nothing. Once the counter is
    /// exhausted new windows share the top value.
    pub fn register(&mut self, id: &str) -> u64 {
        if let Some(state) = self.windows.get(id) {
            return state.z_order;
        }

        let z_order = if self.windows.is_empty() {
            self.base_z
        } else {
            self.top.checked_add(1).unwrap_or_else(|| {
                warn!(window = id, top = self.top, "stacking counter exhausted");
                self.top
            })
        };
        self.top = z_order;
        self.windows.insert(
            id.to_string(),
            WindowState {
                z_order,
                open: true,
            },
        );
        z_order
    }

    /// Brings `id` to the front. Returns whether its stacking changed;
    /// raising the window already on top, or raising once the counter is
    /// exhausted, is a no-op.
    pub fn raise(&mut self, id: &str) -> Result<bool> {
        let state = self
            .windows
            .get_mut(id)
            .ok_or_else(|| RetroDeskError::UnknownWindow(id.to_string()))?;
        if state.z_order == self.top {
            return Ok(false);
        }
        let Some(top) = self.top.checked_add(1) else {
            warn!(window = id, top = self.top, "stacking counter exhausted, raise ignored");
            return Ok(false);
        };

        self.top = top;
        state.z_order = top;
        debug!(window = id, z_order = self.top, "raised window");
        Ok(true)
    }

    pub fn handle(&mut self, event: &WindowEvent) -> Result<bool> {
        match event {
            WindowEvent::Press(id) | WindowEvent::DragStart(id) | WindowEvent::RaiseFocus(id) => {
                self.raise(id)
            }
            WindowEvent::Opened(id) => {
                let state = self
                    .windows
                    .get_mut(id)
                    .ok_or_else(|| RetroDeskError::UnknownWindow(id.clone()))?;
                if state.open {
                    return Ok(false);
                }
                state.open = true;
                self.raise(id)?;
                Ok(true)
            }
            WindowEvent::Closed(id) => {
                let state = self
                    .windows
                    .get_mut(id)
                    .ok_or_else(|| RetroDeskError::UnknownWindow(id.clone()))?;
                let changed = state.open;
                state.open = false;
                Ok(changed)
            }
        }
    }

    pub fn z_order(&self, id: &str) -> Option<u64> {
        self.windows.get(id).map(|state| state.z_order)
    }

    /// The open window rendered above all others.
    pub fn topmost(&self) -> Option<&str> {
        self.windows
            .iter()
            .filter(|(_, state)| state.open)
            .max_by_key(|(_, state)| state.z_order)
            .map(|(id, _)| id.as_str())
    }

    /// Open windows from bottom to top.
    pub fn stacking(&self) -> Vec<WindowLayer> {
        let mut layers: Vec<WindowLayer> = self
            .windows
            .iter()
            .filter(|(_, state)| state.open)
            .map(|(id, state)| WindowLayer {
                id: id.clone(),
                z_order: state.z_order,
            })
            .collect();
        layers.sort_by(|a, b| a.z_order.cmp(&b.z_order).then_with(|| a.id.cmp(&b.id)));
        layers
    }
}
