use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::PlaybackEvent;

/// Playback action a key can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyAction {
    Next,
    Previous,
    Toggle,
}

impl KeyAction {
    pub fn event(self) -> PlaybackEvent {
        match self {
            KeyAction::Next => PlaybackEvent::Next,
            KeyAction::Previous => PlaybackEvent::Previous,
            KeyAction::Toggle => PlaybackEvent::Toggle,
        }
    }
}

pub fn default_bindings() -> BTreeMap<String, KeyAction> {
    [
        ("ArrowDown", KeyAction::Next),
        ("ArrowRight", KeyAction::Next),
        ("ArrowUp", KeyAction::Previous),
        ("ArrowLeft", KeyAction::Previous),
        ("Space", KeyAction::Toggle),
    ]
    .into_iter()
    .map(|(key, action)| (key.to_string(), action))
    .collect()
}

/// Translates key names into playback events.
#[derive(Debug, Clone)]
pub struct KeyMap {
    bindings: BTreeMap<String, KeyAction>,
}

impl KeyMap {
    pub fn new(bindings: BTreeMap<String, KeyAction>) -> Self {
        Self { bindings }
    }

    /// Returns `None` for keys without a binding.
    pub fn resolve(&self, key: &str) -> Option<PlaybackEvent> {
        self.bindings.get(key).map(|action| action.event())
    }
}

impl Default for KeyMap {
    fn default() -> Self {
        Self::new(default_bindings())
    }
}
