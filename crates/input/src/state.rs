use glam::Vec2;
use mapwright_common::Ray3;
use mapwright_model::PickResult;

use crate::event::{InputEvent, Key, ModifierKeys, MouseButtons};

/// Snapshot of the input devices plus the pick ray and pick result of the
/// current frame. Tools only ever read input through this type.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    buttons: MouseButtons,
    modifiers: ModifierKeys,
    mouse: Vec2,
    mouse_delta: Vec2,
    scroll: Vec2,
    last_key: Option<Key>,
    pick_ray: Ray3,
    pick_result: PickResult,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update the state from one event.
    pub fn apply(&mut self, event: &InputEvent) {
        match *event {
            InputEvent::MouseDown(button) => self.buttons.insert(button.into()),
            InputEvent::MouseUp(button) => self.buttons.remove(button.into()),
            InputEvent::MouseMove { x, y } => {
                let position = Vec2::new(x, y);
                self.mouse_delta = position - self.mouse;
                self.mouse = position;
            }
            InputEvent::Scroll { dx, dy } => self.scroll = Vec2::new(dx, dy),
            InputEvent::KeyDown(key) => self.last_key = Some(key),
            InputEvent::KeyUp(key) => {
                if self.last_key == Some(key) {
                    self.last_key = None;
                }
            }
            InputEvent::ModifiersChanged(modifiers) => self.modifiers = modifiers,
        }
        tracing::trace!(?event, "input applied");
    }

    pub fn mouse_buttons(&self) -> MouseButtons {
        self.buttons
    }

    /// True if exactly `buttons` are down.
    pub fn mouse_buttons_pressed(&self, buttons: MouseButtons) -> bool {
        self.buttons == buttons
    }

    pub fn modifier_keys(&self) -> ModifierKeys {
        self.modifiers
    }

    /// True if exactly `keys` are down.
    pub fn modifier_keys_pressed(&self, keys: ModifierKeys) -> bool {
        self.modifiers == keys
    }

    /// True if at least `keys` are down.
    pub fn modifier_keys_down(&self, keys: ModifierKeys) -> bool {
        self.modifiers.contains(keys)
    }

    pub fn mouse_position(&self) -> Vec2 {
        self.mouse
    }

    pub fn mouse_delta(&self) -> Vec2 {
        self.mouse_delta
    }

    pub fn scroll(&self) -> Vec2 {
        self.scroll
    }

    pub fn last_key(&self) -> Option<Key> {
        self.last_key
    }

    pub fn pick_ray(&self) -> &Ray3 {
        &self.pick_ray
    }

    pub fn set_pick_ray(&mut self, ray: Ray3) {
        self.pick_ray = ray;
    }

    pub fn pick_result(&self) -> &PickResult {
        &self.pick_result
    }

    pub fn set_pick_result(&mut self, result: PickResult) {
        self.pick_result = result;
    }
}
