/*!
Global toggle hotkeys.

A [`HotkeyProvider`] turns a set of [`ToggleHotkey`]s into a stream of
press/release events. The engine's dispatcher consumes that stream, debounces
key-repeat down to rising edges, and flips the owning macro's flag.

Providers:
- `GlobalHotkeyProvider` -> system-wide hooks through the `global-hotkey` crate.
- `ManualHotkeyProvider` -> events pushed in-process (headless runs, UIs that
  capture keys themselves, tests).
*/

use std::collections::HashSet;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::config::ToggleHotkey;
use crate::error::HotkeyError;

pub mod dispatcher;
pub mod global;
pub mod manual;

pub use dispatcher::HotkeyDispatcher;
pub use global::GlobalHotkeyProvider;
pub use manual::ManualHotkeyProvider;

/// Physical state reported for a hotkey.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum KeyState {
    Pressed,
    Released,
}

/// One key transition observed by a provider.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct HotkeyEvent {
    pub hotkey: ToggleHotkey,
    pub state: KeyState,
}

impl HotkeyEvent {
    pub fn pressed(hotkey: ToggleHotkey) -> Self {
        Self {
            hotkey,
            state: KeyState::Pressed,
        }
    }

    pub fn released(hotkey: ToggleHotkey) -> Self {
        Self {
            hotkey,
            state: KeyState::Released,
        }
    }
}

/// Capability to hook toggle hotkeys system-wide.
///
/// `activate` registers every hook and returns the event stream; it either
/// registers all of them or none. `deactivate` removes every hook and ends the
/// stream. It may block briefly while the OS listener shuts down.
pub trait HotkeyProvider: Send + Sync {
    fn activate(
        &self,
        hotkeys: &[ToggleHotkey],
    ) -> Result<UnboundedReceiver<HotkeyEvent>, HotkeyError>;

    fn deactivate(&self);
}

/// Reduces a raw press/release stream to rising edges.
///
/// A held key auto-repeats as a run of presses; only the first press after a
/// release (or the very first press) counts.
#[derive(Debug, Default)]
pub struct EdgeDetector {
    held: HashSet<ToggleHotkey>,
}

impl EdgeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one event; returns `true` when it is a rising edge.
    pub fn observe(&mut self, event: HotkeyEvent) -> bool {
        match event.state {
            KeyState::Pressed => self.held.insert(event.hotkey),
            KeyState::Released => {
                self.held.remove(&event.hotkey);
                false
            }
        }
    }
}
