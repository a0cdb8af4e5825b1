use enigo::{Button as EButton, Direction, Enigo, Key, Keyboard as _, Mouse as _, Settings};
use std::sync::{Mutex, PoisonError};
use tracing::{info, trace};

use super::InputInjector;
use crate::config::{KeyName, MacroAction, MouseButton};
use crate::error::InjectionError;

/// Emits real keyboard and mouse input through Enigo, with optional dry-run mode.
/// In dry-run mode, emissions are only logged and no real input is simulated.
///
/// The Enigo connection is opened lazily on first use and shared by all schedulers.
pub struct EnigoInjector {
    dry_run: bool,
    enigo: Mutex<Option<Enigo>>,
}

impl EnigoInjector {
    /// Create a new injector.
    /// - dry_run: when true, only logs instead of simulating real input.
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            enigo: Mutex::new(None),
        }
    }

    /// Returns whether the injector is in dry-run mode.
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn with_enigo<T>(
        &self,
        f: impl FnOnce(&mut Enigo) -> Result<T, InjectionError>,
    ) -> Result<T, InjectionError> {
        let mut guard = self.enigo.lock().unwrap_or_else(PoisonError::into_inner);
        if guard.is_none() {
            trace!(target: "macrobuddy::input", "Initializing Enigo");
            *guard = Some(Enigo::new(&Settings::default())?);
        }
        let enigo = guard
            .as_mut()
            .ok_or_else(|| InjectionError::Unavailable("Enigo not initialized".into()))?;
        f(enigo)
    }
}

impl InputInjector for EnigoInjector {
    fn emit(&self, action: &MacroAction) -> Result<(), InjectionError> {
        match action {
            MacroAction::Keyboard { key } => {
                let name =
                    KeyName::parse(key).ok_or_else(|| InjectionError::UnsupportedKey(key.clone()))?;
                if self.dry_run {
                    info!(target: "macrobuddy::input", key = %name, "DRY-RUN key press");
                    return Ok(());
                }
                trace!(target: "macrobuddy::input", key = %name, "key press");
                self.with_enigo(|enigo| Ok(enigo.key(map_key(name), Direction::Click)?))
            }
            MacroAction::Mouse { mouse_button } => {
                if self.dry_run {
                    info!(target: "macrobuddy::input", button = %mouse_button, "DRY-RUN mouse click");
                    return Ok(());
                }
                trace!(target: "macrobuddy::input", button = %mouse_button, "mouse click");
                self.with_enigo(|enigo| {
                    Ok(enigo.button(map_mouse_button(*mouse_button), Direction::Click)?)
                })
            }
        }
    }
}

fn map_key(name: KeyName) -> Key {
    match name {
        KeyName::Char(c) => Key::Unicode(c),
        KeyName::Space => Key::Space,
        KeyName::Enter => Key::Return,
        KeyName::Tab => Key::Tab,
        KeyName::Escape => Key::Escape,
        KeyName::Backspace => Key::Backspace,
        KeyName::Up => Key::UpArrow,
        KeyName::Down => Key::DownArrow,
        KeyName::Left => Key::LeftArrow,
        KeyName::Right => Key::RightArrow,
    }
}

fn map_mouse_button(btn: MouseButton) -> EButton {
    match btn {
        MouseButton::Left => EButton::Left,
        MouseButton::Middle => EButton::Middle,
        MouseButton::Right => EButton::Right,
    }
}
