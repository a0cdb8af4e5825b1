use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Root configuration for Macrobuddy.
///
/// This structure is the persisted document: an ordered list of macros. The
/// position of a macro in `macros` is its index for the lifetime of an engine run.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Config {
    /// Macros to run, in order.
    #[serde(default)]
    pub macros: Vec<MacroDefinition>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            macros: vec![
                MacroDefinition {
                    action: MacroAction::Keyboard { key: "1".into() },
                    interval_ms: 1000,
                    variance_ms: 200,
                    toggle_hotkey: ToggleHotkey::F9,
                    enabled_by_default: false,
                },
                MacroDefinition {
                    action: MacroAction::Keyboard { key: "e".into() },
                    interval_ms: 1500,
                    variance_ms: 300,
                    toggle_hotkey: ToggleHotkey::F10,
                    enabled_by_default: false,
                },
                MacroDefinition {
                    action: MacroAction::Mouse {
                        mouse_button: MouseButton::Left,
                    },
                    interval_ms: 800,
                    variance_ms: 150,
                    toggle_hotkey: ToggleHotkey::F11,
                    enabled_by_default: false,
                },
            ],
        }
    }
}

/// One configured macro: what to emit, how often, and which hotkey toggles it.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct MacroDefinition {
    /// The simulated input, tagged by `action_type`.
    #[serde(flatten)]
    pub action: MacroAction,

    /// Base delay between emissions in milliseconds (100..=5000).
    pub interval_ms: u64,

    /// Maximum random offset applied to each delay, in milliseconds (0..=1000).
    #[serde(default, alias = "random_variance_ms")]
    pub variance_ms: u64,

    /// Function key that flips this macro on and off.
    pub toggle_hotkey: ToggleHotkey,

    /// Enabled state assigned every time the engine starts.
    #[serde(default)]
    pub enabled_by_default: bool,
}

/// Action emitted by a macro.
///
/// Serialized with an `action_type` tag so the keyboard/mouse fields are mutually exclusive:
/// `{ "action_type": "keyboard", "key": "q" }` or `{ "action_type": "mouse", "mouse_button": "left" }`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(tag = "action_type", rename_all = "lowercase")]
pub enum MacroAction {
    /// Press and release a key.
    Keyboard {
        /// Key name, see [`crate::config::KeyName`] for the accepted set.
        key: String,
    },
    /// Click a mouse button at the current pointer position.
    Mouse { mouse_button: MouseButton },
}

impl MacroAction {
    /// Short label used in logs, e.g. `key 'q'` or `left click`.
    pub fn label(&self) -> String {
        match self {
            MacroAction::Keyboard { key } => format!("key '{key}'"),
            MacroAction::Mouse { mouse_button } => format!("{mouse_button} click"),
        }
    }
}

/// Mouse button enumeration.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl fmt::Display for MouseButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MouseButton::Left => "left",
            MouseButton::Right => "right",
            MouseButton::Middle => "middle",
        })
    }
}

/// Function keys usable as toggle hotkeys. Serialized as `"F1"` ... `"F12"`.
#[derive(
    Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
pub enum ToggleHotkey {
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,
}

impl ToggleHotkey {
    /// Every toggle hotkey, in keyboard order.
    pub const ALL: [ToggleHotkey; 12] = [
        ToggleHotkey::F1,
        ToggleHotkey::F2,
        ToggleHotkey::F3,
        ToggleHotkey::F4,
        ToggleHotkey::F5,
        ToggleHotkey::F6,
        ToggleHotkey::F7,
        ToggleHotkey::F8,
        ToggleHotkey::F9,
        ToggleHotkey::F10,
        ToggleHotkey::F11,
        ToggleHotkey::F12,
    ];
}

impl fmt::Display for ToggleHotkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}
