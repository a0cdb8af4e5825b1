//! Configuration validator.
//!
//! One rule set gates both saving a configuration and starting the engine, so a
//! savable configuration is always a startable one.

use std::collections::HashMap;

use super::keys::KeyName;
use super::models::{MacroAction, MacroDefinition, ToggleHotkey};
use crate::error::ValidationError;

/// Smallest accepted `interval_ms`.
pub const MIN_INTERVAL_MS: u64 = 100;
/// Largest accepted `interval_ms`.
pub const MAX_INTERVAL_MS: u64 = 5000;
/// Largest accepted `variance_ms`.
pub const MAX_VARIANCE_MS: u64 = 1000;

/// Check a macro list, returning the first violated invariant.
///
/// Per-macro rules are checked in list order before the cross-macro uniqueness rules.
pub fn validate_macros(macros: &[MacroDefinition]) -> Result<(), ValidationError> {
    if macros.is_empty() {
        return Err(ValidationError::Empty);
    }

    for (index, def) in macros.iter().enumerate() {
        validate_macro(index, def)?;
    }

    let mut hotkeys: HashMap<ToggleHotkey, usize> = HashMap::new();
    for (index, def) in macros.iter().enumerate() {
        if let Some(&first) = hotkeys.get(&def.toggle_hotkey) {
            return Err(ValidationError::DuplicateHotkey {
                hotkey: def.toggle_hotkey,
                first,
                second: index,
            });
        }
        hotkeys.insert(def.toggle_hotkey, index);
    }

    // Mouse macros live in a separate namespace; only keyboard keys must be unique.
    let mut keys: HashMap<KeyName, usize> = HashMap::new();
    for (index, def) in macros.iter().enumerate() {
        let MacroAction::Keyboard { key } = &def.action else {
            continue;
        };
        let Some(name) = KeyName::parse(key) else {
            continue;
        };
        if let Some(&first) = keys.get(&name) {
            return Err(ValidationError::DuplicateKey {
                key: name.to_string(),
                first,
                second: index,
            });
        }
        keys.insert(name, index);
    }

    Ok(())
}

/// Same rules as [`validate_macros`], reported as an optional description.
/// `None` means the list is valid.
pub fn describe_violation(macros: &[MacroDefinition]) -> Option<String> {
    validate_macros(macros).err().map(|e| e.to_string())
}

fn validate_macro(index: usize, def: &MacroDefinition) -> Result<(), ValidationError> {
    if let MacroAction::Keyboard { key } = &def.action {
        if key.trim().is_empty() {
            return Err(ValidationError::EmptyKey { index });
        }
        if KeyName::parse(key).is_none() {
            return Err(ValidationError::UnsupportedKey {
                index,
                key: key.clone(),
            });
        }
    }

    if !(MIN_INTERVAL_MS..=MAX_INTERVAL_MS).contains(&def.interval_ms) {
        return Err(ValidationError::IntervalOutOfRange {
            index,
            interval_ms: def.interval_ms,
            min: MIN_INTERVAL_MS,
            max: MAX_INTERVAL_MS,
        });
    }

    if def.variance_ms > MAX_VARIANCE_MS {
        return Err(ValidationError::VarianceOutOfRange {
            index,
            variance_ms: def.variance_ms,
            max: MAX_VARIANCE_MS,
        });
    }

    if def.variance_ms > def.interval_ms {
        return Err(ValidationError::VarianceExceedsInterval {
            index,
            variance_ms: def.variance_ms,
            interval_ms: def.interval_ms,
        });
    }

    Ok(())
}
