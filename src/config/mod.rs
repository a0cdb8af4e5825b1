//! Configuration module for Macrobuddy.
//!
//! This module wires together the data models, the supported key set, the
//! validator and the JSON loading/saving helpers.
//!
//! Example:
//! use macrobuddy::config::{load_from_path, validate_macros};
//!
//! let cfg = load_from_path("macros.json")?;
//! validate_macros(&cfg.macros)?;

pub mod keys;
pub mod loader;
pub mod models;
pub mod validate;

// Re-export core data models
pub use keys::KeyName;
pub use models::{Config, MacroAction, MacroDefinition, MouseButton, ToggleHotkey};

// Re-export loader utilities
pub use loader::{
    check_path, generate_schema, load_from_path, load_from_path_async, load_from_reader, load_from_str,
    load_or_default, save_to_path, write_schema_to_writer,
};

// Re-export the validator
pub use validate::{
    MAX_INTERVAL_MS, MAX_VARIANCE_MS, MIN_INTERVAL_MS, describe_violation, validate_macros,
};
