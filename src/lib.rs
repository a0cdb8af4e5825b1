#![deny(unsafe_code)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! Macrobuddy — independently toggleable, jittered key and mouse macros.
//!
//! A configuration is an ordered list of macros. Each macro presses a key or
//! clicks a mouse button every `interval_ms ± variance_ms` while enabled, and a
//! dedicated function key flips it on and off without restarting anything.
//! - `config`: Data model, JSON loader, key set and validator.
//! - `engine`: Status table, per-macro schedulers and the engine state machine.
//! - `hotkey`: Hotkey providers and the dispatcher that turns presses into toggles.
//! - `input`: Simulated input through Enigo.
//! - `service`: The load/save/validate/start/stop/status/toggle operation surface.
//! - `watch`: Optional config file watcher.
//!
//! Use `macrobuddy::prelude::*` to bring commonly used items into scope quickly.

/// Public module: configuration (models, loader, validator).
pub mod config;
/// Public module: macro execution engine.
pub mod engine;
/// Public module: error types.
pub mod error;
/// Public module: global toggle hotkeys.
pub mod hotkey;
/// Public module: simulated input.
pub mod input;
/// Public module: operation surface for front ends.
pub mod service;
/// Public module: configuration file watcher.
pub mod watch;

/// Crate-level constants for consumers that want to inspect package metadata at runtime.
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Returns the crate version (e.g., "0.1.0").
#[inline]
pub const fn version() -> &'static str {
    PKG_VERSION
}

/// Parse a log level name (trace|debug|info|warn|error), case-insensitively.
pub fn parse_level(s: &str) -> Option<tracing::Level> {
    use tracing::Level;
    match s.to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" | "warning" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

/// Initialize tracing (logging) with a reasonable default.
/// - Uses `level` when given.
/// - Otherwise honors the `RUST_LOG` environment variable if set.
/// - Falls back to `info` level.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init_tracing(level: Option<tracing::Level>) {
    use tracing::Level;
    use tracing_subscriber::fmt;

    let level = level
        .or_else(|| std::env::var("RUST_LOG").ok().and_then(|s| parse_level(&s)))
        .unwrap_or(Level::INFO);

    // Ignore the error if the global subscriber was already set.
    let _ = fmt().with_max_level(level).try_init();
}

/// A convenient set of exports for most consumers.
///
/// Bring this into scope with:
/// `use macrobuddy::prelude::*;`
pub mod prelude {
    // Common result/error handling
    pub use anyhow::{Context, Error, Result, anyhow, bail, ensure};

    // Tracing macros
    pub use tracing::{debug, error, info, instrument, trace, warn};

    // Timing helpers
    pub use std::time::Duration;
    pub use tokio::time::sleep;

    // Frequently used items
    pub use crate::config::{Config, MacroAction, MacroDefinition, MouseButton, ToggleHotkey};
    pub use crate::engine::{MacroEngine, MacroStatus};
    pub use crate::error::{EngineError, ServiceError, ValidationError};
    pub use crate::hotkey::{GlobalHotkeyProvider, HotkeyProvider, ManualHotkeyProvider};
    pub use crate::input::{EnigoInjector, InputInjector};
    pub use crate::service::{ConfigStore, JsonFileStore, MacroService};
}
