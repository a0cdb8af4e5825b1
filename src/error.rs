//! Error types for Macrobuddy.
//!
//! Validation and engine-state errors are reported synchronously to the caller.
//! Injection errors never leave a scheduler; they are logged and the loop continues.
//! Persistence errors are carried opaquely as `anyhow::Error`.

use thiserror::Error;

use crate::config::ToggleHotkey;

/// A configuration invariant that does not hold. `Display` is the user-facing description.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("no macros configured")]
    Empty,

    #[error("macro #{index} has an empty key")]
    EmptyKey { index: usize },

    #[error("macro #{index} uses unsupported key '{key}'")]
    UnsupportedKey { index: usize, key: String },

    #[error("macro #{index} has interval {interval_ms}ms, expected {min}..={max}ms")]
    IntervalOutOfRange {
        index: usize,
        interval_ms: u64,
        min: u64,
        max: u64,
    },

    #[error("macro #{index} has variance {variance_ms}ms, expected at most {max}ms")]
    VarianceOutOfRange {
        index: usize,
        variance_ms: u64,
        max: u64,
    },

    #[error("macro #{index} has variance {variance_ms}ms exceeding its interval {interval_ms}ms")]
    VarianceExceedsInterval {
        index: usize,
        variance_ms: u64,
        interval_ms: u64,
    },

    #[error("duplicate hotkey {hotkey} on macros #{first} and #{second}")]
    DuplicateHotkey {
        hotkey: ToggleHotkey,
        first: usize,
        second: usize,
    },

    #[error("duplicate key '{key}' on macros #{first} and #{second}")]
    DuplicateKey {
        key: String,
        first: usize,
        second: usize,
    },
}

/// Failure of a single simulated input event at the OS boundary.
#[derive(Error, Debug)]
pub enum InjectionError {
    #[error("failed to connect to the input backend: {0}")]
    Connection(#[from] enigo::NewConError),

    #[error("failed to emit input: {0}")]
    Input(#[from] enigo::InputError),

    #[error("unsupported key '{0}'")]
    UnsupportedKey(String),

    #[error("input backend unavailable: {0}")]
    Unavailable(String),
}

/// Failure to register or listen for global hotkeys.
#[derive(Error, Debug)]
pub enum HotkeyError {
    #[error("failed to create hotkey manager: {0}")]
    Manager(String),

    #[error("failed to register hotkey {hotkey}: {reason}")]
    Register { hotkey: ToggleHotkey, reason: String },

    #[error("hotkeys are already active")]
    AlreadyActive,

    #[error("hotkey listener exited before reporting registration")]
    ListenerExited,

    #[error("global hotkeys are not supported here: {0}")]
    Unsupported(&'static str),
}

/// Operation invalid for the engine's current state.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("macro engine is already running")]
    AlreadyRunning,

    #[error("macro engine is not running")]
    NotRunning,

    #[error("invalid macro index {index} (have {len} macros)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(#[from] ValidationError),

    #[error(transparent)]
    Hotkey(#[from] HotkeyError),
}

/// Error returned by the service operations that front the engine and storage.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("persistence error: {0:#}")]
    Persistence(#[source] anyhow::Error),
}

impl ServiceError {
    /// Wrap an error from the configuration store.
    pub fn persistence(err: anyhow::Error) -> Self {
        Self::Persistence(err)
    }
}
