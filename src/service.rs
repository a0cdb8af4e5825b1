//! Operation surface for UIs and other front ends.
//!
//! `MacroService` pairs one [`MacroEngine`] with a [`ConfigStore`]. Configuration
//! loaded from the store is cached until the next save.

use anyhow::Result;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::{self, Config, MacroDefinition};
use crate::engine::{MacroEngine, MacroStatus};
use crate::error::{EngineError, ServiceError};

/// Persistence collaborator for the macro list.
pub trait ConfigStore: Send + Sync {
    fn load(&self) -> Result<Config>;
    fn save(&self, config: &Config) -> Result<()>;
}

/// Stores the configuration as a pretty-printed JSON file.
/// A missing file is created with [`Config::default`] on first load.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStore for JsonFileStore {
    fn load(&self) -> Result<Config> {
        config::load_or_default(&self.path)
    }

    fn save(&self, config: &Config) -> Result<()> {
        config::save_to_path(config, &self.path)
    }
}

/// The engine plus its configuration source.
pub struct MacroService {
    engine: MacroEngine,
    store: Box<dyn ConfigStore>,
    cache: RwLock<Option<Config>>,
}

impl MacroService {
    pub fn new(engine: MacroEngine, store: Box<dyn ConfigStore>) -> Self {
        Self {
            engine,
            store,
            cache: RwLock::new(None),
        }
    }

    pub fn engine(&self) -> &MacroEngine {
        &self.engine
    }

    /// Current configuration, from the cache or the store.
    pub async fn load_config(&self) -> Result<Config, ServiceError> {
        if let Some(cached) = self.cache.read().await.as_ref() {
            return Ok(cached.clone());
        }
        let mut cache = self.cache.write().await;
        if let Some(cached) = cache.as_ref() {
            return Ok(cached.clone());
        }
        let loaded = self.store.load().map_err(ServiceError::persistence)?;
        debug!(target: "macrobuddy::service", macros = loaded.macros.len(), "Config loaded");
        *cache = Some(loaded.clone());
        Ok(loaded)
    }

    /// Validate and persist `config`. An invalid configuration is never written.
    pub async fn save_config(&self, config: Config) -> Result<(), ServiceError> {
        config::validate_macros(&config.macros)?;
        let mut cache = self.cache.write().await;
        self.store.save(&config).map_err(ServiceError::persistence)?;
        *cache = None;
        info!(target: "macrobuddy::service", macros = config.macros.len(), "Config saved");
        Ok(())
    }

    /// `None` when valid, otherwise the first violation's description.
    pub fn validate_config(&self, macros: &[MacroDefinition]) -> Option<String> {
        config::describe_violation(macros)
    }

    /// Start the engine with the current configuration.
    pub async fn start_macro_engine(&self) -> Result<(), ServiceError> {
        let config = self.load_config().await?;
        Ok(self.engine.start(&config).await?)
    }

    pub async fn stop_macro_engine(&self) -> Result<(), ServiceError> {
        Ok(self.engine.stop().await?)
    }

    /// Status of every macro; empty while the engine is stopped.
    pub async fn get_macro_status(&self) -> Vec<MacroStatus> {
        match self.engine.status().await {
            Ok(status) => status,
            Err(EngineError::NotRunning) => Vec::new(),
            Err(e) => {
                debug!(target: "macrobuddy::service", error = %e, "Status unavailable");
                Vec::new()
            }
        }
    }

    pub async fn toggle_macro(&self, index: usize) -> Result<(), ServiceError> {
        self.engine.toggle(index).await?;
        Ok(())
    }

    /// Re-read the store, bypassing the cache, and restart a running engine with the result.
    ///
    /// An invalid configuration leaves both the cache and the running engine untouched.
    /// If the new macros fail to start, the engine keeps running the previous ones.
    /// Returns whether the engine was restarted.
    pub async fn reload_config(&self) -> Result<bool, ServiceError> {
        let fresh = self.store.load().map_err(ServiceError::persistence)?;
        config::validate_macros(&fresh.macros)?;
        *self.cache.write().await = Some(fresh.clone());

        match self.engine.restart(&fresh).await {
            Ok(()) => {
                info!(target: "macrobuddy::service", macros = fresh.macros.len(), "Engine restarted with reloaded config");
                Ok(true)
            }
            Err(EngineError::NotRunning) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
