use anyhow::{Context, Result};
use schemars::{Schema, schema_for};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;
use tracing::{debug, info};

use super::models::Config;
use super::validate::describe_violation;

/// Load configuration from a string slice.
///
/// Loading only parses; call [`super::validate_macros`] before running the result.
pub fn load_from_str(s: &str) -> Result<Config> {
    serde_json::from_str(s).context("Failed to parse JSON config string into Config")
}

/// Load configuration from any reader (e.g., a file).
pub fn load_from_reader<R: Read>(reader: R) -> Result<Config> {
    serde_json::from_reader(reader).context("Failed to parse JSON config from reader")
}

/// Load configuration from a file path synchronously.
pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path_ref = path.as_ref();
    let file = File::open(path_ref)
        .with_context(|| format!("Failed to open config file {}", path_ref.display()))?;
    let cfg = load_from_reader(file)
        .with_context(|| format!("Invalid config file {}", path_ref.display()))?;
    debug!("Loaded config from {}", path_ref.display());
    Ok(cfg)
}

/// Load configuration from a file path asynchronously (Tokio).
pub async fn load_from_path_async<P: AsRef<Path>>(path: P) -> Result<Config> {
    use tokio::fs;
    let path_ref = path.as_ref();
    let bytes = fs::read(path_ref)
        .await
        .with_context(|| format!("Failed to read config file {}", path_ref.display()))?;
    let cfg: Config = serde_json::from_slice(&bytes)
        .with_context(|| format!("Failed to parse JSON config from {}", path_ref.display()))?;
    debug!("Loaded config from {}", path_ref.display());
    Ok(cfg)
}

/// Write configuration to a file path as pretty-printed JSON, creating parent directories.
pub fn save_to_path<P: AsRef<Path>>(cfg: &Config, path: P) -> Result<()> {
    let path_ref = path.as_ref();
    if let Some(parent) = path_ref.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(cfg).context("Failed to serialize config")?;
    fs::write(path_ref, json)
        .with_context(|| format!("Failed to write config file {}", path_ref.display()))?;
    debug!("Saved config to {}", path_ref.display());
    Ok(())
}

/// Load configuration, writing and returning [`Config::default`] when the file does not exist.
pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path_ref = path.as_ref();
    if path_ref.exists() {
        return load_from_path(path_ref);
    }
    let cfg = Config::default();
    save_to_path(&cfg, path_ref)?;
    info!(path = %path_ref.display(), "Created default config");
    Ok(cfg)
}

/// Load the file at `path` without creating it and describe its first violation.
///
/// `Ok(None)` means the file is valid.
pub fn check_path<P: AsRef<Path>>(path: P) -> Result<Option<String>> {
    let cfg = load_from_path(path)?;
    Ok(describe_violation(&cfg.macros))
}

/// Generate the JSON Schema for the Config model (for external validation or tooling).
pub fn generate_schema() -> Schema {
    schema_for!(Config)
}

/// Write the JSON Schema for the Config model to any writer (pretty-printed).
pub fn write_schema_to_writer<W: Write>(mut writer: W) -> Result<()> {
    let schema = generate_schema();
    let json = serde_json::to_string_pretty(&schema).context("Failed to serialize schema")?;
    writer
        .write_all(json.as_bytes())
        .context("Failed to write schema to writer")?;
    Ok(())
}
