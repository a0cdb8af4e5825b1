//! Configuration file watcher.
//!
//! Watches the directory holding the configuration file (editors often replace
//! the file rather than write it in place) and reports one change per burst of
//! filesystem events.

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Events closer together than this are reported as a single change.
const DEBOUNCE: Duration = Duration::from_millis(200);

/// Reports changes to a single file.
pub struct ConfigWatcher {
    path: PathBuf,
    events: UnboundedReceiver<()>,
    _watcher: RecommendedWatcher,
}

impl ConfigWatcher {
    /// Start watching `path`. The file itself does not need to exist yet.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file_name = path
            .file_name()
            .map(ToOwned::to_owned)
            .with_context(|| format!("Config path {} has no file name", path.display()))?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let (tx, events) = mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                let relevant = matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_))
                    && event
                        .paths
                        .iter()
                        .any(|p| p.file_name() == Some(file_name.as_os_str()));
                if relevant {
                    let _ = tx.send(());
                }
            }
            Err(e) => warn!(target: "macrobuddy::watch", error = %e, "Watch error"),
        })
        .context("Failed to create file watcher")?;
        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch {}", dir.display()))?;

        info!(target: "macrobuddy::watch", path = %path.display(), "Watching config file");
        Ok(Self {
            path,
            events,
            _watcher: watcher,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Wait for the next change. Returns `None` if the watcher has shut down.
    pub async fn changed(&mut self) -> Option<()> {
        self.events.recv().await?;
        // Swallow the rest of the burst.
        while let Ok(Some(())) = timeout(DEBOUNCE, self.events.recv()).await {}
        debug!(target: "macrobuddy::watch", path = %self.path.display(), "Config file changed");
        Some(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_without_file_name_is_rejected() {
        assert!(ConfigWatcher::new("/").is_err());
    }

    #[tokio::test]
    async fn reports_a_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("macros.json");
        let mut watcher = ConfigWatcher::new(&path).unwrap();
        assert_eq!(watcher.path(), path.as_path());

        std::fs::write(&path, "{}").unwrap();
        let changed = timeout(Duration::from_secs(5), watcher.changed()).await;
        assert_eq!(changed.unwrap(), Some(()));
    }
}
