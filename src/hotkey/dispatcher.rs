//! Maps rising-edge hotkey presses to flips in the status table.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{EdgeDetector, HotkeyEvent};
use crate::config::{MacroDefinition, ToggleHotkey};
use crate::engine::StatusTable;

/// Consumes a provider's event stream for one engine run.
pub struct HotkeyDispatcher {
    bindings: HashMap<ToggleHotkey, usize>,
    table: Arc<StatusTable>,
    edges: EdgeDetector,
}

impl HotkeyDispatcher {
    /// Bind each macro's toggle hotkey to its index.
    pub fn new(definitions: &[MacroDefinition], table: Arc<StatusTable>) -> Self {
        let bindings = definitions
            .iter()
            .enumerate()
            .map(|(index, def)| (def.toggle_hotkey, index))
            .collect();
        Self {
            bindings,
            table,
            edges: EdgeDetector::new(),
        }
    }

    /// Hotkeys to register, in index order.
    pub fn hotkeys(&self) -> Vec<ToggleHotkey> {
        let mut bound: Vec<_> = self.bindings.iter().map(|(&h, &i)| (i, h)).collect();
        bound.sort_unstable();
        bound.into_iter().map(|(_, h)| h).collect()
    }

    /// Apply one event. Returns the flipped index and its new flag, if any.
    pub fn handle(&mut self, event: HotkeyEvent) -> Option<(usize, bool)> {
        if !self.edges.observe(event) {
            return None;
        }
        let Some(&index) = self.bindings.get(&event.hotkey) else {
            debug!(target: "macrobuddy::hotkey", hotkey = %event.hotkey, "Unbound hotkey pressed");
            return None;
        };
        match self.table.flip(index) {
            Some(enabled) => {
                info!(
                    target: "macrobuddy::hotkey",
                    index,
                    hotkey = %event.hotkey,
                    enabled,
                    "Macro {} - press {} to {}",
                    if enabled { "ENABLED" } else { "DISABLED" },
                    event.hotkey,
                    if enabled { "disable" } else { "enable" },
                );
                Some((index, enabled))
            }
            None => {
                warn!(target: "macrobuddy::hotkey", index, "Hotkey bound to missing macro");
                None
            }
        }
    }

    /// Run until cancelled or until the provider closes the stream.
    pub fn spawn(
        mut self,
        mut events: UnboundedReceiver<HotkeyEvent>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            debug!(target: "macrobuddy::hotkey", "Hotkey dispatcher started");
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    event = events.recv() => match event {
                        Some(event) => {
                            self.handle(event);
                        }
                        None => break,
                    },
                }
            }
            debug!(target: "macrobuddy::hotkey", "Hotkey dispatcher stopped");
        })
    }
}
