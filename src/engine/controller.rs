use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::scheduler::MacroScheduler;
use super::status::StatusTable;
use crate::config::{Config, MacroAction, MacroDefinition, ToggleHotkey, validate_macros};
use crate::error::{EngineError, HotkeyError};
use crate::hotkey::{HotkeyDispatcher, HotkeyProvider};
use crate::input::InputInjector;

/// How long `stop` waits for each task before aborting it.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(250);

/// Point-in-time view of one macro, as returned by [`MacroEngine::status`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MacroStatus {
    pub index: usize,
    pub enabled: bool,
    #[serde(flatten)]
    pub action: MacroAction,
    pub toggle_hotkey: ToggleHotkey,
}

/// What toggles and status reads see while the engine is running.
struct ActiveMacros {
    definitions: Arc<[MacroDefinition]>,
    table: Arc<StatusTable>,
}

/// Handles owned by a running engine.
struct RunningEngine {
    cancel: CancellationToken,
    schedulers: Vec<JoinHandle<()>>,
    dispatcher: JoinHandle<()>,
}

/// The macro engine: a Stopped/Running state machine over a set of schedulers
/// and one hotkey dispatcher.
///
/// `start` and `stop` are serialized by a lifecycle lock. Toggles and status
/// reads only take a brief read lock on the active macros, so they observe either
/// the last running table or Stopped, never a half-built state.
pub struct MacroEngine {
    injector: Arc<dyn InputInjector>,
    hotkeys: Arc<dyn HotkeyProvider>,
    lifecycle: Mutex<Option<RunningEngine>>,
    active: RwLock<Option<Arc<ActiveMacros>>>,
}

impl MacroEngine {
    /// Create a stopped engine that emits through `injector` and hooks toggles through `hotkeys`.
    pub fn new(injector: Arc<dyn InputInjector>, hotkeys: Arc<dyn HotkeyProvider>) -> Self {
        Self {
            injector,
            hotkeys,
            lifecycle: Mutex::new(None),
            active: RwLock::new(None),
        }
    }

    /// Whether the engine is currently running.
    pub async fn is_running(&self) -> bool {
        self.active.read().await.is_some()
    }

    /// Validate `config`, hook its hotkeys and spawn one scheduler per macro.
    ///
    /// Either everything starts or nothing does: validation and hotkey
    /// registration happen before any scheduler is spawned.
    pub async fn start(&self, config: &Config) -> Result<(), EngineError> {
        let mut lifecycle = self.lifecycle.lock().await;
        if lifecycle.is_some() {
            return Err(EngineError::AlreadyRunning);
        }
        validate_macros(&config.macros)?;

        let flags = config.macros.iter().map(|d| d.enabled_by_default).collect();
        self.launch(&mut lifecycle, config.macros.clone().into(), flags)
            .await?;
        info!(
            target: "macrobuddy::engine",
            macros = config.macros.len(),
            enabled = config.macros.iter().filter(|m| m.enabled_by_default).count(),
            "Macro engine started"
        );
        Ok(())
    }

    /// Cancel every scheduler, remove the hotkey hooks and wait for all tasks to end.
    pub async fn stop(&self) -> Result<(), EngineError> {
        let mut lifecycle = self.lifecycle.lock().await;
        self.shutdown(&mut lifecycle).await?;
        info!(target: "macrobuddy::engine", "Macro engine stopped");
        Ok(())
    }

    /// Replace the running macros with `config` under one lifecycle guard.
    ///
    /// If the new set fails to start, the previous macros are relaunched with
    /// the flags they had. An invalid `config` leaves the engine untouched.
    pub async fn restart(&self, config: &Config) -> Result<(), EngineError> {
        validate_macros(&config.macros)?;
        let mut lifecycle = self.lifecycle.lock().await;
        let previous = self.active().await?;
        let previous_flags = previous.table.snapshot();
        self.shutdown(&mut lifecycle).await?;

        let flags = config.macros.iter().map(|d| d.enabled_by_default).collect();
        let Err(e) = self
            .launch(&mut lifecycle, config.macros.clone().into(), flags)
            .await
        else {
            info!(target: "macrobuddy::engine", macros = config.macros.len(), "Macro engine restarted");
            return Ok(());
        };

        warn!(target: "macrobuddy::engine", error = %e, "Restart failed; restoring previous macros");
        if let Err(restore) = self
            .launch(&mut lifecycle, previous.definitions.clone(), previous_flags)
            .await
        {
            error!(
                target: "macrobuddy::engine",
                error = %restore,
                "Previous macros could not be restored; engine is stopped"
            );
        }
        Err(e)
    }

    async fn launch(
        &self,
        lifecycle: &mut Option<RunningEngine>,
        definitions: Arc<[MacroDefinition]>,
        flags: Vec<bool>,
    ) -> Result<(), EngineError> {
        let table = Arc::new(StatusTable::new(flags));
        let dispatcher = HotkeyDispatcher::new(&definitions, table.clone());

        let hotkeys = self.hotkeys.clone();
        let wanted = dispatcher.hotkeys();
        let events = tokio::task::spawn_blocking(move || hotkeys.activate(&wanted))
            .await
            .map_err(|e| HotkeyError::Manager(e.to_string()))??;

        let cancel = CancellationToken::new();
        let dispatcher = dispatcher.spawn(events, cancel.child_token());
        let schedulers = definitions
            .iter()
            .enumerate()
            .map(|(index, def)| {
                MacroScheduler::new(
                    index,
                    def.clone(),
                    table.clone(),
                    self.injector.clone(),
                    cancel.child_token(),
                )
                .spawn()
            })
            .collect();

        *self.active.write().await = Some(Arc::new(ActiveMacros { definitions, table }));
        *lifecycle = Some(RunningEngine {
            cancel,
            schedulers,
            dispatcher,
        });
        Ok(())
    }

    async fn shutdown(&self, lifecycle: &mut Option<RunningEngine>) -> Result<(), EngineError> {
        let running = lifecycle.take().ok_or(EngineError::NotRunning)?;

        running.cancel.cancel();
        let hotkeys = self.hotkeys.clone();
        if let Err(e) = tokio::task::spawn_blocking(move || hotkeys.deactivate()).await {
            warn!(target: "macrobuddy::engine", error = %e, "Hotkey deactivation failed");
        }

        join_with_grace("hotkey dispatcher", running.dispatcher).await;
        for (index, handle) in running.schedulers.into_iter().enumerate() {
            join_with_grace(&format!("scheduler #{index}"), handle).await;
        }

        *self.active.write().await = None;
        Ok(())
    }

    /// Flip the enabled flag of the macro at `index`. Returns the new flag.
    pub async fn toggle(&self, index: usize) -> Result<bool, EngineError> {
        let active = self.active().await?;
        let enabled = active.table.flip(index).ok_or(EngineError::IndexOutOfRange {
            index,
            len: active.definitions.len(),
        })?;
        info!(target: "macrobuddy::engine", index, enabled, "Macro toggled");
        Ok(enabled)
    }

    /// Consistent snapshot of every macro's flag and identity.
    pub async fn status(&self) -> Result<Vec<MacroStatus>, EngineError> {
        let active = self.active().await?;
        let flags = active.table.snapshot();
        Ok(active
            .definitions
            .iter()
            .zip(flags)
            .enumerate()
            .map(|(index, (def, enabled))| MacroStatus {
                index,
                enabled,
                action: def.action.clone(),
                toggle_hotkey: def.toggle_hotkey,
            })
            .collect())
    }

    async fn active(&self) -> Result<Arc<ActiveMacros>, EngineError> {
        self.active
            .read()
            .await
            .clone()
            .ok_or(EngineError::NotRunning)
    }
}

async fn join_with_grace(name: &str, mut handle: JoinHandle<()>) {
    match timeout(SHUTDOWN_GRACE, &mut handle).await {
        Ok(Ok(())) => debug!(target: "macrobuddy::engine", task = name, "Task finished"),
        Ok(Err(e)) => warn!(target: "macrobuddy::engine", task = name, error = %e, "Task failed"),
        Err(_) => {
            warn!(target: "macrobuddy::engine", task = name, "Task missed shutdown grace period; aborting");
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MouseButton;
    use crate::error::InjectionError;
    use crate::hotkey::{HotkeyEvent, ManualHotkeyProvider};
    use std::sync::mpsc as std_mpsc;
    use tokio::sync::mpsc::UnboundedReceiver;

    /// Refuses F12; otherwise behaves like the manual provider.
    #[derive(Default)]
    struct NoF12Hotkeys(ManualHotkeyProvider);

    impl HotkeyProvider for NoF12Hotkeys {
        fn activate(
            &self,
            hotkeys: &[ToggleHotkey],
        ) -> Result<UnboundedReceiver<HotkeyEvent>, HotkeyError> {
            if hotkeys.contains(&ToggleHotkey::F12) {
                return Err(HotkeyError::Register {
                    hotkey: ToggleHotkey::F12,
                    reason: "taken".into(),
                });
            }
            self.0.activate(hotkeys)
        }

        fn deactivate(&self) {
            self.0.deactivate();
        }
    }

    /// Blocks in `activate` until a task on the runtime signals it.
    struct HandshakeHotkeys {
        inner: ManualHotkeyProvider,
        signal: std::sync::Mutex<std_mpsc::Receiver<()>>,
    }

    impl HotkeyProvider for HandshakeHotkeys {
        fn activate(
            &self,
            hotkeys: &[ToggleHotkey],
        ) -> Result<UnboundedReceiver<HotkeyEvent>, HotkeyError> {
            self.signal
                .lock()
                .unwrap()
                .recv_timeout(Duration::from_secs(2))
                .map_err(|_| HotkeyError::ListenerExited)?;
            self.inner.activate(hotkeys)
        }

        fn deactivate(&self) {
            self.inner.deactivate();
        }
    }

    struct NullInjector;

    impl InputInjector for NullInjector {
        fn emit(&self, _action: &MacroAction) -> Result<(), InjectionError> {
            Ok(())
        }
    }

    fn engine() -> (MacroEngine, Arc<ManualHotkeyProvider>) {
        let hotkeys = Arc::new(ManualHotkeyProvider::new());
        (
            MacroEngine::new(Arc::new(NullInjector), hotkeys.clone()),
            hotkeys,
        )
    }

    fn config() -> Config {
        Config {
            macros: vec![
                MacroDefinition {
                    action: MacroAction::Keyboard { key: "q".into() },
                    interval_ms: 1000,
                    variance_ms: 200,
                    toggle_hotkey: ToggleHotkey::F1,
                    enabled_by_default: false,
                },
                MacroDefinition {
                    action: MacroAction::Mouse {
                        mouse_button: MouseButton::Left,
                    },
                    interval_ms: 500,
                    variance_ms: 100,
                    toggle_hotkey: ToggleHotkey::F2,
                    enabled_by_default: true,
                },
            ],
        }
    }

    #[tokio::test]
    async fn start_populates_status_from_defaults() {
        let (engine, hotkeys) = engine();
        engine.start(&config()).await.unwrap();
        assert!(engine.is_running().await);
        assert_eq!(hotkeys.registered(), vec![ToggleHotkey::F1, ToggleHotkey::F2]);

        let status = engine.status().await.unwrap();
        assert_eq!(status.len(), 2);
        assert!(!status[0].enabled);
        assert!(status[1].enabled);
        assert_eq!(status[1].toggle_hotkey, ToggleHotkey::F2);

        engine.stop().await.unwrap();
        assert!(!hotkeys.is_active());
    }

    #[tokio::test]
    async fn double_start_and_double_stop_are_rejected() {
        let (engine, _) = engine();
        assert!(matches!(engine.stop().await, Err(EngineError::NotRunning)));
        engine.start(&config()).await.unwrap();
        assert!(matches!(
            engine.start(&config()).await,
            Err(EngineError::AlreadyRunning)
        ));
        engine.stop().await.unwrap();
        assert!(matches!(engine.stop().await, Err(EngineError::NotRunning)));
    }

    #[tokio::test]
    async fn toggle_checks_state_and_range() {
        let (engine, _) = engine();
        assert!(matches!(engine.toggle(0).await, Err(EngineError::NotRunning)));
        engine.start(&config()).await.unwrap();
        assert!(matches!(
            engine.toggle(2).await,
            Err(EngineError::IndexOutOfRange { index: 2, len: 2 })
        ));
        assert!(engine.toggle(0).await.unwrap());
        engine.stop().await.unwrap();
    }

    #[tokio::test]
    async fn invalid_config_leaves_engine_stopped_without_hooks() {
        let (engine, hotkeys) = engine();
        let mut cfg = config();
        cfg.macros[1].toggle_hotkey = ToggleHotkey::F1;
        assert!(matches!(
            engine.start(&cfg).await,
            Err(EngineError::InvalidConfiguration(_))
        ));
        assert!(!engine.is_running().await);
        assert!(!hotkeys.is_active());
    }

    #[tokio::test]
    async fn hotkey_failure_aborts_start() {
        let (engine, hotkeys) = engine();
        let _held = hotkeys.activate(&[ToggleHotkey::F5]).unwrap();
        assert!(matches!(
            engine.start(&config()).await,
            Err(EngineError::Hotkey(_))
        ));
        assert!(!engine.is_running().await);
    }

    #[tokio::test]
    async fn blocking_activation_does_not_stall_the_runtime() {
        let (tx, rx) = std_mpsc::channel();
        let hotkeys = Arc::new(HandshakeHotkeys {
            inner: ManualHotkeyProvider::new(),
            signal: std::sync::Mutex::new(rx),
        });
        let engine = MacroEngine::new(Arc::new(NullInjector), hotkeys);

        // Runs only if `start` yields this single-threaded runtime while activating.
        tokio::spawn(async move { tx.send(()).unwrap() });
        engine.start(&config()).await.unwrap();
        engine.stop().await.unwrap();
    }

    #[tokio::test]
    async fn restart_swaps_macros_and_resets_flags() {
        let (engine, hotkeys) = engine();
        engine.start(&config()).await.unwrap();
        engine.toggle(0).await.unwrap();

        let mut next = config();
        next.macros.truncate(1);
        next.macros[0].toggle_hotkey = ToggleHotkey::F7;
        engine.restart(&next).await.unwrap();

        let status = engine.status().await.unwrap();
        assert_eq!(status.len(), 1);
        assert!(!status[0].enabled);
        assert_eq!(hotkeys.registered(), vec![ToggleHotkey::F7]);
        engine.stop().await.unwrap();
    }

    #[tokio::test]
    async fn failed_restart_restores_previous_macros() {
        let hotkeys = Arc::new(NoF12Hotkeys::default());
        let engine = MacroEngine::new(Arc::new(NullInjector), hotkeys.clone());
        engine.start(&config()).await.unwrap();
        engine.toggle(0).await.unwrap();

        let mut next = config();
        next.macros[1].toggle_hotkey = ToggleHotkey::F12;
        assert!(matches!(
            engine.restart(&next).await,
            Err(EngineError::Hotkey(HotkeyError::Register { .. }))
        ));

        let status = engine.status().await.unwrap();
        assert_eq!(status[1].toggle_hotkey, ToggleHotkey::F2);
        assert!(status[0].enabled && status[1].enabled);
        assert_eq!(hotkeys.0.registered(), vec![ToggleHotkey::F1, ToggleHotkey::F2]);
        engine.stop().await.unwrap();
    }

    #[tokio::test]
    async fn restart_requires_a_running_engine() {
        let (engine, hotkeys) = engine();
        assert!(matches!(
            engine.restart(&config()).await,
            Err(EngineError::NotRunning)
        ));
        assert!(!hotkeys.is_active());
    }
}
