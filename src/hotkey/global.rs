//! System-wide hotkey hooks backed by the `global-hotkey` crate.
//!
//! The hotkey manager lives on a dedicated listener thread: the thread creates
//! it, registers every hook, reports the outcome back to `activate`, then forwards
//! matching events until `deactivate` raises the stop flag. Hooks are unregistered
//! on that same thread before it exits.
//!
//! On Windows the manager's hidden window only receives `WM_HOTKEY` while its
//! creating thread pumps messages, so the listener drains the thread's message
//! queue on every poll. macOS requires the manager on the main thread under an
//! AppKit event loop, which this provider does not own; activation fails there.

use global_hotkey::hotkey::{Code, HotKey};
use global_hotkey::{GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, mpsc as std_mpsc};
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

use super::{HotkeyEvent, HotkeyProvider, KeyState};
use crate::config::ToggleHotkey;
use crate::error::HotkeyError;

/// How long the listener blocks on the OS event queue before re-checking the stop flag.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

struct Listener {
    stop: Arc<AtomicBool>,
    thread: thread::JoinHandle<()>,
}

/// Hotkey provider that installs OS-level hooks for F1..F12 without modifiers.
///
/// Supported on Windows and Linux (X11). On macOS [`HotkeyProvider::activate`]
/// returns [`HotkeyError::Unsupported`]; use the manual provider there.
#[derive(Default)]
pub struct GlobalHotkeyProvider {
    listener: Mutex<Option<Listener>>,
}

impl GlobalHotkeyProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HotkeyProvider for GlobalHotkeyProvider {
    fn activate(
        &self,
        hotkeys: &[ToggleHotkey],
    ) -> Result<UnboundedReceiver<HotkeyEvent>, HotkeyError> {
        if cfg!(target_os = "macos") {
            return Err(HotkeyError::Unsupported(
                "macOS global hotkeys need the main-thread event loop; run with --no-hotkeys",
            ));
        }

        let mut listener = self.listener.lock().unwrap_or_else(PoisonError::into_inner);
        if listener.is_some() {
            return Err(HotkeyError::AlreadyActive);
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = std_mpsc::sync_channel(1);
        let stop = Arc::new(AtomicBool::new(false));
        let hotkeys = hotkeys.to_vec();
        let thread_stop = stop.clone();
        let thread = thread::Builder::new()
            .name("macrobuddy-hotkeys".into())
            .spawn(move || listen(hotkeys, tx, ready_tx, thread_stop))
            .map_err(|e| HotkeyError::Manager(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                *listener = Some(Listener { stop, thread });
                Ok(rx)
            }
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                Err(HotkeyError::ListenerExited)
            }
        }
    }

    fn deactivate(&self) {
        let listener = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(Listener { stop, thread }) = listener {
            stop.store(true, Ordering::Release);
            if thread.join().is_err() {
                warn!(target: "macrobuddy::hotkey", "Hotkey listener thread panicked");
            }
        }
    }
}

fn listen(
    hotkeys: Vec<ToggleHotkey>,
    tx: UnboundedSender<HotkeyEvent>,
    ready: std_mpsc::SyncSender<Result<(), HotkeyError>>,
    stop: Arc<AtomicBool>,
) {
    let manager = match GlobalHotKeyManager::new() {
        Ok(manager) => manager,
        Err(e) => {
            let _ = ready.send(Err(HotkeyError::Manager(e.to_string())));
            return;
        }
    };

    let mut bound: HashMap<u32, (ToggleHotkey, HotKey)> = HashMap::with_capacity(hotkeys.len());
    for hotkey in hotkeys {
        let os_hotkey = HotKey::new(None, code_for(hotkey));
        if let Err(e) = manager.register(os_hotkey) {
            unregister_all(&manager, &bound);
            let _ = ready.send(Err(HotkeyError::Register {
                hotkey,
                reason: e.to_string(),
            }));
            return;
        }
        bound.insert(os_hotkey.id(), (hotkey, os_hotkey));
    }
    info!(target: "macrobuddy::hotkey", count = bound.len(), "Global hotkeys registered");
    if ready.send(Ok(())).is_err() {
        unregister_all(&manager, &bound);
        return;
    }

    let events = GlobalHotKeyEvent::receiver();
    while !stop.load(Ordering::Acquire) {
        #[cfg(windows)]
        pump_messages();

        match events.recv_timeout(POLL_INTERVAL) {
            Ok(event) => {
                let Some(&(hotkey, _)) = bound.get(&event.id) else {
                    continue;
                };
                let state = match event.state {
                    HotKeyState::Pressed => KeyState::Pressed,
                    HotKeyState::Released => KeyState::Released,
                };
                if tx.send(HotkeyEvent { hotkey, state }).is_err() {
                    break;
                }
            }
            Err(e) if e.is_timeout() => {}
            Err(_) => break,
        }
    }

    unregister_all(&manager, &bound);
    info!(target: "macrobuddy::hotkey", "Global hotkeys unregistered");
}

/// Dispatch every queued window message so the manager's window procedure
/// turns `WM_HOTKEY` into `GlobalHotKeyEvent`s.
#[cfg(windows)]
#[allow(unsafe_code)]
fn pump_messages() {
    use windows_sys::Win32::UI::WindowsAndMessaging::{
        DispatchMessageW, MSG, PM_REMOVE, PeekMessageW, TranslateMessage,
    };

    // SAFETY: MSG is plain data, and the calls only touch this thread's queue.
    unsafe {
        let mut msg: MSG = std::mem::zeroed();
        while PeekMessageW(&mut msg, std::ptr::null_mut(), 0, 0, PM_REMOVE) != 0 {
            TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }
}

fn unregister_all(manager: &GlobalHotKeyManager, bound: &HashMap<u32, (ToggleHotkey, HotKey)>) {
    for (hotkey, os_hotkey) in bound.values() {
        if let Err(e) = manager.unregister(*os_hotkey) {
            debug!(target: "macrobuddy::hotkey", %hotkey, error = %e, "Failed to unregister hotkey");
        }
    }
}

fn code_for(hotkey: ToggleHotkey) -> Code {
    match hotkey {
        ToggleHotkey::F1 => Code::F1,
        ToggleHotkey::F2 => Code::F2,
        ToggleHotkey::F3 => Code::F3,
        ToggleHotkey::F4 => Code::F4,
        ToggleHotkey::F5 => Code::F5,
        ToggleHotkey::F6 => Code::F6,
        ToggleHotkey::F7 => Code::F7,
        ToggleHotkey::F8 => Code::F8,
        ToggleHotkey::F9 => Code::F9,
        ToggleHotkey::F10 => Code::F10,
        ToggleHotkey::F11 => Code::F11,
        ToggleHotkey::F12 => Code::F12,
    }
}
