//! In-process hotkey provider.
//!
//! No OS hooks are installed. Whoever owns the provider feeds key transitions
//! with [`ManualHotkeyProvider::press`] and [`ManualHotkeyProvider::release`];
//! events for hotkeys that are not registered are dropped.

use std::sync::{Mutex, PoisonError};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, trace};

use super::{HotkeyEvent, HotkeyProvider};
use crate::config::ToggleHotkey;
use crate::error::HotkeyError;

#[derive(Debug, Default)]
struct Registration {
    hotkeys: Vec<ToggleHotkey>,
    sender: Option<UnboundedSender<HotkeyEvent>>,
}

/// Hotkey provider driven by explicit calls instead of the keyboard.
#[derive(Debug, Default)]
pub struct ManualHotkeyProvider {
    registration: Mutex<Registration>,
}

impl ManualHotkeyProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report a key-down. Returns `false` when the hotkey is not registered.
    pub fn press(&self, hotkey: ToggleHotkey) -> bool {
        self.send(HotkeyEvent::pressed(hotkey))
    }

    /// Report a key-up. Returns `false` when the hotkey is not registered.
    pub fn release(&self, hotkey: ToggleHotkey) -> bool {
        self.send(HotkeyEvent::released(hotkey))
    }

    /// Hotkeys currently hooked, in registration order. Empty when inactive.
    pub fn registered(&self) -> Vec<ToggleHotkey> {
        self.lock().hotkeys.clone()
    }

    /// Whether hooks are currently installed.
    pub fn is_active(&self) -> bool {
        self.lock().sender.is_some()
    }

    fn send(&self, event: HotkeyEvent) -> bool {
        let registration = self.lock();
        if !registration.hotkeys.contains(&event.hotkey) {
            trace!(target: "macrobuddy::hotkey", hotkey = %event.hotkey, "Ignoring unregistered hotkey");
            return false;
        }
        registration
            .sender
            .as_ref()
            .is_some_and(|tx| tx.send(event).is_ok())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Registration> {
        self.registration
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl HotkeyProvider for ManualHotkeyProvider {
    fn activate(
        &self,
        hotkeys: &[ToggleHotkey],
    ) -> Result<UnboundedReceiver<HotkeyEvent>, HotkeyError> {
        let mut registration = self.lock();
        if registration.sender.is_some() {
            return Err(HotkeyError::AlreadyActive);
        }
        let (tx, rx) = mpsc::unbounded_channel();
        registration.hotkeys = hotkeys.to_vec();
        registration.sender = Some(tx);
        debug!(target: "macrobuddy::hotkey", count = hotkeys.len(), "Manual hotkeys activated");
        Ok(rx)
    }

    fn deactivate(&self) {
        let mut registration = self.lock();
        registration.hotkeys.clear();
        registration.sender = None;
        debug!(target: "macrobuddy::hotkey", "Manual hotkeys deactivated");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_flow_only_while_active() {
        let provider = ManualHotkeyProvider::new();
        assert!(!provider.press(ToggleHotkey::F1));

        let mut rx = provider.activate(&[ToggleHotkey::F1]).unwrap();
        assert!(provider.is_active());
        assert!(provider.press(ToggleHotkey::F1));
        assert!(!provider.press(ToggleHotkey::F2));
        assert_eq!(rx.try_recv().unwrap(), HotkeyEvent::pressed(ToggleHotkey::F1));
        assert!(rx.try_recv().is_err());

        provider.deactivate();
        assert!(!provider.is_active());
        assert!(provider.registered().is_empty());
        assert!(!provider.press(ToggleHotkey::F1));
    }

    #[test]
    fn double_activation_is_rejected() {
        let provider = ManualHotkeyProvider::new();
        let _rx = provider.activate(&[ToggleHotkey::F1]).unwrap();
        assert!(matches!(
            provider.activate(&[ToggleHotkey::F2]),
            Err(HotkeyError::AlreadyActive)
        ));
    }

    #[tokio::test]
    async fn deactivation_closes_the_stream() {
        let provider = ManualHotkeyProvider::new();
        let mut rx = provider.activate(&[ToggleHotkey::F3]).unwrap();
        provider.deactivate();
        assert!(rx.recv().await.is_none());
    }
}
