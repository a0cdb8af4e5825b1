/*!
Simulated input.

The engine never talks to the OS directly; it emits through an [`InputInjector`].
`EnigoInjector` is the desktop implementation. Tests and embedders can supply
their own injector to observe or redirect emissions.
*/

use crate::config::MacroAction;
use crate::error::InjectionError;

pub mod desktop;

pub use desktop::EnigoInjector;

/// Capability to emit one simulated input event.
///
/// Implementations must be callable from several scheduler tasks at once.
/// A failed emission is transient: the caller logs it and keeps going.
pub trait InputInjector: Send + Sync {
    /// Emit `action` once: a press-and-release for keys, a click at the current
    /// pointer position for mouse buttons.
    fn emit(&self, action: &MacroAction) -> Result<(), InjectionError>;
}
