/*!
Macro execution engine.

This module wires together:
- `status`: the shared enabled/disabled table
- `scheduler`: one jittered timer loop per macro
- `controller`: the Stopped/Running state machine that owns both

Typical usage:
```no_run
use std::sync::Arc;
use macrobuddy::config::Config;
use macrobuddy::engine::MacroEngine;
use macrobuddy::hotkey::ManualHotkeyProvider;
use macrobuddy::input::EnigoInjector;

# async fn demo() -> anyhow::Result<()> {
let engine = MacroEngine::new(
    Arc::new(EnigoInjector::new(true)),
    Arc::new(ManualHotkeyProvider::new()),
);
engine.start(&Config::default()).await?;
engine.toggle(0).await?;
let status = engine.status().await?;
engine.stop().await?;
# Ok(())
# }
```
*/

pub mod controller;
pub mod scheduler;
pub mod status;

pub use controller::{MacroEngine, MacroStatus};
pub use scheduler::jittered_delay;
pub use status::StatusTable;
