use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{debug, info, warn};

use macrobuddy::config::{self as cfg, Config};
use macrobuddy::engine::{MacroEngine, MacroStatus};
use macrobuddy::hotkey::{GlobalHotkeyProvider, HotkeyProvider, ManualHotkeyProvider};
use macrobuddy::input::EnigoInjector;
use macrobuddy::service::{JsonFileStore, MacroService};
use macrobuddy::watch::ConfigWatcher;

/// Macrobuddy CLI
#[derive(Debug, Parser)]
#[command(
    name = macrobuddy::PKG_NAME,
    version = macrobuddy::PKG_VERSION,
    about = "Run jittered key and mouse macros, each toggled by its own function key"
)]
struct Args {
    /// Path to the JSON configuration file (created with defaults if missing)
    #[arg(short = 'c', long = "config", default_value = "macros.json")]
    config: PathBuf,

    /// Enable dry-run mode (log emissions instead of simulating input)
    #[arg(long = "dry-run")]
    dry_run: bool,

    /// Do not install global hotkey hooks
    #[arg(long = "no-hotkeys")]
    no_hotkeys: bool,

    /// Set log level (e.g., trace, debug, info, warn, error). Overrides RUST_LOG.
    #[arg(long = "log-level")]
    log_level: Option<String>,

    /// How often to poll macro status for changes, in milliseconds
    #[arg(long = "status-interval-ms", default_value_t = 500)]
    status_interval_ms: u64,

    /// Restart the engine when the configuration file changes
    #[arg(long = "watch")]
    watch: bool,

    /// Validate the configuration and exit
    #[arg(long = "validate")]
    validate: bool,

    /// Print the JSON Schema for the configuration and exit
    #[arg(long = "print-schema")]
    print_schema: bool,

    /// Write the default configuration to --config and exit
    #[arg(long = "init")]
    init: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = args.log_level.as_deref().and_then(macrobuddy::parse_level);
    if args.log_level.is_some() && level.is_none() {
        eprintln!("Unknown log level; falling back to RUST_LOG/info");
    }
    macrobuddy::init_tracing(level);

    if args.print_schema {
        let schema = cfg::generate_schema();
        let json = serde_json::to_string_pretty(&schema)?;
        println!("{json}");
        return Ok(());
    }

    if args.init {
        cfg::save_to_path(&Config::default(), &args.config)?;
        println!("Wrote default configuration to {}", args.config.display());
        return Ok(());
    }

    if args.validate {
        match cfg::check_path(&args.config)? {
            None => println!("OK"),
            Some(description) => {
                eprintln!("{description}");
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    let store = JsonFileStore::new(&args.config);
    info!(
        version = macrobuddy::PKG_VERSION,
        config = %args.config.display(),
        dry_run = args.dry_run,
        hotkeys = !args.no_hotkeys,
        "Starting Macrobuddy"
    );

    let hotkeys: Arc<dyn HotkeyProvider> = if args.no_hotkeys {
        Arc::new(ManualHotkeyProvider::new())
    } else {
        Arc::new(GlobalHotkeyProvider::new())
    };
    let engine = MacroEngine::new(Arc::new(EnigoInjector::new(args.dry_run)), hotkeys);
    let service = MacroService::new(engine, Box::new(store));

    service.start_macro_engine().await?;
    info!("TIP: On laptops, you may need to press Fn+F# to toggle");

    let mut watcher = if args.watch {
        Some(ConfigWatcher::new(&args.config)?)
    } else {
        None
    };

    let mut ticker = tokio::time::interval(Duration::from_millis(args.status_interval_ms.max(50)));
    let mut last: Vec<MacroStatus> = Vec::new();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            res = &mut shutdown => {
                if let Err(e) = res {
                    warn!(error = %e, "Failed to listen for Ctrl+C");
                }
                info!("Received Ctrl+C, shutting down");
                break;
            }
            _ = ticker.tick() => {
                let status = service.get_macro_status().await;
                if status != last {
                    log_status(&status);
                    last = status;
                }
            }
            Some(()) = config_changed(watcher.as_mut()) => {
                match service.reload_config().await {
                    Ok(restarted) => info!(restarted, "Configuration reloaded"),
                    Err(e) => warn!(error = %e, "Ignoring configuration change"),
                }
            }
        }
    }

    service.stop_macro_engine().await?;
    info!("Macrobuddy exited");
    Ok(())
}

async fn config_changed(watcher: Option<&mut ConfigWatcher>) -> Option<()> {
    match watcher {
        Some(watcher) => watcher.changed().await,
        None => std::future::pending().await,
    }
}

fn log_status(status: &[MacroStatus]) {
    debug!(macros = status.len(), "Status changed");
    for entry in status {
        info!(
            "#{} [{}] {} (toggle {})",
            entry.index,
            if entry.enabled { "ON " } else { "OFF" },
            entry.action.label(),
            entry.toggle_hotkey
        );
    }
}
