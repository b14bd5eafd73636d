//! Option host entry point.
//!
//! Builds the option tree, applies the settings file and prints the settings
//! report: every option a save would write, in save order.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load_config()          -- host.toml, defaults on first run
//!  └─ HostState::new()       -- builtin options, presets, hooks, overrides
//!  └─ settings_report()      -- must-save selection + report
//!  └─ HostState::shutdown()  -- close sessions, unregister options
//! ```
//!
//! Flags:
//! - `--all`   report every option, not only the changed ones.
//! - `--init`  write the default settings file if none exists yet.

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use optree_host::infrastructure::storage::config::{config_file_path, load_config, save_config, HostConfig};
use optree_host::infrastructure::ui_bridge::HostState;

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let force_all = args.iter().any(|arg| arg == "--all");
    let init = args.iter().any(|arg| arg == "--init");

    // The settings file names the default log level, so read it before
    // logging is up and report a failure afterwards.
    let (config, load_error) = match load_config() {
        Ok(config) => (config, None),
        Err(e) => (HostConfig::default(), Some(e)),
    };

    // Initialise structured logging.  Level is overridden by `RUST_LOG`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.host.log_level)),
        )
        .init();

    info!("option host starting");
    if let Some(e) = load_error {
        warn!("failed to load settings, using defaults: {e}");
    }

    if init {
        let path = config_file_path()?;
        if path.exists() {
            info!("settings file already exists at {}", path.display());
        } else {
            save_config(&config)?;
            info!("wrote default settings to {}", path.display());
        }
    }

    let mut state = HostState::new(config)?;
    if let Some(language) = state.effects.language() {
        info!(language, "interface language selected");
    }

    print!("{}", state.settings_report(force_all));

    state.shutdown();
    info!("option host stopped");
    Ok(())
}
