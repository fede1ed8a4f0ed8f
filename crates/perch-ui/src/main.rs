//! Perch - terminal dashboard entry point.
//!
//! Loads config, sets up file logging, registers the built-in plugins and
//! runs the dashboard loop on a current-thread tokio runtime.

use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use perch_core::{config_path, ensure_config_dir, state_dir, AppConfig, Binding};
use perch_plugin_api::{in_guarded_call, KeymapRegistry, PluginContext, PluginRegistry};
use perch_ui::keymap::normalize_keystroke;
use perch_ui::{terminal, AppError, Dashboard, EffectRunner, SessionMonitor, TerminalGuard};
use tracing_subscriber::EnvFilter;

// =============================================================================
// Logging
// =============================================================================

/// Log to `<state dir>/perch.log`. The terminal belongs to the dashboard.
///
/// Filter precedence: PERCH_LOG, RUST_LOG, then the configured level.
fn init_logging(level: &str) -> Result<PathBuf, AppError> {
    let dir = state_dir().ok_or(AppError::NoDirectory("state"))?;
    std::fs::create_dir_all(&dir)?;
    let path = dir.join("perch.log");
    let file = File::options().create(true).append(true).open(&path)?;

    let filter = std::env::var("PERCH_LOG")
        .ok()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();

    Ok(path)
}

/// Every panic goes to the log. Plugin panics are caught by the registry and
/// stop there; any other panic restores the terminal and then reaches the
/// previous hook so it still prints to stderr.
fn install_panic_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        tracing::error!("{}", info);
        if in_guarded_call() {
            return;
        }
        terminal::leave_on_panic();
        previous(info);
    }));
}

// =============================================================================
// Initialization
// =============================================================================

/// Built-in defaults first, then user bindings so they can override.
fn create_keymap(config: &AppConfig) -> Arc<KeymapRegistry> {
    let keymap = Arc::new(KeymapRegistry::with_defaults());
    for binding in &config.keys {
        keymap.register_binding(Binding::new(
            normalize_keystroke(&binding.key),
            binding.command.clone(),
            binding.context.clone(),
        ));
    }
    tracing::debug!("Keymap ready with {} bindings", keymap.binding_count());
    keymap
}

fn run() -> Result<(), AppError> {
    let (config, config_path) = match std::env::args_os().nth(1) {
        Some(arg) => {
            let path = PathBuf::from(arg);
            (AppConfig::load(&path)?, Some(path))
        }
        None => (AppConfig::load_default()?, config_path()),
    };
    let config = Arc::new(config);

    let log_path = init_logging(&config.log.level)?;
    install_panic_hook();
    tracing::info!(
        "Perch {} starting, config {:?}, log {:?}",
        env!("CARGO_PKG_VERSION"),
        config_path,
        log_path
    );
    if let Err(e) = ensure_config_dir() {
        tracing::warn!("Failed to create config directory: {}", e);
    }

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let _guard = rt.enter();

    let keymap = create_keymap(&config);
    let ctx = PluginContext::new(std::env::current_dir()?, keymap, rt.handle().clone())
        .with_config(config.clone());

    let mut registry = PluginRegistry::new(ctx);
    registry.register(Box::new(SessionMonitor::new()));
    for (id, reason) in registry.unavailable() {
        tracing::warn!("Plugin {} unavailable: {}", id, reason);
    }
    tracing::info!("{} plugins active", registry.len());

    let (runner, mut routed_rx) = EffectRunner::new(rt.handle().clone());
    let mut dashboard = Dashboard::new(registry, &config.palette);

    let result = dashboard.session(|dashboard, started| {
        runner.spawn_all(started);

        let guard = TerminalGuard::enter()?;
        let (width, height) = guard.size()?;
        runner.spawn_all(dashboard.resize(width, height));

        let result = rt.block_on(terminal::run(dashboard, &runner, &mut routed_rx));
        guard.restore()?;
        result
    });

    tracing::info!("Perch stopped");
    result
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
