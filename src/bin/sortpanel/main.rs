//! Sortpanel entrypoint: terminal control panel for the inventory sorting system.
//!
//! # Architecture
//!
//! - Poller threads: status and heartbeat requests on fixed cadences
//! - Chat workers: one per user message, streaming reply chunks back
//! - Input thread: forwards terminal key events
//! - Event loop: owns the session controller and redraws on change

mod report;

use anyhow::{Context, Result};
use sortpanel::api::{ControlApi, HttpControlApi};
use sortpanel::config::AppConfig;
use sortpanel::terminal_restore::install_terminal_panic_hook;
use sortpanel::{init_logging, init_tracing, log_debug, log_file_path, run_panel};

use crate::report::{settings_report, status_report};

fn main() -> Result<()> {
    let config = AppConfig::parse_args()?;
    init_logging(&config);
    init_tracing(&config);
    log_debug("=== Sortpanel Started ===");
    log_debug(&format!("Log file: {:?}", log_file_path()));
    log_debug(&format!("Backend: {}", config.base_url));

    if config.status || config.show_settings || config.save_settings {
        return run_one_shot(&config);
    }

    install_terminal_panic_hook();
    let result = run_panel(&config);
    match &result {
        Ok(()) => log_debug("=== Sortpanel Exited ==="),
        Err(err) => log_debug(&format!("=== Sortpanel Exited with error: {err:#} ===")),
    }
    result
}

fn run_one_shot(config: &AppConfig) -> Result<()> {
    let api = HttpControlApi::new(
        &config.base_url,
        config.request_timeout(),
        config.chat_timeout(),
    )
    .context("failed to build HTTP client")?;

    if config.status {
        let status = api
            .status()
            .with_context(|| format!("backend at {} is unreachable", api.base_url()))?;
        println!("{}", status_report(api.base_url(), &status).render());
    } else if config.show_settings {
        let settings = api.settings().context("failed to load AI settings")?;
        println!("{}", settings_report("AI Settings", &settings).render());
    } else if config.save_settings {
        let settings = config.settings_from_flags()?;
        api.save_settings(&settings)
            .context("failed to save AI settings")?;
        println!("{}", settings_report("AI Settings Saved", &settings).render());
    }
    Ok(())
}
