pub mod api;
pub mod app;
pub mod config;
pub mod session;
mod telemetry;
pub mod terminal_restore;
pub mod utf8_safe;

pub use app::{
    crash_log_path, init_logging, log_debug, log_debug_content, log_file_path, log_panic, run_panel,
};
pub use telemetry::init_tracing;
