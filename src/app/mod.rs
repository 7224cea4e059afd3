//! Full-screen terminal panel: event loop, key handling and rendering on top of
//! the session controller, plus the debug log it writes to.

mod draw;
mod keys;
mod logging;
mod panel;

pub(crate) use logging::file_logging_requested;
pub use logging::{
    crash_log_path, init_logging, log_debug, log_debug_content, log_file_path, log_panic,
};
pub use panel::run_panel;
