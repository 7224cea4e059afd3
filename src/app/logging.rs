use crate::config::AppConfig;
use chrono::{SecondsFormat, Utc};
use std::{
    env, fs,
    io::Write,
    panic,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex, OnceLock,
    },
};

const LOG_MAX_BYTES: u64 = 5 * 1024 * 1024;
const CRASH_LOG_MAX_BYTES: u64 = 256 * 1024;
static LOG_ENABLED: AtomicBool = AtomicBool::new(false);
static LOG_CONTENT_ENABLED: AtomicBool = AtomicBool::new(false);
static LOG_STATE: OnceLock<Mutex<Option<RotatingFile>>> = OnceLock::new();

/// Debug log in the temp dir; the terminal itself is never written to.
pub fn log_file_path() -> PathBuf {
    env::var("SORTPANEL_LOG_FILE")
        .map(PathBuf::from)
        .unwrap_or_else(|_| env::temp_dir().join("sortpanel.log"))
}

/// Crash log (panic location and version, payload only with --log-content).
pub fn crash_log_path() -> PathBuf {
    env::temp_dir().join("sortpanel_crash.log")
}

/// Append-only file truncated once it would grow past `max_bytes`.
struct RotatingFile {
    path: PathBuf,
    file: fs::File,
    max_bytes: u64,
    len: u64,
}

impl RotatingFile {
    fn open(path: &Path, max_bytes: u64) -> Option<Self> {
        let existing = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        let truncate = existing > max_bytes;
        let file = fs::OpenOptions::new()
            .create(true)
            .append(!truncate)
            .write(true)
            .truncate(truncate)
            .open(path)
            .ok()?;
        Some(Self {
            path: path.to_path_buf(),
            file,
            max_bytes,
            len: if truncate { 0 } else { existing },
        })
    }

    fn write_line(&mut self, line: &str) {
        if self.len.saturating_add(line.len() as u64) > self.max_bytes {
            if let Some(fresh) = Self::open_truncated(&self.path) {
                self.file = fresh;
                self.len = 0;
            }
        }
        if self.file.write_all(line.as_bytes()).is_ok() {
            self.len = self.len.saturating_add(line.len() as u64);
        }
    }

    fn open_truncated(path: &Path) -> Option<fs::File> {
        fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .ok()
    }
}

fn log_state() -> &'static Mutex<Option<RotatingFile>> {
    LOG_STATE.get_or_init(|| Mutex::new(None))
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Whether `--logs`/`--log-timings` asked for file logging and `--no-logs` did not veto it.
pub(crate) fn file_logging_requested(config: &AppConfig) -> bool {
    (config.logs || config.log_timings) && !config.no_logs
}

/// Configure logging based on CLI flags or environment.
pub fn init_logging(config: &AppConfig) {
    let enabled = file_logging_requested(config);
    LOG_ENABLED.store(enabled, Ordering::Relaxed);
    LOG_CONTENT_ENABLED.store(enabled && config.log_content, Ordering::Relaxed);

    let mut state = log_state()
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *state = if enabled {
        RotatingFile::open(&log_file_path(), LOG_MAX_BYTES)
    } else {
        None
    };
}

/// Write a debug line. No-op unless file logging is on.
pub fn log_debug(msg: &str) {
    if !LOG_ENABLED.load(Ordering::Relaxed) {
        return;
    }
    let line = format!("[{}] {msg}\n", timestamp());
    let mut state = log_state()
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(file) = state.as_mut() {
        file.write_line(&line);
    }
}

/// Write a line that may quote chat or log text; needs `--log-content`.
pub fn log_debug_content(msg: &str) {
    if !LOG_CONTENT_ENABLED.load(Ordering::Relaxed) {
        return;
    }
    log_debug(msg);
}

/// Record a panic in the crash log.
pub fn log_panic(info: &panic::PanicHookInfo<'_>) {
    if !LOG_ENABLED.load(Ordering::Relaxed) {
        return;
    }
    let location = info
        .location()
        .map(|loc| format!("{}:{}", loc.file(), loc.line()))
        .unwrap_or_else(|| "unknown".to_string());
    let payload = if LOG_CONTENT_ENABLED.load(Ordering::Relaxed) {
        info.payload()
            .downcast_ref::<&str>()
            .map(|text| (*text).to_string())
            .or_else(|| info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string())
    } else {
        "panic payload omitted (log-content disabled)".to_string()
    };
    let line = format!(
        "[{}] panic at {location}: {payload} (v{})\n",
        timestamp(),
        env!("CARGO_PKG_VERSION")
    );
    if let Some(mut crash) = RotatingFile::open(&crash_log_path(), CRASH_LOG_MAX_BYTES) {
        crash.write_line(&line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotating_file_truncates_past_limit() {
        let path = env::temp_dir().join(format!("sortpanel-rotate-{}.log", std::process::id()));
        let _ = fs::remove_file(&path);
        let mut file = RotatingFile::open(&path, 16).expect("open log");
        file.write_line("0123456789\n");
        file.write_line("abcdefghij\n");
        drop(file);
        let contents = fs::read_to_string(&path).expect("read log");
        assert_eq!(contents, "abcdefghij\n");
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn no_logs_overrides_logs() {
        use clap::Parser;
        let config = AppConfig::parse_from(["sortpanel-tests", "--logs", "--no-logs"]);
        assert!(!file_logging_requested(&config));
        let config = AppConfig::parse_from(["sortpanel-tests", "--log-timings"]);
        assert!(file_logging_requested(&config));
    }
}
