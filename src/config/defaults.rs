pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_STATUS_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 2000;
pub const DEFAULT_CHAT_TIMEOUT_MS: u64 = 60_000;
pub const DEFAULT_TYPING_INTERVAL_MS: u64 = 30;
pub const DEFAULT_HEARTBEAT_FAILURE_THRESHOLD: u32 = 1;
pub const DEFAULT_OFFLINE_AFTER: u32 = 0;
pub const DEFAULT_LOG_CAPACITY: usize = 500;

pub(super) const MIN_INTERVAL_MS: u64 = 100;
pub(super) const MAX_INTERVAL_MS: u64 = 60_000;
pub(super) const MIN_CHAT_TIMEOUT_MS: u64 = 1000;
pub(super) const MAX_CHAT_TIMEOUT_MS: u64 = 600_000;
pub(super) const MAX_TYPING_INTERVAL_MS: u64 = 1000;
pub(super) const MAX_FAILURE_THRESHOLD: u32 = 100;
pub(super) const MAX_OFFLINE_AFTER: u32 = 1000;
pub(super) const MIN_LOG_CAPACITY: usize = 50;
pub(super) const MAX_LOG_CAPACITY: usize = 10_000;
pub(super) const MAX_SYSTEM_PROMPT_BYTES: usize = 32 * 1024;
