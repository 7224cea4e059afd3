//! Command-line parsing and validation helpers.

mod defaults;
#[cfg(test)]
mod tests;
mod validation;

use clap::{Parser, ValueEnum};
use std::time::Duration;

pub use defaults::{
    DEFAULT_BASE_URL, DEFAULT_CHAT_TIMEOUT_MS, DEFAULT_HEARTBEAT_FAILURE_THRESHOLD,
    DEFAULT_HEARTBEAT_INTERVAL_MS, DEFAULT_LOG_CAPACITY, DEFAULT_OFFLINE_AFTER,
    DEFAULT_REQUEST_TIMEOUT_MS, DEFAULT_STATUS_INTERVAL_MS, DEFAULT_TYPING_INTERVAL_MS,
};

/// CLI options for the sorting-system control panel.
#[derive(Debug, Parser, Clone)]
#[command(
    name = "sortpanel",
    about = "Sortpanel - terminal control panel for the inventory sorting system",
    author,
    version
)]
pub struct AppConfig {
    /// Base URL of the sorting backend
    #[arg(long, env = "SORTPANEL_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Status poll cadence (milliseconds)
    #[arg(long = "status-interval-ms", default_value_t = DEFAULT_STATUS_INTERVAL_MS)]
    pub status_interval_ms: u64,

    /// Heartbeat cadence (milliseconds)
    #[arg(long = "heartbeat-interval-ms", default_value_t = DEFAULT_HEARTBEAT_INTERVAL_MS)]
    pub heartbeat_interval_ms: u64,

    /// Timeout for status, heartbeat, command and settings requests (milliseconds)
    #[arg(long = "request-timeout-ms", default_value_t = DEFAULT_REQUEST_TIMEOUT_MS)]
    pub request_timeout_ms: u64,

    /// Upper bound for a whole chat exchange, including the streamed body (milliseconds)
    #[arg(long = "chat-timeout-ms", default_value_t = DEFAULT_CHAT_TIMEOUT_MS)]
    pub chat_timeout_ms: u64,

    /// Delay between characters when typing out execution results (milliseconds)
    #[arg(long = "typing-interval-ms", default_value_t = DEFAULT_TYPING_INTERVAL_MS)]
    pub typing_interval_ms: u64,

    /// Consecutive heartbeat failures before the link is shown as lost
    #[arg(
        long = "heartbeat-failure-threshold",
        default_value_t = DEFAULT_HEARTBEAT_FAILURE_THRESHOLD
    )]
    pub heartbeat_failure_threshold: u32,

    /// Consecutive failed or OFFLINE polls before the status is marked stale (0 = never)
    #[arg(long = "offline-after", default_value_t = DEFAULT_OFFLINE_AFTER)]
    pub offline_after: u32,

    /// Maximum number of lines kept in the log pane
    #[arg(long = "log-capacity", default_value_t = DEFAULT_LOG_CAPACITY)]
    pub log_capacity: usize,

    /// Print one status poll and exit
    #[arg(long = "status", default_value_t = false)]
    pub status: bool,

    /// Print the backend AI settings and exit
    #[arg(long = "show-settings", default_value_t = false)]
    pub show_settings: bool,

    /// Save AI settings built from the --provider/--api-key/... flags and exit
    #[arg(long = "save-settings", default_value_t = false)]
    pub save_settings: bool,

    /// AI provider to store with --save-settings
    #[arg(long, value_enum)]
    pub provider: Option<Provider>,

    /// API key to store with --save-settings
    #[arg(long = "api-key", env = "SORTPANEL_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Provider endpoint to store with --save-settings (defaults per provider)
    #[arg(long = "llm-base-url")]
    pub llm_base_url: Option<String>,

    /// Model name to store with --save-settings (defaults per provider)
    #[arg(long = "model-name")]
    pub model_name: Option<String>,

    /// System prompt to store with --save-settings
    #[arg(long = "system-prompt")]
    pub system_prompt: Option<String>,

    /// Enable file logging (debug)
    #[arg(long = "logs", env = "SORTPANEL_LOGS", default_value_t = false)]
    pub logs: bool,

    /// Disable all file logging (overrides --logs and log env vars)
    #[arg(long = "no-logs", env = "SORTPANEL_NO_LOGS", default_value_t = false)]
    pub no_logs: bool,

    /// Allow logging chat and log-line content (debug log only)
    #[arg(
        long = "log-content",
        env = "SORTPANEL_LOG_CONTENT",
        default_value_t = false
    )]
    pub log_content: bool,

    /// Enable verbose timing logs
    #[arg(long)]
    pub log_timings: bool,
}

impl AppConfig {
    pub fn status_interval(&self) -> Duration {
        Duration::from_millis(self.status_interval_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn chat_timeout(&self) -> Duration {
        Duration::from_millis(self.chat_timeout_ms)
    }

    pub fn typing_interval(&self) -> Duration {
        Duration::from_millis(self.typing_interval_ms)
    }
}

/// AI providers the backend knows how to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Provider {
    Deepseek,
    Openai,
    Gemini,
    Ollama,
    Other,
}

impl Provider {
    pub fn label(self) -> &'static str {
        match self {
            Provider::Deepseek => "deepseek",
            Provider::Openai => "openai",
            Provider::Gemini => "gemini",
            Provider::Ollama => "ollama",
            Provider::Other => "other",
        }
    }

    /// Endpoint and model used when the user does not pick one.
    pub fn defaults(self) -> Option<(&'static str, &'static str)> {
        match self {
            Provider::Deepseek => Some(("https://api.deepseek.com", "deepseek-chat")),
            Provider::Openai => Some(("https://api.openai.com/v1", "gpt-3.5-turbo")),
            Provider::Gemini => Some(("https://generativelanguage.googleapis.com", "gemini-pro")),
            Provider::Ollama => Some(("http://localhost:11434/v1", "llama2")),
            Provider::Other => None,
        }
    }
}
