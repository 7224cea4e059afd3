use super::validation::normalize_base_url;
use super::{AppConfig, Provider, DEFAULT_BASE_URL, DEFAULT_HEARTBEAT_FAILURE_THRESHOLD};
use clap::Parser;

fn parse(args: &[&str]) -> AppConfig {
    let mut argv = vec!["sortpanel-tests"];
    argv.extend_from_slice(args);
    AppConfig::parse_from(argv)
}

#[test]
fn defaults_validate() {
    let mut cfg = parse(&[]);
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
    assert_eq!(cfg.heartbeat_failure_threshold, DEFAULT_HEARTBEAT_FAILURE_THRESHOLD);
    assert_eq!(cfg.offline_after, 0);
}

#[test]
fn rejects_intervals_out_of_bounds() {
    let mut cfg = parse(&["--status-interval-ms", "50"]);
    assert!(cfg.validate().is_err());

    let mut cfg = parse(&["--heartbeat-interval-ms", "60001"]);
    assert!(cfg.validate().is_err());

    let mut cfg = parse(&["--request-timeout-ms", "99"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn accepts_interval_bounds() {
    let mut cfg = parse(&["--status-interval-ms", "100", "--heartbeat-interval-ms", "60000"]);
    assert!(cfg.validate().is_ok());
}

#[test]
fn rejects_zero_typing_interval() {
    let mut cfg = parse(&["--typing-interval-ms", "0"]);
    let err = cfg.validate().unwrap_err();
    assert!(err.to_string().contains("--typing-interval-ms"));
}

#[test]
fn rejects_zero_heartbeat_threshold() {
    let mut cfg = parse(&["--heartbeat-failure-threshold", "0"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn rejects_chat_timeout_out_of_bounds() {
    let mut cfg = parse(&["--chat-timeout-ms", "999"]);
    assert!(cfg.validate().is_err());

    let mut cfg = parse(&["--chat-timeout-ms", "600001"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn normalizes_trailing_slash() {
    let mut cfg = parse(&["--base-url", "http://10.0.0.5:5000/"]);
    cfg.validate().unwrap();
    assert_eq!(cfg.base_url, "http://10.0.0.5:5000");
}

#[test]
fn rejects_non_http_base_url() {
    assert!(normalize_base_url("ftp://host", "--base-url").is_err());
    assert!(normalize_base_url("not a url", "--base-url").is_err());
    assert!(normalize_base_url("http://host/?a=1", "--base-url").is_err());
}

#[test]
fn rejects_combined_one_shots() {
    let mut cfg = parse(&["--status", "--show-settings"]);
    let err = cfg.validate().unwrap_err();
    assert!(err.to_string().contains("cannot be combined"));
}

#[test]
fn save_settings_requires_provider() {
    let mut cfg = parse(&["--save-settings"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn provider_defaults_fill_missing_fields() {
    let mut cfg = parse(&["--save-settings", "--provider", "openai", "--api-key", "sk-1"]);
    cfg.validate().unwrap();
    let settings = cfg.settings_from_flags().unwrap();
    assert_eq!(settings.provider, "openai");
    assert_eq!(settings.api_key, "sk-1");
    assert_eq!(settings.base_url, "https://api.openai.com/v1");
    assert_eq!(settings.model_name, "gpt-3.5-turbo");
}

#[test]
fn explicit_values_override_provider_defaults() {
    let mut cfg = parse(&[
        "--save-settings",
        "--provider",
        "ollama",
        "--llm-base-url",
        "http://gpu-box:11434/v1/",
        "--model-name",
        "qwen2",
        "--system-prompt",
        "You sort coffee capsules.",
    ]);
    cfg.validate().unwrap();
    let settings = cfg.settings_from_flags().unwrap();
    assert_eq!(settings.base_url, "http://gpu-box:11434/v1");
    assert_eq!(settings.model_name, "qwen2");
    assert_eq!(settings.system_prompt, "You sort coffee capsules.");
}

#[test]
fn other_provider_has_no_defaults() {
    assert!(Provider::Other.defaults().is_none());
    let mut cfg = parse(&["--save-settings", "--provider", "other"]);
    cfg.validate().unwrap();
    let settings = cfg.settings_from_flags().unwrap();
    assert_eq!(settings.provider, "other");
    assert!(settings.base_url.is_empty());
    assert!(settings.model_name.is_empty());
}
