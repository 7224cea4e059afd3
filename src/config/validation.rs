use super::defaults::{
    MAX_CHAT_TIMEOUT_MS, MAX_FAILURE_THRESHOLD, MAX_INTERVAL_MS, MAX_LOG_CAPACITY,
    MAX_OFFLINE_AFTER, MAX_SYSTEM_PROMPT_BYTES, MAX_TYPING_INTERVAL_MS, MIN_CHAT_TIMEOUT_MS,
    MIN_INTERVAL_MS, MIN_LOG_CAPACITY,
};
use super::AppConfig;
use crate::api::PanelSettings;
use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use reqwest::Url;

impl AppConfig {
    /// Parse CLI arguments and validate them right away.
    pub fn parse_args() -> Result<Self> {
        let mut config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    /// Check CLI values and normalize the backend URL.
    pub fn validate(&mut self) -> Result<()> {
        for (flag, value) in [
            ("--status-interval-ms", self.status_interval_ms),
            ("--heartbeat-interval-ms", self.heartbeat_interval_ms),
            ("--request-timeout-ms", self.request_timeout_ms),
        ] {
            if !(MIN_INTERVAL_MS..=MAX_INTERVAL_MS).contains(&value) {
                bail!("{flag} must be between {MIN_INTERVAL_MS} and {MAX_INTERVAL_MS} ms, got {value}");
            }
        }
        if !(MIN_CHAT_TIMEOUT_MS..=MAX_CHAT_TIMEOUT_MS).contains(&self.chat_timeout_ms) {
            bail!(
                "--chat-timeout-ms must be between {MIN_CHAT_TIMEOUT_MS} and {MAX_CHAT_TIMEOUT_MS} ms, got {}",
                self.chat_timeout_ms
            );
        }
        if self.typing_interval_ms == 0 || self.typing_interval_ms > MAX_TYPING_INTERVAL_MS {
            bail!(
                "--typing-interval-ms must be between 1 and {MAX_TYPING_INTERVAL_MS} ms, got {}",
                self.typing_interval_ms
            );
        }
        if self.heartbeat_failure_threshold == 0
            || self.heartbeat_failure_threshold > MAX_FAILURE_THRESHOLD
        {
            bail!(
                "--heartbeat-failure-threshold must be between 1 and {MAX_FAILURE_THRESHOLD}, got {}",
                self.heartbeat_failure_threshold
            );
        }
        if self.offline_after > MAX_OFFLINE_AFTER {
            bail!(
                "--offline-after must be between 0 and {MAX_OFFLINE_AFTER}, got {}",
                self.offline_after
            );
        }
        if !(MIN_LOG_CAPACITY..=MAX_LOG_CAPACITY).contains(&self.log_capacity) {
            bail!(
                "--log-capacity must be between {MIN_LOG_CAPACITY} and {MAX_LOG_CAPACITY}, got {}",
                self.log_capacity
            );
        }

        self.base_url = normalize_base_url(&self.base_url, "--base-url")?;
        if let Some(url) = self.llm_base_url.as_deref() {
            let trimmed = url.trim();
            if !trimmed.is_empty() {
                self.llm_base_url = Some(normalize_base_url(trimmed, "--llm-base-url")?);
            }
        }
        if let Some(prompt) = self.system_prompt.as_ref() {
            if prompt.len() > MAX_SYSTEM_PROMPT_BYTES {
                bail!(
                    "--system-prompt must be at most {MAX_SYSTEM_PROMPT_BYTES} bytes, got {}",
                    prompt.len()
                );
            }
        }

        let one_shots = [self.status, self.show_settings, self.save_settings]
            .iter()
            .filter(|flag| **flag)
            .count();
        if one_shots > 1 {
            bail!("--status, --show-settings and --save-settings cannot be combined");
        }
        if self.save_settings && self.provider.is_none() {
            bail!("--save-settings requires --provider");
        }

        Ok(())
    }

    /// Build the settings object sent by `--save-settings`, filling provider defaults.
    pub fn settings_from_flags(&self) -> Result<PanelSettings> {
        let provider = self
            .provider
            .ok_or_else(|| anyhow!("--save-settings requires --provider"))?;
        let defaults = provider.defaults();
        let pick = |explicit: &Option<String>, fallback: Option<&str>| -> String {
            explicit
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .or(fallback)
                .unwrap_or_default()
                .to_string()
        };
        Ok(PanelSettings {
            provider: provider.label().to_string(),
            api_key: self.api_key.clone().unwrap_or_default(),
            base_url: pick(&self.llm_base_url, defaults.map(|(url, _)| url)),
            model_name: pick(&self.model_name, defaults.map(|(_, model)| model)),
            system_prompt: self.system_prompt.clone().unwrap_or_default(),
        })
    }
}

/// Accept only absolute http(s) URLs and drop any trailing slash so paths join cleanly.
pub(super) fn normalize_base_url(raw: &str, flag: &str) -> Result<String> {
    let trimmed = raw.trim();
    let url = Url::parse(trimmed).with_context(|| format!("{flag} is not a valid URL: {trimmed}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("{flag} must use http or https, got {}", url.scheme());
    }
    if url.host_str().is_none() {
        bail!("{flag} must include a host: {trimmed}");
    }
    if url.query().is_some() || url.fragment().is_some() {
        bail!("{flag} must not carry a query or fragment: {trimmed}");
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}
