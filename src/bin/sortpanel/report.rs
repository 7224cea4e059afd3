//! Plain-text output for the one-shot `--status`, `--show-settings` and
//! `--save-settings` modes.

use sortpanel::api::{PanelSettings, StatusReport};
use sortpanel::session::{Mode, ModeProjection, Severity, SLOT_COUNT};
use std::fmt::Display;

pub(crate) struct Report {
    lines: Vec<String>,
}

impl Report {
    pub(crate) fn new(title: &str) -> Self {
        Self {
            lines: vec![title.to_string()],
        }
    }

    pub(crate) fn section(&mut self, title: &str) {
        self.lines.push(String::new());
        self.lines.push(format!("{title}:"));
    }

    pub(crate) fn push_kv(&mut self, key: &str, value: impl Display) {
        self.lines.push(format!("  {key}: {value}"));
    }

    pub(crate) fn render(&self) -> String {
        self.lines.join("\n")
    }
}

pub(crate) fn status_report(base_url: &str, status: &StatusReport) -> Report {
    let mut report = Report::new("Sortpanel Status");
    report.push_kv("backend", base_url);

    report.section("System");
    match Mode::from_wire(&status.mode) {
        Some(mode) => {
            let projection = ModeProjection::for_mode(mode);
            report.push_kv("mode", mode.as_wire());
            report.push_kv("state", projection.status_label);
            report.push_kv("ai", projection.ai_badge);
        }
        None => report.push_kv("mode", format!("unknown ({:?})", status.mode)),
    }
    if let Some(msg) = status.system_msg.as_deref().filter(|msg| !msg.is_empty()) {
        let severity = Severity::resolve(status.severity.as_deref(), msg);
        report.push_kv("message", format!("[{}] {msg}", severity.label()));
    }

    report.section("Inventory");
    for slot in 1..=SLOT_COUNT {
        let state = if status.is_occupied(slot) {
            "full"
        } else {
            "free"
        };
        report.push_kv(&format!("bin {slot}"), state);
    }
    report
}

pub(crate) fn settings_report(title: &str, settings: &PanelSettings) -> Report {
    let mut report = Report::new(title);
    report.push_kv("provider", or_unset(&settings.provider));
    report.push_kv("base_url", or_unset(&settings.base_url));
    report.push_kv("model_name", or_unset(&settings.model_name));
    report.push_kv("api_key", mask_secret(&settings.api_key));
    report.push_kv(
        "system_prompt",
        if settings.system_prompt.is_empty() {
            "unset".to_string()
        } else {
            format!("{} chars", settings.system_prompt.chars().count())
        },
    );
    report
}

fn or_unset(value: &str) -> &str {
    if value.is_empty() {
        "unset"
    } else {
        value
    }
}

/// Keep the last four characters of a key; shorter keys are hidden entirely.
pub(crate) fn mask_secret(secret: &str) -> String {
    let count = secret.chars().count();
    if count == 0 {
        return "unset".to_string();
    }
    if count <= 8 {
        return "*".repeat(count);
    }
    let tail: String = secret.chars().skip(count - 4).collect();
    format!("{}{tail}", "*".repeat(count - 4))
}
