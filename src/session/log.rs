//! Operational log stream. Never shares storage with the chat transcript.

use chrono::NaiveDateTime;
use regex::Regex;
use std::collections::VecDeque;
use std::sync::OnceLock;

pub const HISTORY_SEPARATOR: &str = "--- history loaded ---";
pub const LOGS_CLEARED: &str = "[SYS] Logs cleared.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warn,
    Error,
    System,
}

fn error_keyword_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(error|failed|failure)\b").expect("regex should compile"))
}

impl Severity {
    /// Structured `severity` value from the backend, if it names a known level.
    pub fn from_field(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "info" | "success" => Some(Severity::Info),
            "warn" | "warning" => Some(Severity::Warn),
            "error" | "err" => Some(Severity::Error),
            "system" | "sys" => Some(Severity::System),
            _ => None,
        }
    }

    /// Marker-based fallback for messages without a structured severity.
    pub fn classify(text: &str) -> Self {
        if text.contains('⚠') {
            Severity::Warn
        } else if text.contains('❌') || error_keyword_re().is_match(text) {
            Severity::Error
        } else if text.contains('🤖') {
            Severity::System
        } else {
            Severity::Info
        }
    }

    /// The field wins when it parses; text markers otherwise.
    pub fn resolve(field: Option<&str>, text: &str) -> Self {
        field
            .and_then(Self::from_field)
            .unwrap_or_else(|| Self::classify(text))
    }

    /// Lines served by `/api/logs` use the backend logger's level names.
    pub fn classify_log_line(line: &str) -> Self {
        if line.contains("WARN") {
            Severity::Warn
        } else if line.contains("ERROR") {
            Severity::Error
        } else if line.contains("[System]") {
            Severity::System
        } else {
            Severity::Info
        }
    }

    /// Warn and error share the failure styling.
    pub fn is_failure(self) -> bool {
        matches!(self, Severity::Warn | Severity::Error)
    }

    pub fn label(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Error => "error",
            Severity::System => "system",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// `None` for replayed backend lines, which carry their own timestamp text.
    pub timestamp: Option<NaiveDateTime>,
    pub severity: Severity,
    pub text: String,
}

/// Bounded, append-only list of log lines.
#[derive(Debug, Clone)]
pub struct LogStream {
    entries: VecDeque<LogEntry>,
    capacity: usize,
    /// Replayed entries at the front, not counting the separator.
    replayed: usize,
    separator: bool,
}

impl LogStream {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: capacity.max(1),
            replayed: 0,
            separator: false,
        }
    }

    pub fn push(&mut self, at: NaiveDateTime, severity: Severity, text: impl Into<String>) {
        self.push_entry(LogEntry {
            timestamp: Some(at),
            severity,
            text: text.into(),
        });
    }

    /// Replay backend history ahead of any live lines, followed by a separator.
    pub fn load_history<I, S>(&mut self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for line in lines {
            let text = line.into();
            self.insert_replayed(LogEntry {
                timestamp: None,
                severity: Severity::classify_log_line(&text),
                text,
            });
        }
        if !self.separator && self.make_room_for_replay() {
            self.entries.insert(
                self.replayed,
                LogEntry {
                    timestamp: None,
                    severity: Severity::Info,
                    text: HISTORY_SEPARATOR.to_string(),
                },
            );
            self.separator = true;
        }
    }

    /// Replayed line that carries its own timestamp (system entries of the chat history).
    pub(super) fn push_replayed(&mut self, at: NaiveDateTime, severity: Severity, text: String) {
        self.insert_replayed(LogEntry {
            timestamp: Some(at),
            severity,
            text,
        });
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.replayed = 0;
        self.separator = false;
        self.push_entry(LogEntry {
            timestamp: None,
            severity: Severity::System,
            text: LOGS_CLEARED.to_string(),
        });
    }

    pub fn entries(&self) -> std::collections::vec_deque::Iter<'_, LogEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn push_entry(&mut self, entry: LogEntry) {
        while self.entries.len() >= self.capacity {
            self.pop_oldest();
        }
        self.entries.push_back(entry);
    }

    fn insert_replayed(&mut self, entry: LogEntry) {
        if self.make_room_for_replay() {
            self.entries.insert(self.replayed, entry);
            self.replayed += 1;
        }
    }

    /// Live lines outrank history: when full, only older history is evicted.
    fn make_room_for_replay(&mut self) -> bool {
        if self.entries.len() < self.capacity {
            return true;
        }
        if self.replayed == 0 {
            return false;
        }
        self.pop_oldest();
        true
    }

    fn pop_oldest(&mut self) {
        if self.entries.pop_front().is_none() {
            return;
        }
        if self.replayed > 0 {
            self.replayed -= 1;
        } else {
            self.separator = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 14)
            .and_then(|d| d.and_hms_opt(9, 26, 53))
            .expect("valid timestamp")
    }

    #[test]
    fn markers_classify_messages() {
        assert_eq!(Severity::classify("❌ gripper jammed"), Severity::Error);
        assert_eq!(Severity::classify("Motion error on axis 2"), Severity::Error);
        assert_eq!(Severity::classify("⚠️ bin 1 already full"), Severity::Warn);
        assert_eq!(Severity::classify("🤖 plan ready"), Severity::System);
        assert_eq!(Severity::classify("Moved capsule to bin 3"), Severity::Info);
        assert_eq!(Severity::classify("no errors found"), Severity::Info);
    }

    #[test]
    fn warning_marker_is_checked_before_error_markers() {
        assert_eq!(
            Severity::classify("⚠️ retry failed, ❌ bin 4 blocked"),
            Severity::Warn
        );
        assert!(Severity::classify("⚠️ retry failed").is_failure());
    }

    #[test]
    fn structured_field_wins_over_markers() {
        assert_eq!(
            Severity::resolve(Some("info"), "❌ looks bad"),
            Severity::Info
        );
        assert_eq!(Severity::resolve(Some("ERROR"), "fine"), Severity::Error);
        assert_eq!(Severity::resolve(Some("bogus"), "⚠️ hmm"), Severity::Warn);
        assert_eq!(Severity::resolve(None, "🤖 hi"), Severity::System);
    }

    #[test]
    fn backend_log_lines_use_level_names() {
        assert_eq!(
            Severity::classify_log_line("2026-03-14 09:00:00 - WARN - bin full"),
            Severity::Warn
        );
        assert_eq!(
            Severity::classify_log_line("2026-03-14 09:00:00 - ERROR - camera"),
            Severity::Error
        );
        assert_eq!(
            Severity::classify_log_line("[System] ready"),
            Severity::System
        );
        assert_eq!(Severity::classify_log_line("plain"), Severity::Info);
    }

    #[test]
    fn history_ends_with_separator() {
        let mut log = LogStream::new(10);
        log.load_history(["a", "b"]);
        let texts: Vec<_> = log.entries().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b", HISTORY_SEPARATOR]);
    }

    #[test]
    fn history_lands_ahead_of_live_lines() {
        let mut log = LogStream::new(10);
        log.push(at(), Severity::Warn, "live");
        log.load_history(["old 1", "old 2"]);
        let texts: Vec<_> = log.entries().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["old 1", "old 2", HISTORY_SEPARATOR, "live"]);
    }

    #[test]
    fn history_over_capacity_keeps_live_lines() {
        let mut log = LogStream::new(3);
        log.push(at(), Severity::Info, "live");
        log.load_history(["h1", "h2", "h3"]);
        let texts: Vec<_> = log.entries().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["h3", HISTORY_SEPARATOR, "live"]);
    }

    #[test]
    fn replayed_chat_lines_sit_before_the_separator() {
        let mut log = LogStream::new(10);
        log.push(at(), Severity::Info, "live");
        log.load_history(["backend"]);
        log.push_replayed(at(), Severity::System, "🤖 old notice".into());
        let texts: Vec<_> = log.entries().map(|e| e.text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["backend", "🤖 old notice", HISTORY_SEPARATOR, "live"]
        );
    }

    #[test]
    fn capacity_drops_oldest() {
        let mut log = LogStream::new(2);
        log.push(at(), Severity::Info, "one");
        log.push(at(), Severity::Info, "two");
        log.push(at(), Severity::Info, "three");
        let texts: Vec<_> = log.entries().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["two", "three"]);
    }

    #[test]
    fn clear_leaves_marker_line() {
        let mut log = LogStream::new(10);
        log.push(at(), Severity::Warn, "x");
        log.clear();
        assert_eq!(log.len(), 1);
        assert_eq!(log.entries().next().map(|e| e.text.as_str()), Some(LOGS_CLEARED));
    }
}
