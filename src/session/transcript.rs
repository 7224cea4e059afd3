//! Chat transcript: append-only bubbles made of ordered spans.

use super::log::Severity;
use chrono::NaiveDateTime;
use std::collections::VecDeque;

/// Maximum number of bubbles retained in the transcript.
pub(super) const TRANSCRIPT_MAX_ENTRIES: usize = 500;

pub type BubbleId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Ai,
    System,
}

impl Sender {
    pub fn label(self) -> &'static str {
        match self {
            Sender::User => "You",
            Sender::Ai => "AI",
            Sender::System => "System",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanKind {
    /// Main text of a bubble, filled by the chat stream.
    Body,
    /// Execution result typed in from a status poll.
    Continuation,
    /// Client-generated marker such as the disconnect notice.
    Notice,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub severity: Severity,
    pub kind: SpanKind,
}

impl Span {
    fn empty(severity: Severity, kind: SpanKind) -> Self {
        Self {
            text: String::new(),
            severity,
            kind,
        }
    }

    pub fn failure_style(&self) -> bool {
        self.severity.is_failure() || self.kind == SpanKind::Notice
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEntry {
    pub id: BubbleId,
    pub sender: Sender,
    pub spans: Vec<Span>,
    pub timestamp: NaiveDateTime,
    pub loading: bool,
}

impl ChatEntry {
    /// Concatenated span text.
    pub fn text(&self) -> String {
        self.spans.iter().map(|span| span.text.as_str()).collect()
    }
}

/// Address of one span inside one bubble.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpanRef {
    pub bubble: BubbleId,
    pub index: usize,
}

#[derive(Debug, Clone)]
pub struct Transcript {
    entries: VecDeque<ChatEntry>,
    next_id: BubbleId,
    capacity: usize,
    /// Replayed history bubbles at the front.
    replayed: usize,
}

impl Transcript {
    pub fn new() -> Self {
        Self::with_capacity(TRANSCRIPT_MAX_ENTRIES)
    }

    pub(super) fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            next_id: 1,
            capacity: capacity.max(1),
            replayed: 0,
        }
    }

    /// Add a finished bubble in one piece (user input or replayed history).
    pub(super) fn push_complete(
        &mut self,
        sender: Sender,
        text: &str,
        at: NaiveDateTime,
    ) -> BubbleId {
        let mut span = Span::empty(Severity::Info, SpanKind::Body);
        span.text.push_str(text);
        self.push(sender, vec![span], at, false)
    }

    /// Add a history bubble after earlier history but ahead of every live bubble.
    /// Dropped when the transcript is already full.
    pub(super) fn insert_replayed(
        &mut self,
        sender: Sender,
        text: &str,
        at: NaiveDateTime,
    ) -> Option<BubbleId> {
        if self.entries.len() >= self.capacity {
            if self.replayed == 0 {
                return None;
            }
            self.entries.pop_front();
            self.replayed -= 1;
        }
        let mut span = Span::empty(Severity::Info, SpanKind::Body);
        span.text.push_str(text);
        let id = self.next_id;
        self.next_id += 1;
        self.entries.insert(
            self.replayed,
            ChatEntry {
                id,
                sender,
                spans: vec![span],
                timestamp: at,
                loading: false,
            },
        );
        self.replayed += 1;
        Some(id)
    }

    /// Add an AI bubble with an empty body span and a loading indicator.
    pub(super) fn open_ai_bubble(&mut self, at: NaiveDateTime) -> BubbleId {
        let body = Span::empty(Severity::Info, SpanKind::Body);
        self.push(Sender::Ai, vec![body], at, true)
    }

    pub(super) fn strip_loading(&mut self, id: BubbleId) -> bool {
        match self.get_mut(id) {
            Some(entry) if entry.loading => {
                entry.loading = false;
                true
            }
            _ => false,
        }
    }

    /// Stream path: extend the bubble's body span.
    pub(super) fn append_to_body(&mut self, id: BubbleId, chunk: &str) -> bool {
        let Some(entry) = self.get_mut(id) else {
            return false;
        };
        match entry.spans.iter_mut().find(|span| span.kind == SpanKind::Body) {
            Some(span) => span.text.push_str(chunk),
            None => {
                let mut span = Span::empty(Severity::Info, SpanKind::Body);
                span.text.push_str(chunk);
                entry.spans.push(span);
            }
        }
        true
    }

    /// Add a new empty span; text only ever arrives later through `append_to_span`.
    pub(super) fn open_span(
        &mut self,
        id: BubbleId,
        severity: Severity,
        kind: SpanKind,
    ) -> Option<SpanRef> {
        let entry = self.get_mut(id)?;
        entry.spans.push(Span::empty(severity, kind));
        Some(SpanRef {
            bubble: id,
            index: entry.spans.len() - 1,
        })
    }

    pub(super) fn append_to_span(&mut self, target: SpanRef, text: &str) -> bool {
        match self
            .get_mut(target.bubble)
            .and_then(|entry| entry.spans.get_mut(target.index))
        {
            Some(span) => {
                span.text.push_str(text);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: BubbleId) -> Option<&ChatEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub fn entries(&self) -> std::collections::vec_deque::Iter<'_, ChatEntry> {
        self.entries.iter()
    }

    pub fn last(&self) -> Option<&ChatEntry> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn get_mut(&mut self, id: BubbleId) -> Option<&mut ChatEntry> {
        // Recent bubbles are the ones written to.
        self.entries.iter_mut().rev().find(|entry| entry.id == id)
    }

    fn push(
        &mut self,
        sender: Sender,
        spans: Vec<Span>,
        at: NaiveDateTime,
        loading: bool,
    ) -> BubbleId {
        let id = self.next_id;
        self.next_id += 1;
        while self.entries.len() >= self.capacity {
            if self.entries.pop_front().is_some() && self.replayed > 0 {
                self.replayed -= 1;
            }
        }
        self.entries.push_back(ChatEntry {
            id,
            sender,
            spans,
            timestamp: at,
            loading,
        });
        id
    }
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 14)
            .and_then(|d| d.and_hms_opt(10, 0, 0))
            .expect("valid timestamp")
    }

    #[test]
    fn opened_spans_start_empty() {
        let mut transcript = Transcript::new();
        let id = transcript.open_ai_bubble(at());
        let span = transcript
            .open_span(id, Severity::Warn, SpanKind::Continuation)
            .expect("bubble exists");
        assert_eq!(transcript.get(id).map(ChatEntry::text).as_deref(), Some(""));
        transcript.append_to_span(span, "ok");
        assert_eq!(transcript.get(id).map(ChatEntry::text).as_deref(), Some("ok"));
    }

    #[test]
    fn writes_to_trimmed_bubbles_are_dropped() {
        let mut transcript = Transcript::with_capacity(1);
        let old = transcript.open_ai_bubble(at());
        let span = transcript
            .open_span(old, Severity::Info, SpanKind::Continuation)
            .expect("bubble exists");
        transcript.push_complete(Sender::User, "next", at());
        assert!(!transcript.append_to_span(span, "late"));
        assert!(!transcript.append_to_body(old, "late"));
        assert_eq!(transcript.len(), 1);
    }

    #[test]
    fn replayed_bubbles_stay_ahead_of_live_ones() {
        let mut transcript = Transcript::new();
        transcript.push_complete(Sender::User, "live", at());
        transcript.insert_replayed(Sender::User, "old question", at());
        transcript.insert_replayed(Sender::Ai, "old answer", at());
        let texts: Vec<_> = transcript.entries().map(ChatEntry::text).collect();
        assert_eq!(texts, vec!["old question", "old answer", "live"]);
    }

    #[test]
    fn full_transcript_drops_history_before_live_bubbles() {
        let mut transcript = Transcript::with_capacity(2);
        transcript.push_complete(Sender::User, "live 1", at());
        transcript.push_complete(Sender::User, "live 2", at());
        assert_eq!(transcript.insert_replayed(Sender::Ai, "old", at()), None);
        let texts: Vec<_> = transcript.entries().map(ChatEntry::text).collect();
        assert_eq!(texts, vec!["live 1", "live 2"]);
    }

    #[test]
    fn strip_loading_reports_change_once() {
        let mut transcript = Transcript::new();
        let id = transcript.open_ai_bubble(at());
        assert!(transcript.strip_loading(id));
        assert!(!transcript.strip_loading(id));
    }
}
