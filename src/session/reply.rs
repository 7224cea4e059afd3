use super::transcript::{BubbleId, SpanRef};
use std::collections::VecDeque;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::{Duration, Instant};

/// Identifier handed to the chat worker so late events can be matched or discarded.
pub type ReplyId = u64;

/// Shared flag between a reply (or typing run) and the work feeding it.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// The single in-flight AI bubble awaiting stream data or a continuation.
#[derive(Debug)]
pub struct PendingReply {
    pub(super) id: ReplyId,
    pub(super) bubble: BubbleId,
    pub(super) has_loading_indicator: bool,
    pub(super) stream_open: bool,
    pub(super) cancel: CancelToken,
}

impl PendingReply {
    pub(super) fn new(id: ReplyId, bubble: BubbleId) -> Self {
        Self {
            id,
            bubble,
            has_loading_indicator: true,
            stream_open: true,
            cancel: CancelToken::new(),
        }
    }

    pub fn id(&self) -> ReplyId {
        self.id
    }

    pub fn bubble(&self) -> BubbleId {
        self.bubble
    }

    pub fn has_loading_indicator(&self) -> bool {
        self.has_loading_indicator
    }

    pub fn stream_open(&self) -> bool {
        self.stream_open
    }

    /// Stop the chat worker from delivering anything more for this reply.
    pub(super) fn close_stream(&mut self) {
        self.stream_open = false;
        self.cancel.cancel();
    }
}

/// Cooperative character-by-character writer into one span.
///
/// Nothing here sleeps: the event loop calls [`TypeWriter::due`] on every tick and
/// writes whatever became due. A lagging tick catches up by emitting several
/// characters at once, so every character is still written exactly once.
#[derive(Debug)]
pub struct TypeWriter {
    target: SpanRef,
    remaining: VecDeque<char>,
    interval: Duration,
    next_due: Instant,
    cancel: CancelToken,
}

impl TypeWriter {
    /// The first character is due immediately.
    pub(super) fn new(target: SpanRef, text: &str, interval: Duration, now: Instant) -> Self {
        Self {
            target,
            remaining: text.chars().collect(),
            interval: interval.max(Duration::from_millis(1)),
            next_due: now,
            cancel: CancelToken::new(),
        }
    }

    pub fn target(&self) -> SpanRef {
        self.target
    }

    /// Consume the characters due at `now`.
    pub(super) fn due(&mut self, now: Instant) -> Option<String> {
        if self.cancel.is_cancelled() || self.remaining.is_empty() || now < self.next_due {
            return None;
        }
        let elapsed = now.duration_since(self.next_due);
        let steps = (elapsed.as_nanos() / self.interval.as_nanos()) as usize + 1;
        let take = steps.min(self.remaining.len());
        let text: String = self.remaining.drain(..take).collect();
        self.next_due += self.interval * take as u32;
        Some(text)
    }

    /// Everything not typed yet, in one piece.
    pub(super) fn flush(&mut self) -> Option<String> {
        if self.cancel.is_cancelled() || self.remaining.is_empty() {
            return None;
        }
        Some(self.remaining.drain(..).collect())
    }

    pub(super) fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.cancel.is_cancelled() || self.remaining.is_empty()
    }
}
