use super::log::{LogStream, Severity};
use super::mode::Mode;
use super::reply::{CancelToken, PendingReply, ReplyId, TypeWriter};
use super::state::{Connectivity, SessionState};
use super::transcript::{BubbleId, Sender, SpanKind, Transcript};
use crate::api::{ApiError, ChatHistoryEntry, CommandAction, PanelSettings, StatusReport};
use crate::config::AppConfig;
use crate::{log_debug, log_debug_content};
use chrono::{Local, NaiveDateTime};
use std::time::{Duration, Instant};

/// Maximum characters retained in the input buffer.
pub(super) const INPUT_MAX_CHARS: usize = 8_000;
/// Marker appended to a pending bubble when its chat request fails.
pub const DISCONNECT_MARKER: &str = "[connection lost]";
const HISTORY_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Work the event loop must carry out on the controller's behalf.
#[derive(Debug, Clone)]
pub enum Effect {
    Command(CommandAction),
    Chat {
        reply: ReplyId,
        message: String,
        cancel: CancelToken,
    },
}

/// Progress reported by a chat worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEvent {
    pub reply: ReplyId,
    pub kind: ChatEventKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEventKind {
    /// Piece of a streamed body.
    Chunk(String),
    /// Whole `{reply}` body. Seeds the bubble; the reply stays pending for a continuation.
    Reply(String),
    Finished,
    Failed(String),
}

/// Tunables the controller needs from the CLI.
#[derive(Debug, Clone, Copy)]
pub struct ControllerSettings {
    pub typing_interval: Duration,
    pub heartbeat_failure_threshold: u32,
    pub offline_after: u32,
    pub log_capacity: usize,
}

impl ControllerSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            typing_interval: config.typing_interval(),
            heartbeat_failure_threshold: config.heartbeat_failure_threshold,
            offline_after: config.offline_after,
            log_capacity: config.log_capacity,
        }
    }
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            typing_interval: Duration::from_millis(crate::config::DEFAULT_TYPING_INTERVAL_MS),
            heartbeat_failure_threshold: crate::config::DEFAULT_HEARTBEAT_FAILURE_THRESHOLD,
            offline_after: crate::config::DEFAULT_OFFLINE_AFTER,
            log_capacity: crate::config::DEFAULT_LOG_CAPACITY,
        }
    }
}

macro_rules! state_change {
    ($self:expr, $body:block) => {{
        let changed = $body;
        if changed {
            $self.request_redraw();
        }
        changed
    }};
}

/// Owns every piece of display state and reconciles it against backend events.
///
/// The controller never performs I/O. Inputs arrive as method calls on the
/// event-loop thread; requests that must go to the backend come back as
/// [`Effect`]s for the caller to dispatch.
pub struct SessionController {
    state: SessionState,
    connectivity: Connectivity,
    transcript: Transcript,
    log: LogStream,
    pending: Option<PendingReply>,
    /// Reply whose continuation arrived before its `{reply}` body.
    unseeded: Option<(ReplyId, BubbleId)>,
    typing: Vec<TypeWriter>,
    next_reply: ReplyId,
    typing_interval: Duration,
    input: String,
    scroll_offset: u16,
    model_name: Option<String>,
    needs_redraw: bool,
}

impl SessionController {
    pub fn new(settings: ControllerSettings) -> Self {
        Self {
            state: SessionState::new(),
            connectivity: Connectivity::new(
                settings.heartbeat_failure_threshold,
                settings.offline_after,
            ),
            transcript: Transcript::new(),
            log: LogStream::new(settings.log_capacity),
            pending: None,
            unseeded: None,
            typing: Vec::new(),
            next_reply: 1,
            typing_interval: settings.typing_interval,
            input: String::new(),
            scroll_offset: 0,
            model_name: None,
            needs_redraw: true,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn connectivity(&self) -> &Connectivity {
        &self.connectivity
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn log(&self) -> &LogStream {
        &self.log
    }

    pub fn pending(&self) -> Option<&PendingReply> {
        self.pending.as_ref()
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn scroll_offset(&self) -> u16 {
        self.scroll_offset
    }

    /// `None` until settings load; empty when the backend has no model configured.
    pub fn model_name(&self) -> Option<&str> {
        self.model_name.as_deref()
    }

    pub fn is_typing(&self) -> bool {
        !self.typing.is_empty()
    }

    pub fn request_redraw(&mut self) {
        self.needs_redraw = true;
    }

    pub fn take_redraw_request(&mut self) -> bool {
        std::mem::take(&mut self.needs_redraw)
    }

    /// Apply one status poll. Failures, OFFLINE and unknown modes leave the
    /// session state and its projection exactly as they were.
    pub fn on_status(&mut self, result: Result<StatusReport, ApiError>, now: Instant) {
        let report = match result {
            Ok(report) => report,
            Err(err) => {
                log_debug(&format!("status poll failed: {err}"));
                self.record_status(false);
                return;
            }
        };
        let mode = match Mode::from_wire(&report.mode) {
            Some(Mode::Offline) => {
                self.record_status(false);
                return;
            }
            Some(mode) => mode,
            None => {
                log_debug(&format!("ignoring unknown mode {:?}", report.mode));
                self.record_status(false);
                // The backend hands each message out once, so keep it even without a mode.
                if let Some(message) = report.system_msg.as_deref() {
                    self.on_system_message(message, report.severity.as_deref(), now);
                }
                return;
            }
        };

        self.record_status(true);
        let before = self.state.clone();
        self.state.apply(mode, &report);
        if self.state != before {
            tracing::info!(
                mode = mode.as_wire(),
                busy = mode.is_busy(),
                "session state changed"
            );
            self.request_redraw();
        }

        if let Some(message) = report.system_msg.as_deref() {
            self.on_system_message(message, report.severity.as_deref(), now);
        }
    }

    pub fn on_heartbeat(&mut self, result: Result<(), ApiError>) {
        let ok = result.is_ok();
        if let Err(err) = &result {
            log_debug(&format!("heartbeat failed: {err}"));
        }
        state_change!(self, {
            let flipped = self.connectivity.record_heartbeat(ok);
            if flipped {
                tracing::info!(link_lost = self.connectivity.link_lost(), "link state changed");
            }
            flipped
        });
    }

    /// Primary action: stop while busy, start otherwise. The mode only changes
    /// when a later poll reports it.
    pub fn toggle(&self) -> Effect {
        if self.state.busy() {
            Effect::Command(CommandAction::Stop)
        } else {
            Effect::Command(CommandAction::Start)
        }
    }

    /// Send `text` as a chat message, or turn it into a stop while the system is busy.
    pub fn on_user_send(&mut self, text: &str) -> Vec<Effect> {
        if self.state.busy() {
            log_debug("send while busy; issuing stop instead");
            return vec![Effect::Command(CommandAction::Stop)];
        }
        let message = text.trim();
        if message.is_empty() {
            return Vec::new();
        }

        self.finalize_pending();
        self.flush_typing();

        let at = now_local();
        self.transcript.push_complete(Sender::User, message, at);
        self.input.clear();
        let bubble = self.transcript.open_ai_bubble(at);
        let reply = PendingReply::new(self.next_reply, bubble);
        self.next_reply += 1;
        let effect = Effect::Chat {
            reply: reply.id,
            message: message.to_string(),
            cancel: reply.cancel.clone(),
        };
        log_debug_content(&format!("chat send (reply {}): {message}", reply.id));
        self.pending = Some(reply);
        self.scroll_offset = 0;
        self.request_redraw();
        vec![effect]
    }

    /// Enter in the input line.
    pub fn send_current_input(&mut self) -> Vec<Effect> {
        let text = self.input.clone();
        self.on_user_send(&text)
    }

    pub fn on_chat_event(&mut self, event: ChatEvent) {
        if let ChatEventKind::Reply(text) = &event.kind {
            self.seed_reply(event.reply, text);
            return;
        }
        let Some(pending) = self.pending.as_mut().filter(|p| p.id == event.reply) else {
            log_debug(&format!("discarding chat event for reply {}", event.reply));
            return;
        };
        let bubble = pending.bubble;
        match event.kind {
            ChatEventKind::Chunk(chunk) => {
                if !pending.stream_open {
                    return;
                }
                let chunk = sanitize_incoming(&chunk);
                if chunk.is_empty() {
                    return;
                }
                if pending.has_loading_indicator {
                    pending.has_loading_indicator = false;
                    self.transcript.strip_loading(bubble);
                }
                self.transcript.append_to_body(bubble, &chunk);
                self.request_redraw();
            }
            // Routed to `seed_reply` above.
            ChatEventKind::Reply(_) => {}
            ChatEventKind::Finished => {
                if let Some(mut pending) = self.pending.take() {
                    pending.close_stream();
                }
                self.transcript.strip_loading(bubble);
                self.request_redraw();
            }
            ChatEventKind::Failed(reason) => {
                log_debug(&format!("chat reply {} failed: {reason}", event.reply));
                tracing::warn!(reply = event.reply, "chat request failed");
                if let Some(mut pending) = self.pending.take() {
                    pending.close_stream();
                }
                self.transcript.strip_loading(bubble);
                if let Some(span) =
                    self.transcript
                        .open_span(bubble, Severity::Error, SpanKind::Notice)
                {
                    self.transcript.append_to_span(span, DISCONNECT_MARKER);
                }
                self.request_redraw();
            }
        }
    }

    /// Advance typing animations. Returns whether anything was written.
    pub fn tick(&mut self, now: Instant) -> bool {
        if self.typing.is_empty() {
            return false;
        }
        let mut wrote = false;
        for writer in &mut self.typing {
            if let Some(text) = writer.due(now) {
                wrote |= self.transcript.append_to_span(writer.target(), &text);
            }
        }
        self.typing.retain(|writer| !writer.is_finished());
        if wrote {
            self.request_redraw();
        }
        wrote
    }

    /// Write out every running animation immediately.
    pub fn flush_typing(&mut self) {
        for mut writer in self.typing.drain(..) {
            if let Some(text) = writer.flush() {
                self.transcript.append_to_span(writer.target(), &text);
                self.needs_redraw = true;
            }
        }
    }

    /// Abandon every running animation without writing the remaining text.
    pub fn cancel_typing(&mut self) {
        for writer in self.typing.drain(..) {
            writer.cancel();
        }
    }

    /// Tear down in-flight work before the panel exits.
    pub fn shutdown(&mut self) {
        self.cancel_typing();
        if let Some(mut pending) = self.pending.take() {
            pending.close_stream();
        }
    }

    /// Seed the log pane from `/api/logs`.
    pub fn hydrate_logs(&mut self, result: Result<Vec<String>, ApiError>) {
        match result {
            Ok(lines) => {
                let count = lines.len();
                self.log
                    .load_history(lines.iter().map(|line| sanitize_incoming(line)));
                log_debug(&format!("loaded {count} backend log lines"));
                self.request_redraw();
            }
            Err(err) => log_debug(&format!("log history unavailable: {err}")),
        }
    }

    /// Seed the transcript from `/api/chat_history`; system entries go to the log.
    pub fn hydrate_history(&mut self, result: Result<Vec<ChatHistoryEntry>, ApiError>) {
        let entries = match result {
            Ok(entries) => entries,
            Err(err) => {
                log_debug(&format!("chat history unavailable: {err}"));
                return;
            }
        };
        for entry in entries {
            let at = NaiveDateTime::parse_from_str(&entry.timestamp, HISTORY_TIMESTAMP_FORMAT)
                .unwrap_or_else(|_| now_local());
            let text = sanitize_incoming(&entry.message);
            match entry.kind.as_str() {
                "user" => {
                    self.transcript.insert_replayed(Sender::User, &text, at);
                }
                "ai" => {
                    self.transcript.insert_replayed(Sender::Ai, &text, at);
                }
                "system" => {
                    let severity = Severity::classify(&text);
                    self.log.push_replayed(at, severity, text);
                }
                other => log_debug(&format!("skipping history entry of type {other:?}")),
            }
        }
        self.request_redraw();
    }

    pub fn set_model_name(&mut self, result: Result<PanelSettings, ApiError>) {
        match result {
            Ok(settings) => {
                self.model_name = Some(settings.model_name.trim().to_string());
                self.request_redraw();
            }
            Err(err) => log_debug(&format!("settings unavailable: {err}")),
        }
    }

    pub fn push_input_char(&mut self, ch: char) {
        if !self.state.projection().input_enabled || ch.is_control() {
            return;
        }
        if self.input.chars().count() >= INPUT_MAX_CHARS {
            return;
        }
        self.input.push(ch);
        self.request_redraw();
    }

    pub fn backspace_input(&mut self) {
        if !self.state.projection().input_enabled {
            return;
        }
        state_change!(self, { self.input.pop().is_some() });
    }

    pub fn clear_input(&mut self) {
        state_change!(self, {
            let had_text = !self.input.is_empty();
            self.input.clear();
            had_text
        });
    }

    pub fn clear_log(&mut self) {
        self.log.clear();
        self.request_redraw();
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.scroll_offset = self.scroll_offset.saturating_add(lines);
        self.request_redraw();
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.scroll_offset = self.scroll_offset.saturating_sub(lines);
        self.request_redraw();
    }

    fn record_status(&mut self, usable: bool) {
        state_change!(self, { self.connectivity.record_status(usable) });
    }

    /// Route a `system_msg` to the log, and into the open reply when there is one.
    fn on_system_message(&mut self, raw: &str, severity_field: Option<&str>, now: Instant) {
        let text = sanitize_incoming(raw);
        if text.trim().is_empty() {
            return;
        }
        let severity = Severity::resolve(severity_field, &text);
        self.log.push(now_local(), severity, text.clone());
        self.request_redraw();

        let Some(mut pending) = self.pending.take() else {
            return;
        };
        // Nothing arrived yet, so a `{reply}` body may still be on its way.
        let awaiting_body = pending.has_loading_indicator && pending.stream_open;
        pending.close_stream();
        if awaiting_body {
            self.unseeded = Some((pending.id, pending.bubble));
        }
        self.transcript.strip_loading(pending.bubble);
        match self
            .transcript
            .open_span(pending.bubble, severity, SpanKind::Continuation)
        {
            Some(span) => {
                tracing::debug!(
                    reply = pending.id,
                    severity = severity.label(),
                    "continuation attached"
                );
                self.typing
                    .push(TypeWriter::new(span, &text, self.typing_interval, now));
            }
            None => log_debug(&format!(
                "pending bubble {} no longer in transcript",
                pending.bubble
            )),
        }
    }

    /// Put a `{reply}` body into its bubble. The open reply keeps its loading
    /// indicator until a continuation or the next send; a reply already closed by
    /// its continuation still gets its text.
    fn seed_reply(&mut self, reply: ReplyId, text: &str) {
        let bubble = if let Some(pending) = self.pending.as_mut().filter(|p| p.id == reply) {
            // A reply body is the whole answer; no stream follows it.
            pending.stream_open = false;
            pending.bubble
        } else if let Some((_, bubble)) = self.unseeded.filter(|(id, _)| *id == reply) {
            self.unseeded = None;
            bubble
        } else {
            log_debug(&format!("discarding reply body for reply {reply}"));
            return;
        };
        let text = sanitize_incoming(text);
        if text.is_empty() {
            return;
        }
        self.transcript.append_to_body(bubble, &text);
        self.request_redraw();
    }

    /// Strip the loading indicator and detach the current reply, keeping its text.
    fn finalize_pending(&mut self) {
        if let Some(mut pending) = self.pending.take() {
            pending.close_stream();
            self.transcript.strip_loading(pending.bubble);
        }
    }
}

fn now_local() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Remove terminal escape sequences from server-sourced text.
fn sanitize_incoming(text: &str) -> String {
    if text.contains('\u{1b}') {
        strip_ansi_escapes::strip_str(text)
    } else {
        text.to_string()
    }
}
