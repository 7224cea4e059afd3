//! Session display controller: reconciles server mode, the chat transcript and
//! streamed replies into one display model.
//!
//! Worker threads (status poller, heartbeat, chat) only produce events. The
//! event loop feeds them into [`SessionController`] one at a time, which is the
//! only place display state changes.

mod chat;
mod controller;
mod log;
mod mode;
mod poller;
mod reply;
mod state;
mod transcript;

pub use chat::spawn_chat_job;
pub use controller::{
    ChatEvent, ChatEventKind, ControllerSettings, Effect, SessionController, DISCONNECT_MARKER,
};
pub use log::{LogEntry, LogStream, Severity, HISTORY_SEPARATOR, LOGS_CLEARED};
pub use mode::{Mode, ModeProjection, SendAffordance, Tone};
pub use poller::{PollEvent, Poller};
pub use reply::{CancelToken, PendingReply, ReplyId};
pub use state::{Connectivity, SessionState, SLOT_COUNT};
pub use transcript::{BubbleId, ChatEntry, Sender, Span, SpanKind, Transcript};
