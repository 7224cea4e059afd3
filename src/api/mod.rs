//! Client for the sorting backend's HTTP surface. `ControlApi` is the seam the
//! session controller's workers talk through, so tests can swap the transport
//! for a scripted one without touching the reconciliation logic.

mod http;
mod protocol;
#[cfg(test)]
mod tests;

use std::io::Read;

pub use http::HttpControlApi;
pub use protocol::{ChatHistoryEntry, CommandAction, PanelSettings, StatusReport};

/// Errors raised by a backend call. Callers in the event loop swallow these.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{endpoint} request failed: {source}")]
    Transport {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{endpoint} returned HTTP {status}")]
    Status { endpoint: &'static str, status: u16 },
    #[error("{endpoint} returned a malformed body: {message}")]
    Decode {
        endpoint: &'static str,
        message: String,
    },
    #[error("{endpoint} rejected the request: {message}")]
    Rejected {
        endpoint: &'static str,
        message: String,
    },
    #[error("chat stream interrupted: {0}")]
    Stream(#[from] std::io::Error),
}

/// Body of a `/chat` response. Both shapes are consumed through the same chunk path.
pub enum ChatBody {
    /// Incrementally readable text body.
    Stream(Box<dyn Read + Send>),
    /// `{reply}` JSON body delivered in one piece.
    Reply(String),
}

impl std::fmt::Debug for ChatBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatBody::Stream(_) => f.write_str("ChatBody::Stream(..)"),
            ChatBody::Reply(text) => f.debug_tuple("ChatBody::Reply").field(text).finish(),
        }
    }
}

/// Backend operations used by the control panel.
pub trait ControlApi: Send + Sync {
    fn status(&self) -> Result<StatusReport, ApiError>;
    fn heartbeat(&self) -> Result<(), ApiError>;
    fn chat(&self, message: &str) -> Result<ChatBody, ApiError>;
    fn command(&self, action: CommandAction) -> Result<(), ApiError>;
    fn settings(&self) -> Result<PanelSettings, ApiError>;
    fn save_settings(&self, settings: &PanelSettings) -> Result<(), ApiError>;
    fn logs(&self) -> Result<Vec<String>, ApiError>;
    fn chat_history(&self) -> Result<Vec<ChatHistoryEntry>, ApiError>;
}
