use super::protocol::{
    ChatHistoryResponse, ChatReply, ChatRequest, CommandRequest, LogsResponse,
    SaveSettingsResponse,
};
use super::{ApiError, ChatBody, ChatHistoryEntry, CommandAction, ControlApi, PanelSettings, StatusReport};
use reqwest::blocking::{Client, Response};
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Blocking HTTP transport. Every call runs on a worker thread, never on the event loop.
pub struct HttpControlApi {
    base_url: String,
    client: Client,
    chat_client: Client,
}

impl HttpControlApi {
    /// `request_timeout` bounds the short calls; `chat_timeout` bounds a whole chat
    /// exchange including the streamed body.
    pub fn new(
        base_url: &str,
        request_timeout: Duration,
        chat_timeout: Duration,
    ) -> Result<Self, ApiError> {
        let build = |timeout: Duration| {
            Client::builder()
                .timeout(timeout)
                .connect_timeout(request_timeout)
                .build()
                .map_err(|source| ApiError::Transport {
                    endpoint: "client",
                    source,
                })
        };
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: build(request_timeout)?,
            chat_client: build(chat_timeout)?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn get_json<T: DeserializeOwned>(&self, endpoint: &'static str) -> Result<T, ApiError> {
        let response = self
            .client
            .get(self.url(endpoint))
            .send()
            .map_err(|source| ApiError::Transport { endpoint, source })?;
        decode(endpoint, checked(endpoint, response)?)
    }
}

fn checked(endpoint: &'static str, response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(ApiError::Status {
            endpoint,
            status: status.as_u16(),
        })
    }
}

fn decode<T: DeserializeOwned>(endpoint: &'static str, response: Response) -> Result<T, ApiError> {
    response.json::<T>().map_err(|err| ApiError::Decode {
        endpoint,
        message: err.to_string(),
    })
}

fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_ascii_lowercase().starts_with("application/json"))
        .unwrap_or(false)
}

impl ControlApi for HttpControlApi {
    fn status(&self) -> Result<StatusReport, ApiError> {
        self.get_json("/status")
    }

    fn heartbeat(&self) -> Result<(), ApiError> {
        const ENDPOINT: &str = "/heartbeat";
        let response = self
            .client
            .post(self.url(ENDPOINT))
            .send()
            .map_err(|source| ApiError::Transport {
                endpoint: ENDPOINT,
                source,
            })?;
        checked(ENDPOINT, response).map(|_| ())
    }

    fn chat(&self, message: &str) -> Result<ChatBody, ApiError> {
        const ENDPOINT: &str = "/chat";
        let response = self
            .chat_client
            .post(self.url(ENDPOINT))
            .json(&ChatRequest { message })
            .send()
            .map_err(|source| ApiError::Transport {
                endpoint: ENDPOINT,
                source,
            })?;
        let response = checked(ENDPOINT, response)?;
        if is_json(&response) {
            let reply: ChatReply = decode(ENDPOINT, response)?;
            Ok(ChatBody::Reply(reply.reply))
        } else {
            Ok(ChatBody::Stream(Box::new(response)))
        }
    }

    fn command(&self, action: CommandAction) -> Result<(), ApiError> {
        const ENDPOINT: &str = "/command";
        let response = self
            .client
            .post(self.url(ENDPOINT))
            .json(&CommandRequest { action })
            .send()
            .map_err(|source| ApiError::Transport {
                endpoint: ENDPOINT,
                source,
            })?;
        checked(ENDPOINT, response).map(|_| ())
    }

    fn settings(&self) -> Result<PanelSettings, ApiError> {
        self.get_json("/api/settings")
    }

    fn save_settings(&self, settings: &PanelSettings) -> Result<(), ApiError> {
        const ENDPOINT: &str = "/api/settings";
        let response = self
            .client
            .post(self.url(ENDPOINT))
            .json(settings)
            .send()
            .map_err(|source| ApiError::Transport {
                endpoint: ENDPOINT,
                source,
            })?;
        // The backend answers 500 with a JSON reason; surface that reason when present.
        let status = response.status();
        let body: SaveSettingsResponse = response.json().unwrap_or_default();
        if status.is_success() && body.status == "success" {
            return Ok(());
        }
        if let Some(message) = body.msg.filter(|msg| !msg.trim().is_empty()) {
            return Err(ApiError::Rejected {
                endpoint: ENDPOINT,
                message,
            });
        }
        if !status.is_success() {
            return Err(ApiError::Status {
                endpoint: ENDPOINT,
                status: status.as_u16(),
            });
        }
        Err(ApiError::Rejected {
            endpoint: ENDPOINT,
            message: format!("status `{}`", body.status),
        })
    }

    fn logs(&self) -> Result<Vec<String>, ApiError> {
        let response: LogsResponse = self.get_json("/api/logs")?;
        Ok(response.logs)
    }

    fn chat_history(&self) -> Result<Vec<ChatHistoryEntry>, ApiError> {
        let response: ChatHistoryResponse = self.get_json("/api/chat_history")?;
        Ok(response.history)
    }
}
