use super::{ApiError, ChatBody, CommandAction, ControlApi, HttpControlApi, PanelSettings};
use std::io::Read;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tiny_http::{Header, Response, Server};

type Route = dyn Fn(&str, &str, &str) -> (u16, &'static str, String) + Send + Sync;

#[derive(Debug, Clone)]
struct Recorded {
    method: String,
    url: String,
    body: String,
}

/// Minimal in-process backend answering from a route closure.
struct TestServer {
    server: Arc<Server>,
    handle: Option<JoinHandle<()>>,
    requests: Arc<Mutex<Vec<Recorded>>>,
    base_url: String,
}

impl TestServer {
    fn start(
        route: impl Fn(&str, &str, &str) -> (u16, &'static str, String) + Send + Sync + 'static,
    ) -> Self {
        let server = Arc::new(Server::http("127.0.0.1:0").expect("bind test server"));
        let addr = server
            .server_addr()
            .to_ip()
            .expect("test server has an ip address");
        let requests = Arc::new(Mutex::new(Vec::new()));
        let route: Arc<Route> = Arc::new(route);
        let handle = {
            let server = Arc::clone(&server);
            let requests = Arc::clone(&requests);
            thread::spawn(move || {
                for mut request in server.incoming_requests() {
                    let mut body = String::new();
                    let _ = request.as_reader().read_to_string(&mut body);
                    let method = request.method().to_string();
                    let url = request.url().to_string();
                    let (status, content_type, payload) = route(&method, &url, &body);
                    requests.lock().expect("requests lock").push(Recorded {
                        method,
                        url,
                        body,
                    });
                    let header = Header::from_bytes(&b"Content-Type"[..], content_type.as_bytes())
                        .expect("content type header");
                    let _ = request.respond(
                        Response::from_string(payload)
                            .with_status_code(status)
                            .with_header(header),
                    );
                }
            })
        };
        Self {
            server,
            handle: Some(handle),
            requests,
            base_url: format!("http://{addr}"),
        }
    }

    fn api(&self) -> HttpControlApi {
        HttpControlApi::new(
            &self.base_url,
            Duration::from_secs(2),
            Duration::from_secs(5),
        )
        .expect("build client")
    }

    fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().expect("requests lock").clone()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

const JSON: &str = "application/json";
const TEXT: &str = "text/plain; charset=utf-8";

#[test]
fn status_decodes_mode_inventory_and_message() {
    let server = TestServer::start(|_, _, _| {
        (
            200,
            JSON,
            r#"{"mode":"IDLE","inventory":{"1":0,"2":1,"3":0,"4":0,"5":0,"6":0},"system_msg":"ready"}"#
                .to_string(),
        )
    });
    let report = server.api().status().expect("status");
    assert_eq!(report.mode, "IDLE");
    assert!(report.is_occupied(2));
    assert!(!report.is_occupied(1));
    assert!(!report.is_occupied(7));
    assert_eq!(report.system_msg.as_deref(), Some("ready"));
    assert_eq!(server.requests()[0].url, "/status");
}

#[test]
fn status_tolerates_null_message_and_missing_inventory() {
    let server =
        TestServer::start(|_, _, _| (200, JSON, r#"{"mode":"AUTO","system_msg":null}"#.into()));
    let report = server.api().status().expect("status");
    assert_eq!(report.mode, "AUTO");
    assert!(report.system_msg.is_none());
    assert!((1..=6).all(|slot| !report.is_occupied(slot)));
}

#[test]
fn status_http_error_is_reported() {
    let server = TestServer::start(|_, _, _| (503, TEXT, "down".into()));
    match server.api().status() {
        Err(ApiError::Status { endpoint, status }) => {
            assert_eq!(endpoint, "/status");
            assert_eq!(status, 503);
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[test]
fn status_malformed_body_is_decode_error() {
    let server = TestServer::start(|_, _, _| (200, JSON, "{not json".into()));
    assert!(matches!(
        server.api().status(),
        Err(ApiError::Decode { endpoint: "/status", .. })
    ));
}

#[test]
fn unreachable_backend_is_transport_error() {
    let api = HttpControlApi::new(
        "http://127.0.0.1:1",
        Duration::from_millis(300),
        Duration::from_millis(300),
    )
    .expect("build client");
    assert!(matches!(
        api.heartbeat(),
        Err(ApiError::Transport { endpoint: "/heartbeat", .. })
    ));
}

#[test]
fn heartbeat_posts() {
    let server = TestServer::start(|_, _, _| (200, JSON, "\"ok\"".into()));
    server.api().heartbeat().expect("heartbeat");
    let requests = server.requests();
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].url, "/heartbeat");
}

#[test]
fn chat_text_body_is_streamed() {
    let server = TestServer::start(|_, _, _| (200, TEXT, "Placing the red capsule.".into()));
    let body = server.api().chat("put the red one in bin 1").expect("chat");
    let ChatBody::Stream(mut reader) = body else {
        panic!("expected a streamed body");
    };
    let mut text = String::new();
    reader.read_to_string(&mut text).expect("read body");
    assert_eq!(text, "Placing the red capsule.");
    let sent: serde_json::Value =
        serde_json::from_str(&server.requests()[0].body).expect("json request");
    assert_eq!(sent["message"], "put the red one in bin 1");
}

#[test]
fn chat_json_body_is_a_single_reply() {
    let server = TestServer::start(|_, _, _| (200, JSON, r#"{"reply":"On it."}"#.into()));
    match server.api().chat("hello").expect("chat") {
        ChatBody::Reply(text) => assert_eq!(text, "On it."),
        other => panic!("expected reply, got {other:?}"),
    }
}

#[test]
fn command_posts_action() {
    let server = TestServer::start(|_, _, _| (200, JSON, r#"{"status":"ok"}"#.into()));
    server.api().command(CommandAction::Stop).expect("command");
    let request = &server.requests()[0];
    assert_eq!(request.url, "/command");
    let sent: serde_json::Value = serde_json::from_str(&request.body).expect("json request");
    assert_eq!(sent["action"], "stop");
}

#[test]
fn settings_round_trip_through_backend() {
    let server = TestServer::start(|method, _, _| {
        if method == "GET" {
            (
                200,
                JSON,
                r#"{"provider":"deepseek","api_key":"sk-x","base_url":"https://api.deepseek.com","model_name":"deepseek-chat","system_prompt":""}"#
                    .into(),
            )
        } else {
            (200, JSON, r#"{"status":"success"}"#.into())
        }
    });
    let api = server.api();
    let settings = api.settings().expect("settings");
    assert_eq!(settings.model_name, "deepseek-chat");
    api.save_settings(&settings).expect("save");
    let saved: PanelSettings =
        serde_json::from_str(&server.requests()[1].body).expect("json request");
    assert_eq!(saved, settings);
}

#[test]
fn save_settings_surfaces_backend_reason() {
    let server = TestServer::start(|_, _, _| {
        (500, JSON, r#"{"status":"error","msg":"disk full"}"#.into())
    });
    let err = server
        .api()
        .save_settings(&PanelSettings::default())
        .unwrap_err();
    assert!(err.to_string().contains("disk full"));
}

#[test]
fn logs_and_history_decode() {
    let server = TestServer::start(|_, url, _| match url {
        "/api/logs" => (200, JSON, r#"{"logs":["a","b"]}"#.into()),
        _ => (
            200,
            JSON,
            r#"{"history":[{"sender":"me","message":"hi","type":"user","timestamp":"2026-01-02 03:04:05"}]}"#
                .into(),
        ),
    });
    let api = server.api();
    assert_eq!(api.logs().expect("logs"), vec!["a", "b"]);
    let history = api.chat_history().expect("history");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].kind, "user");
    assert_eq!(history[0].message, "hi");
}
