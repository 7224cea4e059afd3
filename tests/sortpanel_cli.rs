use std::process::Command;
use std::thread;
use tiny_http::{Header, Response, Server};

fn combined_output(output: &std::process::Output) -> String {
    let mut combined = String::new();
    combined.push_str(&String::from_utf8_lossy(&output.stdout));
    combined.push_str(&String::from_utf8_lossy(&output.stderr));
    combined
}

fn sortpanel_bin() -> &'static str {
    option_env!("CARGO_BIN_EXE_sortpanel").expect("sortpanel test binary not built")
}

fn sortpanel() -> Command {
    let mut command = Command::new(sortpanel_bin());
    command
        .env_remove("SORTPANEL_BASE_URL")
        .env_remove("SORTPANEL_API_KEY")
        .env("SORTPANEL_NO_LOGS", "1");
    command
}

#[test]
fn sortpanel_help_mentions_name() {
    let output = sortpanel()
        .arg("--help")
        .output()
        .expect("run sortpanel --help");
    assert!(output.status.success());
    let combined = combined_output(&output);
    assert!(combined.contains("Sortpanel"));
    assert!(combined.contains("--base-url"));
}

#[test]
fn sortpanel_rejects_combined_one_shots() {
    let output = sortpanel()
        .args(["--status", "--show-settings"])
        .output()
        .expect("run sortpanel with conflicting flags");
    assert!(!output.status.success());
    assert!(combined_output(&output).contains("cannot be combined"));
}

#[test]
fn sortpanel_status_prints_backend_snapshot() {
    let server = Server::http("127.0.0.1:0").expect("bind test server");
    let addr = server
        .server_addr()
        .to_ip()
        .expect("test server has an ip address");
    let backend = thread::spawn(move || {
        if let Ok(request) = server.recv() {
            let body = r#"{"mode":"EXECUTING","inventory":{"1":1,"2":0},"system_msg":null}"#;
            let header = Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                .expect("content type header");
            let _ = request.respond(Response::from_string(body).with_header(header));
        }
    });

    let output = sortpanel()
        .args(["--status", "--base-url", &format!("http://{addr}")])
        .output()
        .expect("run sortpanel --status");
    let _ = backend.join();
    let combined = combined_output(&output);
    assert!(output.status.success(), "{combined}");
    assert!(combined.contains("mode: EXECUTING"));
    assert!(combined.contains("state: SYSTEM BUSY"));
    assert!(combined.contains("bin 1: full"));
    assert!(combined.contains("bin 2: free"));
}
