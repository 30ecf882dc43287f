//! Hosted backends against a local one-shot HTTP server.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::sync::mpsc;
use std::thread;

use carelog_core::types::ChatTurn;
use carelog_gateway::{AnthropicBackend, ChatBackend, GatewayError, OpenAiBackend};

/// What the server saw.
struct CapturedRequest {
    request_line: String,
    headers: Vec<(String, String)>,
    body: String,
}

impl CapturedRequest {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

/// Serve exactly one request with `status` and `body`, returning the base URL
/// and a receiver for the captured request.
fn serve_once(status: u16, body: &'static str) -> (String, mpsc::Receiver<CapturedRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());

        let mut request_line = String::new();
        reader.read_line(&mut request_line).unwrap();

        let mut headers = Vec::new();
        let mut content_length = 0usize;
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            let line = line.trim_end();
            if line.is_empty() {
                break;
            }
            if let Some((name, value)) = line.split_once(':') {
                let (name, value) = (name.trim().to_string(), value.trim().to_string());
                if name.eq_ignore_ascii_case("content-length") {
                    content_length = value.parse().unwrap();
                }
                headers.push((name, value));
            }
        }

        let mut request_body = vec![0u8; content_length];
        reader.read_exact(&mut request_body).unwrap();

        let reason = if status < 300 { "OK" } else { "Error" };
        let response = format!(
            "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len(),
        );
        let mut stream = stream;
        stream.write_all(response.as_bytes()).unwrap();
        stream.flush().unwrap();

        let _ = tx.send(CapturedRequest {
            request_line: request_line.trim_end().to_string(),
            headers,
            body: String::from_utf8(request_body).unwrap(),
        });
    });

    (format!("http://{addr}"), rx)
}

fn history() -> Vec<ChatTurn> {
    vec![
        ChatTurn::assistant("Hello! How was your visit?"),
        ChatTurn::user("The wait was long."),
    ]
}

#[test]
fn openai_chat_round_trip() {
    let (base, rx) = serve_once(
        200,
        r#"{"choices":[{"message":{"role":"assistant","content":"How long did you wait?"}}]}"#,
    );
    let backend = OpenAiBackend::new("sk-test", "gpt-test", &base, 5).unwrap();

    let reply = backend.chat(&history(), "persona").unwrap();
    assert_eq!(reply, "How long did you wait?");

    let request = rx.recv().unwrap();
    assert_eq!(request.request_line, "POST /v1/chat/completions HTTP/1.1");
    assert_eq!(request.header("authorization"), Some("Bearer sk-test"));
    let body = request.json();
    assert_eq!(body["model"], "gpt-test");
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"].as_array().unwrap().len(), 3);
}

#[test]
fn openai_analyze_requests_json_mode() {
    let (base, rx) = serve_once(
        200,
        r#"{"choices":[{"message":{"content":"{\"satisfaction_score\":4}"}}]}"#,
    );
    let backend = OpenAiBackend::new("sk-test", "gpt-test", &base, 5).unwrap();

    let raw = backend.analyze("Patient: fine", "analysis prompt").unwrap();
    assert_eq!(raw, r#"{"satisfaction_score":4}"#);

    let body = rx.recv().unwrap().json();
    assert_eq!(body["response_format"]["type"], "json_object");
    assert_eq!(body["messages"][1]["content"], "Patient: fine");
}

#[test]
fn openai_unauthorized_maps_to_auth_error() {
    let (base, _rx) = serve_once(401, r#"{"error":{"message":"Incorrect API key provided"}}"#);
    let backend = OpenAiBackend::new("sk-bad", "gpt-test", &base, 5).unwrap();

    match backend.chat(&history(), "persona") {
        Err(GatewayError::Auth {
            provider,
            status,
            message,
        }) => {
            assert_eq!(provider, "openai");
            assert_eq!(status, 401);
            assert_eq!(message, "Incorrect API key provided");
        }
        other => panic!("expected Auth error, got {other:?}"),
    }
}

#[test]
fn openai_malformed_body_is_invalid_response() {
    let (base, _rx) = serve_once(200, "not json at all");
    let backend = OpenAiBackend::new("sk-test", "gpt-test", &base, 5).unwrap();

    let err = backend.chat(&history(), "persona").unwrap_err();
    assert!(matches!(err, GatewayError::InvalidResponse { .. }));
}

#[test]
fn anthropic_chat_sends_version_headers() {
    let (base, rx) = serve_once(
        200,
        r#"{"content":[{"type":"text","text":"I'm sorry about the wait."}],"stop_reason":"end_turn"}"#,
    );
    let backend = AnthropicBackend::new("sk-ant-test", "claude-test", &base, 5).unwrap();

    let reply = backend.chat(&history(), "persona").unwrap();
    assert_eq!(reply, "I'm sorry about the wait.");

    let request = rx.recv().unwrap();
    assert_eq!(request.request_line, "POST /v1/messages HTTP/1.1");
    assert_eq!(request.header("x-api-key"), Some("sk-ant-test"));
    assert_eq!(request.header("anthropic-version"), Some("2023-06-01"));

    let body = request.json();
    assert_eq!(body["system"], "persona");
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["role"], "user");
}

#[test]
fn anthropic_rate_limit_maps_to_rate_limited() {
    let (base, _rx) = serve_once(
        429,
        r#"{"type":"error","error":{"type":"rate_limit_error","message":"Number of requests exceeded"}}"#,
    );
    let backend = AnthropicBackend::new("sk-ant-test", "claude-test", &base, 5).unwrap();

    let err = backend.analyze("Patient: ok", "prompt").unwrap_err();
    assert!(matches!(
        err,
        GatewayError::RateLimited {
            provider: "anthropic",
            ..
        }
    ));
}

#[test]
fn unreachable_host_is_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let backend = OpenAiBackend::new("sk-test", "gpt-test", &base, 2).unwrap();
    let err = backend.chat(&history(), "persona").unwrap_err();
    assert!(err.is_transport(), "expected transport error, got {err:?}");
}
