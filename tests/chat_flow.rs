//! End-to-end chat flows: a real `ChatSession` talking to a mocked backend
//! over HTTP.
//!
//! Covers the full submit → awaiting → rendered-reply loop, the three
//! failure outcomes, and the terminal shutdown state.

use campusmate::backend::{AssistantBackend, HttpBackend};
use campusmate::session::{ChatSession, Sender, SessionState, WELCOME_TEXT};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn session_against(server_uri: &str, reply_timeout: Duration) -> ChatSession {
    let backend: Arc<dyn AssistantBackend> = Arc::new(
        HttpBackend::new(server_uri, Duration::from_secs(5)).expect("client should build"),
    );
    ChatSession::new(backend, reply_timeout)
}

async fn mock_reply(server: &MockServer, body: &str) {
    Mock::given(method("POST"))
        .and(path("/api/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "response": body
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn successful_exchange_appends_a_rendered_reply() {
    let server = MockServer::start().await;
    mock_reply(&server, "## Your courses\n• Math\n• Physics").await;

    let mut session = session_against(&server.uri(), Duration::from_secs(5));
    session.submit("what am I taking?").await;

    let entries = session.log().entries();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].raw_text, WELCOME_TEXT);
    assert_eq!(entries[1].sender, Sender::User);
    assert_eq!(entries[2].sender, Sender::Assistant);
    assert_eq!(
        entries[2].rendered_html,
        "<h2>Your courses</h2><br><ul><li>Math</li><li>Physics</li></ul>"
    );
    assert_eq!(session.state(), SessionState::Idle);
}

#[tokio::test]
async fn application_error_reply_carries_the_backend_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "error": "Canvas token expired"
        })))
        .mount(&server)
        .await;

    let mut session = session_against(&server.uri(), Duration::from_secs(5));
    session.submit("hello").await;

    let last = session.log().last().unwrap();
    assert_eq!(last.sender, Sender::Assistant);
    assert!(last.raw_text.contains("Canvas token expired"));
    assert_eq!(session.state(), SessionState::Idle);
}

#[tokio::test]
async fn unreachable_backend_appends_the_generic_failure() {
    let mut session = session_against("http://127.0.0.1:1", Duration::from_secs(5));
    session.submit("hello").await;

    let last = session.log().last().unwrap();
    assert_eq!(
        last.raw_text,
        "Sorry, there was an error processing your request."
    );
    assert_eq!(session.state(), SessionState::Idle);
}

#[tokio::test]
async fn slow_backend_times_out_and_session_recovers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/query"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"response": "too late"}))
                .set_delay(Duration::from_secs(30)),
        )
        .mount(&server)
        .await;

    let mut session = session_against(&server.uri(), Duration::from_millis(200));
    session.submit("hello").await;

    let last = session.log().last().unwrap();
    assert_eq!(
        last.raw_text,
        "Sorry, there was an error processing your request."
    );
    assert_eq!(session.state(), SessionState::Idle);

    // The session is idle again and can run another exchange.
    assert_eq!(session.log().len(), 3);
}

#[tokio::test]
async fn acknowledged_shutdown_rejects_further_submits() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/shutdown"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    // No query may be dispatched after shutdown.
    Mock::given(method("POST"))
        .and(path("/api/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "response": "should never be sent"
        })))
        .expect(0)
        .mount(&server)
        .await;

    let mut session = session_against(&server.uri(), Duration::from_secs(5));
    session.request_shutdown().await;
    assert_eq!(session.state(), SessionState::ShuttingDown);

    let len_before = session.log().len();
    session.submit("anyone home?").await;
    assert_eq!(session.log().len(), len_before);
}

#[tokio::test]
async fn failed_shutdown_keeps_the_session_alive() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/shutdown"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mock_reply(&server, "still here").await;

    let mut session = session_against(&server.uri(), Duration::from_secs(5));
    session.request_shutdown().await;

    assert_eq!(session.state(), SessionState::Idle);
    let last = session.log().last().unwrap();
    assert!(last.raw_text.contains("close it manually"));

    session.submit("are you alive?").await;
    assert_eq!(session.log().last().unwrap().raw_text, "still here");
}

#[tokio::test]
async fn clear_after_an_exchange_keeps_only_the_welcome_entry() {
    let server = MockServer::start().await;
    mock_reply(&server, "first answer").await;

    let mut session = session_against(&server.uri(), Duration::from_secs(5));
    session.submit("first question").await;
    assert_eq!(session.log().len(), 3);

    assert!(session.clear());
    let entries = session.log().entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].raw_text, WELCOME_TEXT);
    assert_eq!(entries[1].sender, Sender::System);

    session.submit("second question").await;
    assert_eq!(session.log().len(), 4);
}
