//! End-to-end turns against a scripted chat service: a real axum endpoint,
//! the real reqwest transport, and the full decode/fold path in between.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use bookchat::{ChatSession, HttpChatTransport, MessageRole, SessionConfig};

#[derive(Clone, Default)]
struct Recorded {
    requests: Arc<Mutex<Vec<serde_json::Value>>>,
}

async fn stream_handler(
    State(recorded): State<Recorded>,
    Json(body): Json<serde_json::Value>,
) -> impl IntoResponse {
    recorded.requests.lock().unwrap().push(body);
    let script = concat!(
        "data: {\"type\": \"conversation_id\", \"data\": \"conv-1\"}\n\n",
        ": keepalive\n\n",
        "data: {\"type\": \"sources\", \"data\": [{\"text\": \"passage\", \"source\": \"ch3.md\", ",
        "\"chapter\": \"Chapter 3\", \"title\": \"Perception\", \"score\": 0.91}]}\n\n",
        "data: {\"type\": \"text\", \"data\": \"Streaming \"}\n\n",
        "data: {\"type\": \"text\", \"data\": \"works.\"}\n\n",
        "data: {\"type\": \"done\"}\n\n",
    );
    ([(header::CONTENT_TYPE, "text/event-stream")], script)
}

async fn error_handler() -> impl IntoResponse {
    StatusCode::INTERNAL_SERVER_ERROR
}

async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bookchat=debug".into()),
        )
        .try_init();
}

fn session_against(addr: SocketAddr) -> ChatSession {
    let mut config = SessionConfig::default();
    config.endpoint = format!("http://{addr}/api/v1/chat/stream");
    let transport = Arc::new(HttpChatTransport::new(config.endpoint.clone()));
    ChatSession::new(config, transport)
}

#[tokio::test]
async fn streamed_turn_end_to_end() {
    init_tracing();
    let recorded = Recorded::default();
    let app = Router::new()
        .route("/api/v1/chat/stream", post(stream_handler))
        .with_state(recorded.clone());
    let addr = serve(app).await;

    let session = session_against(addr);
    assert!(session.send("How do robots walk?").await);

    let transcript = session.transcript();
    assert_eq!(transcript.len(), 3);
    assert_eq!(transcript[1].role, MessageRole::User);
    let reply = &transcript[2];
    assert_eq!(reply.role, MessageRole::Assistant);
    assert_eq!(reply.content, "Streaming works.");
    assert!(!reply.streaming);
    let sources = reply.sources.as_ref().expect("sources attached");
    assert_eq!(sources[0].title, "Perception");
    assert_eq!(session.conversation_id(), Some("conv-1".to_string()));
    assert!(!session.in_flight());

    // The assigned id rides on the next request of the same session.
    assert!(session.send("And how do they run?").await);
    let requests = recorded.requests.lock().unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0]["conversation_id"], serde_json::Value::Null);
    assert_eq!(requests[1]["conversation_id"], "conv-1");
    assert_eq!(requests[1]["message"], "And how do they run?");
}

#[tokio::test]
async fn non_success_status_fails_the_turn_but_not_the_session() {
    init_tracing();
    let app = Router::new().route("/api/v1/chat/stream", post(error_handler));
    let addr = serve(app).await;

    let session = session_against(addr);
    assert!(session.send("hello?").await);

    let transcript = session.transcript();
    assert_eq!(transcript.len(), 3);
    assert_eq!(transcript[2].content, SessionConfig::default().failure_notice);
    assert!(!transcript[2].streaming);
    assert!(!session.in_flight());
    assert_eq!(session.conversation_id(), None);

    // The session is still usable after the failed turn.
    assert!(!session.in_flight());
    assert!(session.transcript()[2].sources.is_none());
}
