//! Fake document QA backend served by axum on an ephemeral port.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::task::JoinHandle;

/// File name the fake backend fails to process.
pub const UNREADABLE_PDF: &str = "scanned.pdf";

/// Question that makes the fake backend return HTTP 500.
pub const EXPLODING_QUESTION: &str = "explode";

#[derive(Default)]
pub struct BackendState {
    pub ingested: AtomicBool,
    pub upload_calls: AtomicUsize,
    pub chat_calls: AtomicUsize,
    pub chat_delay_ms: AtomicU64,
    pub last_upload: Mutex<Option<(String, String, usize)>>,
    pub last_history: Mutex<Option<Vec<String>>>,
}

pub struct FakeBackend {
    pub addr: SocketAddr,
    pub state: Arc<BackendState>,
    handle: JoinHandle<()>,
}

impl FakeBackend {
    pub async fn start() -> Self {
        let state = Arc::new(BackendState::default());
        let router = Router::new()
            .route("/docs", get(|| async { "<html>docs</html>" }))
            .route("/upload_and_process/", post(upload_and_process))
            .route("/chat/", post(chat))
            .layer(DefaultBodyLimit::disable())
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn set_chat_delay(&self, delay: Duration) {
        self.state
            .chat_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn upload_calls(&self) -> usize {
        self.state.upload_calls.load(Ordering::SeqCst)
    }

    pub fn chat_calls(&self) -> usize {
        self.state.chat_calls.load(Ordering::SeqCst)
    }

    pub fn last_upload(&self) -> Option<(String, String, usize)> {
        self.state.last_upload.lock().unwrap().clone()
    }

    pub fn last_history(&self) -> Option<Vec<String>> {
        self.state.last_history.lock().unwrap().clone()
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// An address nothing listens on.
pub async fn unreachable_base_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

async fn upload_and_process(
    State(state): State<Arc<BackendState>>,
    mut multipart: Multipart,
) -> Response {
    state.upload_calls.fetch_add(1, Ordering::SeqCst);

    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        let bytes = field.bytes().await.unwrap_or_default();
        *state.last_upload.lock().unwrap() = Some((file_name.clone(), content_type, bytes.len()));

        if file_name == UNREADABLE_PDF {
            return Json(json!({
                "message": "Processing failed: no extractable text",
                "status": "error"
            }))
            .into_response();
        }

        state.ingested.store(true, Ordering::SeqCst);
        return Json(json!({
            "message": "File processed successfully",
            "status": "success"
        }))
        .into_response();
    }

    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({"detail": [{"loc": ["body", "file"], "msg": "field required"}]})),
    )
        .into_response()
}

async fn chat(State(state): State<Arc<BackendState>>, Json(body): Json<Value>) -> Response {
    state.chat_calls.fetch_add(1, Ordering::SeqCst);

    let delay = state.chat_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }

    if !state.ingested.load(Ordering::SeqCst) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "detail": "RAG system not initialized. Please upload and process a document first."
            })),
        )
            .into_response();
    }

    let question = body["question"].as_str().unwrap_or_default().to_string();
    let mut history: Vec<String> = serde_json::from_value(body["history"].clone()).unwrap_or_default();
    *state.last_history.lock().unwrap() = Some(history.clone());

    if question == EXPLODING_QUESTION {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"detail": "Error during chat: boom"})),
        )
            .into_response();
    }

    let answer = format!("The document says something about {}.", question);
    history.push(format!("Human: {}\nAssistant: {}", question, answer));
    Json(json!({
        "answer": answer,
        "sources": ["page 1", "page 3"],
        "updated_history": history
    }))
    .into_response()
}
