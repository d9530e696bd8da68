//! Fake policy engine
//!
//! An axum server on a random local port. Each path answers with a scripted
//! sequence of responses; once a script runs out its last response repeats.
//! Unknown paths get a 404. Every request is recorded.
//!
//! The server runs on a runtime owned by the fixture, so the tests themselves
//! stay synchronous and the blocking HTTP client never lives inside it.

use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::Router;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::runtime::Runtime;

/// A request received by the fake policy engine.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    /// Header names are lowercased.
    pub headers: HashMap<String, String>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }
}

#[derive(Default)]
struct EngineState {
    scripts: Mutex<HashMap<String, VecDeque<(u16, String)>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl EngineState {
    fn next_response(&self, path: &str) -> (u16, String) {
        let mut scripts = self.scripts.lock().unwrap();
        match scripts.get_mut(path) {
            Some(script) if script.len() > 1 => script.pop_front().unwrap(),
            Some(script) => script.front().cloned().unwrap(),
            None => (404, String::new()),
        }
    }
}

async fn answer(
    State(state): State<Arc<EngineState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> impl IntoResponse {
    let path = uri.path().to_string();
    let headers = headers
        .iter()
        .filter_map(|(name, value)| {
            let value = value.to_str().ok()?;
            Some((name.as_str().to_lowercase(), value.to_string()))
        })
        .collect();

    state.requests.lock().unwrap().push(RecordedRequest {
        method: method.to_string(),
        path: path.clone(),
        headers,
    });

    let (status, body) = state.next_response(&path);
    let status = StatusCode::from_u16(status).expect("Invalid scripted status");
    (status, [(header::CONTENT_TYPE, "application/yaml")], body)
}

/// Fake policy engine instance.
///
/// When dropped, the server shuts down gracefully and its runtime stops.
pub struct FakePolicyEngine {
    /// Base URL for the gateway (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    state: Arc<EngineState>,

    /// Taken on drop, `shutdown_timeout` consumes it.
    runtime: Option<Runtime>,

    /// Shutdown signal sender (dropping this triggers shutdown)
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl FakePolicyEngine {
    /// Spawns a new fake policy engine on a random port.
    pub fn spawn() -> Self {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .expect("Failed to build fake policy engine runtime");

        let listener = runtime
            .block_on(TcpListener::bind("127.0.0.1:0"))
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();

        let state = Arc::new(EngineState::default());
        let app = Router::new().fallback(answer).with_state(state.clone());

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        runtime.spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Fake policy engine failed");
        });

        Self {
            base_url: format!("http://127.0.0.1:{}", port),
            state,
            runtime: Some(runtime),
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Answer `path` with the given responses, in order.
    pub fn respond(&self, path: &str, responses: Vec<(u16, &str)>) -> &Self {
        let script = responses
            .into_iter()
            .map(|(status, body)| (status, body.to_string()))
            .collect();
        self.state
            .scripts
            .lock()
            .unwrap()
            .insert(path.to_string(), script);
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, path: &str) -> usize {
        self.state
            .requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.path == path)
            .count()
    }
}

impl Drop for FakePolicyEngine {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_timeout(Duration::from_secs(1));
        }
    }
}
