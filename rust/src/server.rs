use anyhow::{anyhow, Context, Result};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::TcpListener;
use std::sync::atomic::{AtomicU16, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

use crate::catalog::Catalog;
use crate::error::GenerationError;
use crate::generator::IdeaGenerator;
use crate::main_ui_html::build_main_ui_html;
use crate::selector::{select_random, Selection};
use crate::timer_driver::{run_timer, TimerSnapshot, TICK_INTERVAL};

pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub generator: Arc<IdeaGenerator>,
    pub timer: watch::Sender<TimerSnapshot>,
    pub timer_enabled: bool,
    pub server_port: AtomicU16,
    pub ideas_revision: AtomicU64,
}

type ApiResponse = (StatusCode, Json<Value>);

impl AppState {
    pub fn new(catalog: Arc<Catalog>, generator: Arc<IdeaGenerator>, timer_enabled: bool) -> Self {
        let (timer, _) = watch::channel(TimerSnapshot::disabled());
        Self {
            catalog,
            generator,
            timer,
            timer_enabled,
            server_port: AtomicU16::new(0),
            ideas_revision: AtomicU64::new(0),
        }
    }
}

pub struct AppServer {
    port: u16,
    shutdown_tx: Option<oneshot::Sender<()>>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

impl AppServer {
    pub fn start(state: Arc<AppState>, preferred_port: u16) -> Result<Self> {
        Self::start_with_tick(state, preferred_port, TICK_INTERVAL)
    }

    /// Starts the HTTP server and, when enabled, the reveal timer on the
    /// same runtime. The timer is aborted once the server has shut down.
    pub fn start_with_tick(
        state: Arc<AppState>,
        preferred_port: u16,
        tick_interval: Duration,
    ) -> Result<Self> {
        let listener = bind_listener(preferred_port)?;
        let port = listener
            .local_addr()
            .context("failed to inspect server local address")?
            .port();
        listener
            .set_nonblocking(true)
            .context("failed to set listener non-blocking")?;

        state.server_port.store(port, Ordering::Relaxed);

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let thread_handle = thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build();
            let runtime = match runtime {
                Ok(runtime) => runtime,
                Err(err) => {
                    error!("failed to build server runtime: {err}");
                    return;
                }
            };

            runtime.block_on(async move {
                let listener = match tokio::net::TcpListener::from_std(listener) {
                    Ok(listener) => listener,
                    Err(err) => {
                        error!("failed to adopt server listener: {err}");
                        return;
                    }
                };

                let timer = state
                    .timer_enabled
                    .then(|| tokio::spawn(run_timer(state.clone(), tick_interval)));

                let app = build_router(state);
                let server = axum::serve(listener, app).with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                });
                if let Err(err) = server.await {
                    error!("server stopped with error: {err}");
                }

                if let Some(timer) = timer {
                    timer.abort();
                }
            });
        });

        Ok(Self {
            port,
            shutdown_tx: Some(shutdown_tx),
            thread_handle: Some(thread_handle),
        })
    }

    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl Drop for AppServer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateReq {
    domain: Option<String>,
    subdomain: Option<String>,
    missing_piece: Option<String>,
}

impl GenerateReq {
    /// A partially specified request is replaced by a fresh random pick.
    fn into_selection(self, catalog: &Catalog) -> Selection {
        match (
            non_blank(self.domain),
            non_blank(self.subdomain),
            non_blank(self.missing_piece),
        ) {
            (Some(domain), Some(subdomain), Some(missing_piece)) => Selection {
                domain,
                subdomain,
                missing_piece,
            },
            _ => select_random(catalog, &mut rand::rng()),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn build_router(state: Arc<AppState>) -> Router {
    let port = state.server_port.load(Ordering::Relaxed);
    let local_origin = HeaderValue::from_str(&format!("http://127.0.0.1:{port}"))
        .expect("127.0.0.1 origin should be valid");
    let localhost_origin = HeaderValue::from_str(&format!("http://localhost:{port}"))
        .expect("localhost origin should be valid");

    let cors = CorsLayer::new()
        .allow_origin([local_origin, localhost_origin])
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(get_main_page))
        .route("/ping", get(get_ping))
        .route("/categories", get(get_categories))
        .route("/ideas", get(get_ideas))
        .route("/ideas/generate", post(post_generate_idea))
        .route("/ideas/revision", get(get_ideas_revision))
        .route("/timer", get(get_timer))
        .layer(cors)
        .with_state(state)
}

async fn get_main_page(State(state): State<Arc<AppState>>) -> Html<String> {
    let ideas = state.generator.store().list().await;
    Html(build_main_ui_html(&ideas))
}

async fn get_ping() -> ApiResponse {
    ok_json(json!({}))
}

async fn get_categories(State(state): State<Arc<AppState>>) -> ApiResponse {
    match serde_json::to_value(state.catalog.as_ref()) {
        Ok(catalog) => ok_json(catalog),
        Err(err) => {
            error!("failed to serialize catalog: {err}");
            err_json(StatusCode::INTERNAL_SERVER_ERROR, "Failed to load categories")
        }
    }
}

async fn get_ideas(State(state): State<Arc<AppState>>) -> ApiResponse {
    let ideas = state.generator.store().list().await;
    ok_json(json!({ "ideas": ideas }))
}

async fn post_generate_idea(State(state): State<Arc<AppState>>, body: Bytes) -> ApiResponse {
    let payload = if body.iter().all(u8::is_ascii_whitespace) {
        GenerateReq::default()
    } else {
        match serde_json::from_slice::<GenerateReq>(&body) {
            Ok(payload) => payload,
            Err(err) => {
                warn!("ignoring unreadable generate request body: {err}");
                GenerateReq::default()
            }
        }
    };
    let selection = payload.into_selection(&state.catalog);

    match state.generator.generate(&selection).await {
        Ok(idea) => {
            state.ideas_revision.fetch_add(1, Ordering::Relaxed);
            info!("stored idea {} for {}", idea.id, idea.tags);
            ok_json(json!({ "idea": idea }))
        }
        Err(GenerationError::Configuration) => {
            let message = GenerationError::Configuration.to_string();
            error!("{message}");
            err_json(StatusCode::INTERNAL_SERVER_ERROR, &message)
        }
        Err(err) => {
            error!("idea generation failed: {err}");
            err_json(StatusCode::INTERNAL_SERVER_ERROR, "Failed to generate idea")
        }
    }
}

async fn get_ideas_revision(State(state): State<Arc<AppState>>) -> ApiResponse {
    let revision = state.ideas_revision.load(Ordering::Relaxed);
    ok_json(json!({ "revision": revision }))
}

async fn get_timer(State(state): State<Arc<AppState>>) -> ApiResponse {
    let snapshot = state.timer.borrow().clone();
    ok_json(json!({ "timer": snapshot }))
}

fn ok_json(payload: Value) -> ApiResponse {
    let mut body = serde_json::Map::new();
    body.insert("success".to_string(), Value::Bool(true));

    if let Some(obj) = payload.as_object() {
        for (key, value) in obj {
            body.insert(key.clone(), value.clone());
        }
    } else if !payload.is_null() {
        body.insert("data".to_string(), payload);
    }

    (StatusCode::OK, Json(Value::Object(body)))
}

fn err_json(status: StatusCode, message: &str) -> ApiResponse {
    (
        status,
        Json(json!({
            "success": false,
            "error": message,
        })),
    )
}

fn bind_listener(preferred_port: u16) -> Result<TcpListener> {
    if preferred_port == 0 {
        return TcpListener::bind(("127.0.0.1", 0)).context("failed to bind ephemeral port");
    }

    for offset in 0..200u16 {
        let port = preferred_port.saturating_add(offset);
        if let Ok(listener) = TcpListener::bind(("127.0.0.1", port)) {
            if offset > 0 {
                warn!("port {preferred_port} busy, using {port}");
            }
            return Ok(listener);
        }
    }

    Err(anyhow!("failed to bind server port near {preferred_port}"))
}

#[cfg(test)]
mod tests {
    use super::{AppServer, AppState};
    use crate::catalog::Catalog;
    use crate::credentials::{Credential, CredentialPool};
    use crate::error::{ProviderError, StoreError};
    use crate::generator::IdeaGenerator;
    use crate::idea_store::{IdeaRecord, IdeaStore};
    use crate::provider::TextProvider;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    struct FixedProvider {
        reply: Option<String>,
    }

    #[async_trait]
    impl TextProvider for FixedProvider {
        async fn generate_text(
            &self,
            _credential: &Credential,
            _prompt: &str,
            _thinking_budget: u32,
        ) -> Result<Option<String>, ProviderError> {
            Ok(self.reply.clone())
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        ideas: Mutex<Vec<IdeaRecord>>,
    }

    #[async_trait]
    impl IdeaStore for MemoryStore {
        async fn append(&self, record: &IdeaRecord) -> Result<(), StoreError> {
            self.ideas.lock().map_err(|_| StoreError::Lock)?.push(record.clone());
            Ok(())
        }

        async fn fetch_all(&self) -> Result<Vec<IdeaRecord>, StoreError> {
            let ideas = self.ideas.lock().map_err(|_| StoreError::Lock)?;
            Ok(ideas.iter().rev().cloned().collect())
        }
    }

    fn start(reply: Option<&str>, credentials: CredentialPool) -> (AppServer, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::default());
        let generator = Arc::new(IdeaGenerator::new(
            Arc::new(FixedProvider {
                reply: reply.map(str::to_string),
            }),
            store.clone(),
            credentials,
            1000,
        ));
        let state = Arc::new(AppState::new(
            Arc::new(Catalog::default()),
            generator,
            false,
        ));
        let server = AppServer::start(state, 0).expect("start server");
        (server, store)
    }

    fn pool() -> CredentialPool {
        CredentialPool::new(vec![Credential::new("GEMINI_API_KEY_1", "k")])
    }

    fn url(server: &AppServer, path: &str) -> String {
        format!("http://127.0.0.1:{}{path}", server.port())
    }

    #[tokio::test]
    async fn generate_then_list_round_trip() {
        let (server, store) = start(Some("An   idea\nfor leads."), pool());
        let client = reqwest::Client::new();

        let body: Value = client
            .post(url(&server, "/ideas/generate"))
            .json(&json!({
                "domain": "CRM",
                "subdomain": "Lead Management",
                "missingPiece": "AI-powered"
            }))
            .send()
            .await
            .expect("generate request")
            .json()
            .await
            .expect("generate body");

        assert_eq!(body["success"], true);
        assert_eq!(body["idea"]["text"], "An idea for leads.");
        assert_eq!(body["idea"]["missingPiece"], "AI-powered");
        assert_eq!(body["idea"]["tags"], "(CRM) (Lead Management)");
        assert_eq!(store.ideas.lock().expect("store lock").len(), 1);

        let listed: Value = client
            .get(url(&server, "/ideas"))
            .send()
            .await
            .expect("list request")
            .json()
            .await
            .expect("list body");
        assert_eq!(listed["ideas"].as_array().map(Vec::len), Some(1));

        let revision: Value = client
            .get(url(&server, "/ideas/revision"))
            .send()
            .await
            .expect("revision request")
            .json()
            .await
            .expect("revision body");
        assert_eq!(revision["revision"], 1);
    }

    #[tokio::test]
    async fn partial_request_falls_back_to_random_selection() {
        let (server, _store) = start(Some("Random pick."), pool());
        let catalog = Catalog::default();

        let body: Value = reqwest::Client::new()
            .post(url(&server, "/ideas/generate"))
            .json(&json!({ "domain": "CRM", "subdomain": "  " }))
            .send()
            .await
            .expect("generate request")
            .json()
            .await
            .expect("generate body");

        let domain = body["idea"]["domain"].as_str().expect("domain");
        let subdomain = body["idea"]["subdomain"].as_str().expect("subdomain");
        let piece = body["idea"]["missingPiece"].as_str().expect("missing piece");
        assert!(catalog
            .subdomains(domain)
            .is_some_and(|subs| subs.iter().any(|s| s == subdomain)));
        assert!(catalog.missing_piece_description(piece).is_some());
    }

    #[tokio::test]
    async fn failed_generation_is_500_and_stores_nothing() {
        let (server, store) = start(None, pool());

        let response = reqwest::Client::new()
            .post(url(&server, "/ideas/generate"))
            .send()
            .await
            .expect("generate request");
        assert_eq!(response.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);

        let body: Value = response.json().await.expect("error body");
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Failed to generate idea");
        assert!(store.ideas.lock().expect("store lock").is_empty());
    }

    #[tokio::test]
    async fn missing_credentials_report_configuration_message() {
        let (server, _store) = start(Some("unused"), CredentialPool::default());

        let response = reqwest::Client::new()
            .post(url(&server, "/ideas/generate"))
            .json(&json!({}))
            .send()
            .await
            .expect("generate request");
        assert_eq!(response.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = response.json().await.expect("error body");
        assert!(body["error"]
            .as_str()
            .is_some_and(|message| message.contains("GEMINI_API_KEY")));
    }

    #[tokio::test]
    async fn categories_and_timer_endpoints() {
        let (server, _store) = start(None, pool());
        let client = reqwest::Client::new();

        let categories: Value = client
            .get(url(&server, "/categories"))
            .send()
            .await
            .expect("categories request")
            .json()
            .await
            .expect("categories body");
        assert_eq!(categories["success"], true);
        assert!(categories["domains"]["CRM"].is_array());
        assert!(categories["missingPieces"].is_object());
        assert!(categories["domainCategories"].is_object());

        let timer: Value = client
            .get(url(&server, "/timer"))
            .send()
            .await
            .expect("timer request")
            .json()
            .await
            .expect("timer body");
        assert_eq!(timer["timer"]["enabled"], false);

        let page = client
            .get(url(&server, "/"))
            .send()
            .await
            .expect("page request")
            .text()
            .await
            .expect("page body");
        assert!(page.contains("<!doctype html>"));
    }
}
