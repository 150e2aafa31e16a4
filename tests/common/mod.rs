// Local stand-ins for the catalog API and the Telegram Bot API.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Form, Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;

use catalog_monitor::types::CategorySource;

/// Chat id the Telegram stub always rejects.
pub const FAILING_CHAT: &str = "-1";

pub const TEST_ORIGIN: &str = "https://shop.example";

async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// Base URL of a port nothing listens on.
pub async fn unreachable_base() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

pub fn listing(products: Value) -> Value {
    json!({ "products": products })
}

#[derive(Clone)]
struct CatalogState {
    listings: Arc<Mutex<HashMap<String, Value>>>,
    hits: Arc<Mutex<usize>>,
}

/// Catalog API stub.
///
/// `/listing/{name}` serves whatever was last set for `name`; the other
/// routes simulate upstream failures.
pub struct CatalogStub {
    pub base: String,
    state: CatalogState,
}

impl CatalogStub {
    pub async fn start() -> Self {
        let state = CatalogState {
            listings: Arc::new(Mutex::new(HashMap::new())),
            hits: Arc::new(Mutex::new(0)),
        };
        let router = Router::new()
            .route("/listing/{name}", get(listing_handler))
            .route("/slow", get(slow_handler))
            .route("/not-json", get(|| async { "<html>maintenance</html>" }))
            .route("/server-error", get(server_error_handler))
            .route("/no-products", get(|| async { Json(json!({"items": []})) }))
            .route("/user-agent", get(user_agent_handler))
            .with_state(state.clone());
        Self {
            base: serve(router).await,
            state,
        }
    }

    pub fn set_listing(&self, name: &str, body: Value) {
        self.state
            .listings
            .lock()
            .unwrap()
            .insert(name.to_string(), body);
    }

    pub fn hits(&self) -> usize {
        *self.state.hits.lock().unwrap()
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    /// A category served from `/listing/{name}`.
    pub fn source(&self, name: &str) -> CategorySource {
        CategorySource {
            name: name.to_string(),
            url: self.url(&format!("/listing/{name}")),
            origin: None,
        }
    }

    pub fn source_at(&self, name: &str, path: &str) -> CategorySource {
        CategorySource {
            name: name.to_string(),
            url: self.url(path),
            origin: None,
        }
    }
}

async fn listing_handler(
    State(state): State<CatalogState>,
    Path(name): Path<String>,
) -> (StatusCode, Json<Value>) {
    *state.hits.lock().unwrap() += 1;
    match state.listings.lock().unwrap().get(&name) {
        Some(body) => (StatusCode::OK, Json(body.clone())),
        None => (StatusCode::NOT_FOUND, Json(json!({"error": "unknown category"}))),
    }
}

async fn slow_handler() -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(3)).await;
    Json(listing(json!([{"id": "1", "name": "Late", "url": "/p/1"}])))
}

async fn server_error_handler() -> (StatusCode, Json<Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(listing(json!([{"id": "1", "name": "Shirt", "url": "/p/1"}]))),
    )
}

async fn user_agent_handler(headers: HeaderMap) -> Json<Value> {
    let ua = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    Json(listing(json!([{"id": "ua", "name": ua, "url": "/p/ua"}])))
}

/// One `sendMessage` call as received by the stub.
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub bot: String,
    pub chat_id: String,
    pub text: String,
    pub parse_mode: Option<String>,
    pub disable_web_page_preview: Option<String>,
    pub accepted: bool,
}

type Outbox = Arc<Mutex<Vec<SentMessage>>>;

/// Telegram Bot API stub recording every `sendMessage` call.
///
/// Requests for [`FAILING_CHAT`] are answered with HTTP 400.
pub struct TelegramStub {
    pub base: String,
    outbox: Outbox,
}

impl TelegramStub {
    pub async fn start() -> Self {
        let outbox: Outbox = Arc::new(Mutex::new(Vec::new()));
        let router = Router::new()
            .route("/{bot}/sendMessage", post(send_message_handler))
            .with_state(outbox.clone());
        Self {
            base: serve(router).await,
            outbox,
        }
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.outbox.lock().unwrap().clone()
    }

    pub fn accepted(&self) -> Vec<SentMessage> {
        self.sent().into_iter().filter(|m| m.accepted).collect()
    }
}

async fn send_message_handler(
    State(outbox): State<Outbox>,
    Path(bot): Path<String>,
    Form(form): Form<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    let chat_id = form.get("chat_id").cloned().unwrap_or_default();
    let accepted = chat_id != FAILING_CHAT;
    outbox.lock().unwrap().push(SentMessage {
        bot,
        chat_id,
        text: form.get("text").cloned().unwrap_or_default(),
        parse_mode: form.get("parse_mode").cloned(),
        disable_web_page_preview: form.get("disable_web_page_preview").cloned(),
        accepted,
    });

    if accepted {
        (StatusCode::OK, Json(json!({"ok": true})))
    } else {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({"ok": false, "description": "Bad Request: chat not found"})),
        )
    }
}
