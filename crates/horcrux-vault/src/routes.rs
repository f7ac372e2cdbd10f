//! http surface of the vault
//!
//! - `/`        any method, handed to the shard handler
//! - `/health`  liveness
//! - `/info`    public identity of the hosted holder
//!
//! only `/health` and `/info` answer cross-origin requests.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Bytes,
    extract::State,
    http::{Method, StatusCode},
    routing::{any, get},
    Json, Router,
};
use horcrux::{Handler, Request, RequestParams};
use metrics::{counter, histogram};
use serde::Serialize;
use serde_json::Value;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// shared across requests, built once at startup
pub struct AppState {
    pub handler: Handler,
}

#[derive(Serialize)]
struct InfoResponse {
    version: &'static str,
    name: String,
    identifier: String,
}

pub fn router(state: Arc<AppState>) -> Router {
    let public = Router::new()
        .route("/health", get(health))
        .route("/info", get(info))
        .layer(CorsLayer::permissive());

    Router::new()
        .route("/", any(release_shard))
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn release_shard(
    State(state): State<Arc<AppState>>,
    method: Method,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    let start = Instant::now();

    // unparseable bodies are reported as missing
    let body = serde_json::from_slice::<RequestParams>(&body).ok();
    let response = state.handler.handle(Request {
        method: method.as_str().to_string(),
        body,
    });

    let status = response.status.to_string();
    counter!("vault_requests_total", "status" => status).increment(1);
    if response.status == 200 {
        counter!("vault_shards_released_total").increment(1);
    }
    histogram!("vault_request_duration_seconds").record(start.elapsed().as_secs_f64());

    let code = StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (code, Json(response.body))
}

async fn health() -> &'static str {
    "ok"
}

async fn info(State(state): State<Arc<AppState>>) -> Json<InfoResponse> {
    let public = state.handler.public_state();
    Json(InfoResponse {
        version: env!("CARGO_PKG_VERSION"),
        name: public.name.clone(),
        identifier: public.identifier.clone(),
    })
}
