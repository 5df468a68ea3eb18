use anyhow::Result;
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{net::SocketAddr, sync::Arc};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

mod dispatch;
mod env;
mod error;
mod maintenance;
mod payload;
mod upstream;

pub use dispatch::AttemptResult;
pub use env::{AppConfig, BodyStyle};
pub use error::ApiError;
pub use payload::OutboundPayload;
pub use upstream::{ReqwestUpstream, UpstreamClient, UpstreamResponse};

pub type ApiResponse<T> = Result<Json<T>, ApiError>;

#[derive(Clone)]
pub struct AppState {
    config: Arc<AppConfig>,
    upstream: Arc<dyn UpstreamClient>,
}

impl AppState {
    pub fn new(config: AppConfig, upstream: Arc<dyn UpstreamClient>) -> Self {
        Self {
            config: Arc::new(config),
            upstream,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/maintenance", post(maintenance::maintenance))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn start_server() -> Result<()> {
    crate::log::init();

    let config = AppConfig::from_env();

    if !config.auth_enabled() {
        warn!("API_KEY is empty, /maintenance accepts unauthenticated requests");
    }
    let missing = config.missing_upstream_config();
    if !missing.is_empty() {
        warn!(?missing, "upstream not configured, maintenance requests will fail");
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let app = router(AppState::new(config, Arc::new(ReqwestUpstream::new())));

    info!("listening on {}", addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthBody {
    ok: bool,
    ts: DateTime<Utc>,
    mode: &'static str,
    has_base_url: bool,
    has_token: bool,
    agent: Option<String>,
    body_style: String,
    auth_enabled: bool,
    validate_instruction: bool,
    paths: usize,
}

async fn health(State(state): State<AppState>) -> Json<HealthBody> {
    let config = &state.config;
    Json(HealthBody {
        ok: true,
        ts: Utc::now(),
        mode: "maintenance",
        has_base_url: config.base_url.is_some(),
        has_token: config.upstream_token.is_some(),
        agent: config.default_agent_id.clone(),
        body_style: config.body_style.to_string(),
        auth_enabled: config.auth_enabled(),
        validate_instruction: config.validate_instruction,
        paths: config.paths.len(),
    })
}
