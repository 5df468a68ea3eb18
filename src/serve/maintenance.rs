use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info};

use crate::env::present;

use super::{
    dispatch::{candidate_urls, dispatch},
    env::AppConfig,
    error::ApiError,
    payload::OutboundPayload,
    upstream::bearer_headers,
    ApiResponse, AppState,
};

const KNOWN_INSTRUCTIONS: [&str; 2] = ["rethink", "cleanup"];

#[derive(Deserialize, Default, Debug)]
pub struct MaintenanceRequest {
    instruction: Option<String>,
    agent_id: Option<String>,
}

#[derive(Serialize)]
pub struct Forwarded {
    agent_id: String,
    instruction: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceBody {
    ok: bool,
    forwarded: Forwarded,
    upstream: Value,
    upstream_status: u16,
    url: String,
}

fn authorize(config: &AppConfig, headers: &HeaderMap) -> Result<(), ApiError> {
    let api_key = match &config.api_key {
        Some(api_key) => api_key,
        None => return Ok(()),
    };

    let supplied = headers
        .get(header::AUTHORIZATION)
        .ok_or(ApiError::Unauthorized)?;

    if supplied.as_bytes() == format!("Bearer {}", api_key).as_bytes() {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}

// An empty body means "use the defaults".
fn parse_request(body: &[u8]) -> Result<MaintenanceRequest, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(MaintenanceRequest::default());
    }
    serde_json::from_slice(body)
        .map_err(|err| ApiError::BadRequest(format!("invalid request body: {}", err)))
}

// `.`/`..` would be dropped by url path handling and control characters stripped.
fn validate_agent_id(agent_id: &str) -> Result<(), ApiError> {
    if agent_id == "." || agent_id == ".." || agent_id.chars().any(char::is_control) {
        Err(ApiError::BadRequest("invalid agent id".to_string()))
    } else {
        Ok(())
    }
}

fn validate_instruction(instruction: &str) -> Result<(), ApiError> {
    let lowercase = instruction.to_lowercase();
    if KNOWN_INSTRUCTIONS
        .iter()
        .any(|known| lowercase.contains(known))
    {
        Ok(())
    } else {
        Err(ApiError::BadRequest("unknown instruction".to_string()))
    }
}

pub async fn maintenance(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResponse<MaintenanceBody> {
    let config = &state.config;

    authorize(config, &headers)?;

    let (base_url, token) = match (&config.base_url, &config.upstream_token) {
        (Some(base_url), Some(token)) => (base_url, token),
        _ => {
            let missing = config.missing_upstream_config().join(", ");
            error!(%missing, "upstream not configured");
            return Err(ApiError::Configuration(format!(
                "missing configuration: {}",
                missing
            )));
        }
    };

    let request = parse_request(&body)?;

    let agent_id = present(request.agent_id)
        .or_else(|| config.default_agent_id.clone())
        .ok_or_else(|| ApiError::BadRequest("missing agent id".to_string()))?;
    validate_agent_id(&agent_id)?;

    let supplied_instruction = present(request.instruction);
    if config.validate_instruction {
        if let Some(instruction) = &supplied_instruction {
            validate_instruction(instruction)?;
        }
    }
    let instruction = supplied_instruction.unwrap_or_else(|| config.default_instruction.clone());

    info!(%agent_id, %instruction, "maintenance instruction received");

    let payload = OutboundPayload::new(config.body_style, &instruction, &agent_id);
    let upstream_headers =
        bearer_headers(token).map_err(|err| ApiError::Configuration(format!("{:#}", err)))?;
    let urls = candidate_urls(base_url, &config.paths, &agent_id);

    let delivered = dispatch(
        state.upstream.as_ref(),
        &urls,
        &payload,
        &upstream_headers,
        config.timeout,
    )
    .await
    .map_err(|failure| {
        error!(%agent_id, ?failure, "failed to forward maintenance request");
        ApiError::from(failure)
    })?;

    Ok(Json(MaintenanceBody {
        ok: true,
        forwarded: Forwarded {
            agent_id,
            instruction,
        },
        upstream: delivered.body,
        upstream_status: delivered.status.as_u16(),
        url: delivered.url,
    }))
}
