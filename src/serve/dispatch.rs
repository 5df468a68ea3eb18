use std::time::Duration;

use axum::http::HeaderMap;
use reqwest::{StatusCode, Url};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{error::ApiError, payload::OutboundPayload, upstream::UpstreamClient};

pub const AGENT_ID_PLACEHOLDER: &str = ":id";

/// Outcome of one candidate, kept for the failure report.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct AttemptResult {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug)]
pub struct Delivered {
    pub url: String,
    pub status: StatusCode,
    pub body: Value,
}

#[derive(Debug)]
pub enum DispatchFailure {
    Exhausted(Vec<AttemptResult>),
    Rejected(Vec<AttemptResult>),
}

impl From<DispatchFailure> for ApiError {
    fn from(failure: DispatchFailure) -> Self {
        match failure {
            DispatchFailure::Exhausted(attempts) => ApiError::UpstreamUnavailable(attempts),
            DispatchFailure::Rejected(attempts) => ApiError::UpstreamAuth(attempts),
        }
    }
}

/// Expands path templates into full urls, in order.
///
/// Each template segment equal to `:id` becomes the agent id, percent-encoded
/// as a single segment so it can never leave the template's path.
pub fn candidate_urls(base_url: &Url, paths: &[String], agent_id: &str) -> Vec<String> {
    paths
        .iter()
        .map(|template| {
            let mut url = base_url.clone();
            // http(s) urls always have path segments
            if let Ok(mut segments) = url.path_segments_mut() {
                segments.pop_if_empty();
                for segment in template.split('/').filter(|s| !s.is_empty()) {
                    if segment == AGENT_ID_PLACEHOLDER {
                        segments.push(agent_id);
                    } else {
                        segments.push(segment);
                    }
                }
            }
            url.to_string()
        })
        .collect()
}

/// Tries each url in turn until one answers 2xx.
///
/// Upstream 401/403 ends the loop early since every other path would be
/// refused with the same token. Any other failure moves on to the next url.
pub async fn dispatch(
    client: &dyn UpstreamClient,
    urls: &[String],
    payload: &OutboundPayload,
    headers: &HeaderMap,
    timeout: Duration,
) -> Result<Delivered, DispatchFailure> {
    let mut attempts = Vec::with_capacity(urls.len());

    for (index, url) in urls.iter().enumerate() {
        debug!(attempt = index, %url, "posting maintenance request upstream");

        match client.post(url, payload, headers, timeout).await {
            Ok(res) if res.status.is_success() => {
                info!(attempt = index, %url, status = %res.status, "upstream accepted");
                return Ok(Delivered {
                    url: url.clone(),
                    status: res.status,
                    body: res.body,
                });
            }
            Ok(res) => {
                warn!(
                    attempt = index,
                    %url,
                    status = %res.status,
                    "upstream returned error status"
                );
                let status = res.status;
                attempts.push(AttemptResult {
                    url: url.clone(),
                    status: Some(status.as_u16()),
                    data: Some(res.body),
                    error: None,
                });
                if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                    return Err(DispatchFailure::Rejected(attempts));
                }
            }
            Err(err) => {
                warn!(attempt = index, %url, %err, "upstream request failed");
                attempts.push(AttemptResult {
                    url: url.clone(),
                    status: None,
                    data: None,
                    error: Some(format!("{:#}", err)),
                });
            }
        }
    }

    Err(DispatchFailure::Exhausted(attempts))
}
