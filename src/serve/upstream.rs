use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::http::{header, HeaderMap, HeaderValue};
use reqwest::StatusCode;
use serde_json::Value;

use super::payload::OutboundPayload;

pub struct UpstreamResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Anything that can deliver a payload to the agent runtime.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    async fn post(
        &self,
        url: &str,
        body: &OutboundPayload,
        headers: &HeaderMap,
        timeout: Duration,
    ) -> Result<UpstreamResponse>;
}

pub fn bearer_headers(token: &str) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    let auth_header = format!("Bearer {}", token);

    let value = HeaderValue::from_str(&auth_header)
        .context("upstream token is not a valid header value")?;
    headers.insert(header::AUTHORIZATION, value);

    Ok(headers)
}

// Non-JSON bodies are kept as a string, empty ones become null.
fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

#[derive(Clone, Default)]
pub struct ReqwestUpstream {
    client: reqwest::Client,
}

impl ReqwestUpstream {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl UpstreamClient for ReqwestUpstream {
    async fn post(
        &self,
        url: &str,
        body: &OutboundPayload,
        headers: &HeaderMap,
        timeout: Duration,
    ) -> Result<UpstreamResponse> {
        let res = self
            .client
            .post(url)
            .headers(headers.clone())
            .timeout(timeout)
            .json(body)
            .send()
            .await?;

        let status = res.status();
        let text = res.text().await?;

        Ok(UpstreamResponse {
            status,
            body: parse_body(&text),
        })
    }
}
