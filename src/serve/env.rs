use std::{fmt, num::NonZeroU64, str, time::Duration};

use reqwest::Url;
use serde::Deserialize;
use serde_with::{serde_as, NoneAsEmptyString};

use crate::env::{
    deserialize_base_url, deserialize_comma_separated, get_app_config, non_blank, present,
};

pub const DEFAULT_INSTRUCTION: &str = "Nightly rethink & cleanup";

pub const DEFAULT_PATHS: [&str; 4] = [
    "/v1/agents/:id/messages",
    "/v1/agents/:id/send_message",
    "/api/agents/:id/messages",
    "/agents/:id/messages",
];

/// Shape of the JSON body sent upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyStyle {
    /// Envelope with a nested `message` object.
    #[default]
    Message,
    /// Flat `{text, agent_id}`.
    Text,
}

impl fmt::Display for BodyStyle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let str = match &self {
            BodyStyle::Message => "message",
            BodyStyle::Text => "text",
        };
        write!(f, "{}", str)
    }
}

impl str::FromStr for BodyStyle {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "message" | "envelope" | "a" => Ok(BodyStyle::Message),
            "text" | "flat" | "b" => Ok(BodyStyle::Text),
            _ => Err(format!("invalid body style: {}", s)),
        }
    }
}

fn default_port() -> u16 {
    3000
}

const DEFAULT_TIMEOUT: Duration = Duration::from_millis(15_000);

#[serde_as]
#[derive(Deserialize)]
struct EnvConfig {
    #[serde(default = "default_port")]
    port: u16,
    api_key: Option<String>,
    sleep_agent_id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_base_url")]
    letta_base_url: Option<Url>,
    letta_token: Option<String>,
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    call_body_style: Option<BodyStyle>,
    /// Older deployments select the body style through this one.
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    letta_mode: Option<BodyStyle>,
    #[serde(default, deserialize_with = "deserialize_comma_separated")]
    letta_paths: Vec<String>,
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    letta_timeout_ms: Option<NonZeroU64>,
    #[serde(default)]
    validate_instruction: bool,
    default_instruction: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    /// `None` disables caller auth. Compared exactly as configured.
    pub api_key: Option<String>,
    pub default_agent_id: Option<String>,
    pub base_url: Option<Url>,
    pub upstream_token: Option<String>,
    pub body_style: BodyStyle,
    pub paths: Vec<String>,
    pub timeout: Duration,
    pub validate_instruction: bool,
    pub default_instruction: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            api_key: None,
            default_agent_id: None,
            base_url: None,
            upstream_token: None,
            body_style: BodyStyle::default(),
            paths: DEFAULT_PATHS.iter().map(|p| p.to_string()).collect(),
            timeout: DEFAULT_TIMEOUT,
            validate_instruction: false,
            default_instruction: DEFAULT_INSTRUCTION.to_string(),
        }
    }
}

impl From<EnvConfig> for AppConfig {
    fn from(env: EnvConfig) -> Self {
        let paths = if env.letta_paths.is_empty() {
            DEFAULT_PATHS.iter().map(|p| p.to_string()).collect()
        } else {
            env.letta_paths
        };

        Self {
            port: env.port,
            api_key: present(env.api_key),
            default_agent_id: non_blank(env.sleep_agent_id),
            base_url: env.letta_base_url,
            upstream_token: non_blank(env.letta_token),
            body_style: env.call_body_style.or(env.letta_mode).unwrap_or_default(),
            paths,
            timeout: env
                .letta_timeout_ms
                .map(|ms| Duration::from_millis(ms.get()))
                .unwrap_or(DEFAULT_TIMEOUT),
            validate_instruction: env.validate_instruction,
            default_instruction: non_blank(env.default_instruction)
                .unwrap_or_else(|| DEFAULT_INSTRUCTION.to_string()),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        get_app_config::<EnvConfig>().into()
    }

    pub fn from_vars<I>(vars: I) -> Result<Self, envy::Error>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::from_iter::<_, EnvConfig>(vars).map(Into::into)
    }

    pub fn auth_enabled(&self) -> bool {
        self.api_key.is_some()
    }

    /// Names of the upstream variables that still need to be set.
    pub fn missing_upstream_config(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.base_url.is_none() {
            missing.push("LETTA_BASE_URL");
        }
        if self.upstream_token.is_none() {
            missing.push("LETTA_TOKEN");
        }
        missing
    }
}
