use reqwest::Url;
use serde::{
    de::{DeserializeOwned, Error},
    Deserialize, Deserializer,
};
use tracing::error;

/// Deserialize Vec from comma separated string, skipping blank entries
pub fn deserialize_comma_separated<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    Ok(s.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect())
}

/// Deserialize an optional http(s) base url. Blank is unset, trailing slashes are dropped.
pub fn deserialize_base_url<'de, D>(deserializer: D) -> Result<Option<Url>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    let trimmed = s.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Ok(None);
    }

    let url = Url::parse(trimmed).map_err(Error::custom)?;
    match url.scheme() {
        "http" | "https" => Ok(Some(url)),
        scheme => Err(Error::custom(format!(
            "base url must be http or https, got {}",
            scheme
        ))),
    }
}

/// Empty env vars count as unset.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Like `non_blank` but keeps the value exactly as given.
pub fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub fn get_app_config<T: DeserializeOwned>() -> T {
    match envy::from_env::<T>() {
        Ok(config) => config,
        Err(err) => {
            error!("failed to parse config: {}", err);
            std::process::exit(1);
        }
    }
}
