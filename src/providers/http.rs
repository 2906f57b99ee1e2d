use std::time::Duration;

use reqwest::StatusCode;
use serde::de::{DeserializeOwned, Deserializer};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::errors::{AppError, ProviderError};

/// Shared client for every data provider. Built once at startup.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client, AppError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AppError::ClientBuild { client: "provider HTTP".to_string(), message: e.to_string() })
}

/// Plain GET returning a decoded JSON body. Anything but `200 OK` is a failure.
///
/// `query` is kept out of error messages since it may carry an API key.
pub async fn get_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    query: &[(&str, &str)],
) -> Result<T, ProviderError> {
    debug!(url, "provider request");
    let response = client
        .get(url)
        .query(query)
        .send()
        .await
        .map_err(|e| ProviderError::Transport { url: url.to_string(), source: e.without_url() })?;

    let status = response.status();
    if status != StatusCode::OK {
        warn!(url, %status, "provider returned non-200 status");
        return Err(ProviderError::HttpStatus { url: url.to_string(), status: status.as_u16() });
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| ProviderError::Transport { url: url.to_string(), source: e.without_url() })?;

    serde_json::from_slice(&body).map_err(|e| ProviderError::Schema(e.to_string()))
}

/// Some providers send `[]` instead of a string for fields they cannot fill.
pub fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Loose {
        Text(String),
        Other(serde_json::Value),
    }

    Ok(match Loose::deserialize(deserializer)? {
        Loose::Text(s) => s,
        Loose::Other(_) => String::new(),
    })
}
