use serde::Deserialize;

use crate::errors::ProviderError;
use crate::providers::http::get_json;

#[derive(Debug, Deserialize)]
struct IpEcho {
    #[serde(default)]
    origin: String,
}

/// Asks an httpbin-style echo service which public IP our requests come from.
#[derive(Clone)]
pub struct IpEchoClient {
    http: reqwest::Client,
    url: String,
}

impl IpEchoClient {
    pub fn new(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self { http, url: url.into() }
    }

    pub async fn outbound_ip(&self) -> Result<String, ProviderError> {
        let echo: IpEcho = get_json(&self.http, &self.url, &[]).await?;
        // Behind proxies the echo is "client, proxy1, ...".
        let ip = echo.origin.split(',').next().unwrap_or_default().trim();
        if ip.is_empty() {
            return Err(ProviderError::Schema("IP echo response has no origin".to_string()));
        }
        Ok(ip.to_string())
    }
}
