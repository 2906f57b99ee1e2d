use rig::completion::ToolDefinition;
use rig::tool::Tool;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error};

use crate::errors::ToolError;
use crate::providers::{AmapClient, IpEchoClient};

const DESCRIPTION: &str = "Get the user's current location: province and city, \
                           including the city name and its city code.";

/// Takes no arguments.
#[derive(Debug, Default, Deserialize)]
pub struct LocationArgs {}

/// Resolves the public IP, then geolocates it.
#[derive(Clone)]
pub struct LocationTool {
    ip_echo: IpEchoClient,
    amap: AmapClient,
}

impl LocationTool {
    pub fn new(ip_echo: IpEchoClient, amap: AmapClient) -> Self {
        Self { ip_echo, amap }
    }
}

impl Tool for LocationTool {
    const NAME: &'static str = "location_tool";
    type Error = ToolError;
    type Args = LocationArgs;
    type Output = String;

    async fn definition(&self, _prompt: String) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.to_string(),
            description: DESCRIPTION.to_string(),
            parameters: json!({ "type": "object", "properties": {} }),
        }
    }

    async fn call(&self, _args: Self::Args) -> Result<Self::Output, Self::Error> {
        let ip = self.ip_echo.outbound_ip().await.map_err(|e| {
            error!("Failed to resolve outbound IP: {e}");
            ToolError::lookup("Public IP", e)
        })?;
        debug!(%ip, "resolved outbound IP");

        let location = self.amap.locate_ip(&ip).await.map_err(|e| {
            error!("Failed to locate IP {ip}: {e}");
            ToolError::lookup("Location", e)
        })?;

        Ok(format!(
            "Current city: {}, city code: {}, province: {}",
            location.city, location.adcode, location.province
        ))
    }
}
