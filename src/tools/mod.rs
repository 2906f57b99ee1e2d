pub mod location;
pub mod time;
pub mod weather;

pub use location::LocationTool;
pub use time::TimeTool;
pub use weather::WeatherTool;

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::providers::http::build_client;
use crate::providers::{AmapClient, IpEchoClient};

/// The three tools, constructed once at startup and handed to the agent. Each
/// one is a [`rig::tool::Tool`] with an explicit JSON schema and a typed
/// argument struct, so malformed arguments are rejected before any provider
/// is contacted.
#[derive(Clone)]
pub struct ToolSet {
    pub time: TimeTool,
    pub location: LocationTool,
    pub weather: WeatherTool,
}

impl ToolSet {
    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let http = build_client(config.provider_timeout)?;
        let amap = AmapClient::new(http.clone(), &config.amap_base_url, &config.amap_key);
        let ip_echo = IpEchoClient::new(http, &config.ip_echo_url);

        Ok(Self {
            time: TimeTool::new(&config.default_timezone)?,
            location: LocationTool::new(ip_echo, amap.clone()),
            weather: WeatherTool::new(amap),
        })
    }
}
