use serde::Deserialize;
use tracing::warn;

use crate::errors::ProviderError;
use crate::providers::http::{get_json, lenient_string};

const IP_PATH: &str = "/v3/ip";
const WEATHER_PATH: &str = "/v3/weather/weatherInfo";

#[derive(Debug, Clone, Deserialize)]
pub struct IpLocation {
    #[serde(default, deserialize_with = "lenient_string")]
    pub province: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub city: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub adcode: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LiveWeather {
    #[serde(default)]
    pub weather: String,
    #[serde(default)]
    pub temperature: String,
    #[serde(default)]
    pub humidity: String,
    #[serde(default, rename = "windpower")]
    pub wind_power: String,
    #[serde(default, rename = "winddirection")]
    pub wind_direction: String,
}

/// One day of a forecast; AMap lists today first, then the next three days.
#[derive(Debug, Clone, Deserialize)]
pub struct DailyCast {
    #[serde(default)]
    pub date: String,
    #[serde(default, rename = "dayweather")]
    pub day_weather: String,
    #[serde(default, rename = "daytemp")]
    pub day_temperature: String,
    #[serde(default, rename = "daywind")]
    pub day_wind_direction: String,
    #[serde(default, rename = "daypower")]
    pub day_wind_power: String,
    #[serde(default, rename = "nightweather")]
    pub night_weather: String,
    #[serde(default, rename = "nighttemp")]
    pub night_temperature: String,
    #[serde(default, rename = "nightwind")]
    pub night_wind_direction: String,
    #[serde(default, rename = "nightpower")]
    pub night_wind_power: String,
}

#[derive(Debug, Deserialize)]
struct Forecast {
    #[serde(default)]
    casts: Vec<DailyCast>,
}

#[derive(Debug, Deserialize)]
struct IpResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    info: String,
    #[serde(flatten)]
    location: IpLocation,
}

#[derive(Debug, Deserialize)]
struct WeatherResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    info: String,
    #[serde(default)]
    lives: Vec<LiveWeather>,
    #[serde(default)]
    forecasts: Vec<Forecast>,
}

fn check_status(status: &str, info: &str) -> Result<(), ProviderError> {
    if status == "1" {
        return Ok(());
    }
    warn!(status, info, "AMap reported failure");
    Err(ProviderError::ProviderStatus { status: status.to_string(), info: info.to_string() })
}

/// AMap (restapi.amap.com) web service: IP location and weather.
///
/// Every response carries `status`, `"1"` meaning success, and an `info`
/// string describing the failure otherwise.
#[derive(Clone)]
pub struct AmapClient {
    http: reqwest::Client,
    base_url: String,
    key: String,
}

impl AmapClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            key: key.into(),
        }
    }

    pub async fn locate_ip(&self, ip: &str) -> Result<IpLocation, ProviderError> {
        let url = format!("{}{IP_PATH}", self.base_url);
        let resp: IpResponse = get_json(&self.http, &url, &[("key", self.key.as_str()), ("ip", ip)]).await?;
        check_status(&resp.status, &resp.info)?;
        Ok(resp.location)
    }

    /// Current conditions for `city_code`.
    pub async fn live_weather(&self, city_code: &str) -> Result<LiveWeather, ProviderError> {
        let resp = self.weather(city_code, false).await?;
        resp.lives
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Schema(format!("no live weather for city {city_code}")))
    }

    /// Forecast days for `city_code`, today first.
    pub async fn forecast(&self, city_code: &str) -> Result<Vec<DailyCast>, ProviderError> {
        let resp = self.weather(city_code, true).await?;
        resp.forecasts
            .into_iter()
            .next()
            .map(|f| f.casts)
            .ok_or_else(|| ProviderError::Schema(format!("no forecast for city {city_code}")))
    }

    async fn weather(&self, city_code: &str, all: bool) -> Result<WeatherResponse, ProviderError> {
        let url = format!("{}{WEATHER_PATH}", self.base_url);
        let mut query = vec![("key", self.key.as_str()), ("city", city_code)];
        if all {
            query.push(("extensions", "all"));
        }
        let resp: WeatherResponse = get_json(&self.http, &url, &query).await?;
        check_status(&resp.status, &resp.info)?;
        Ok(resp)
    }
}
