use rig::completion::ToolDefinition;
use rig::tool::Tool;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error};

use crate::errors::{ProviderError, ToolError};
use crate::providers::amap::{DailyCast, LiveWeather};
use crate::providers::AmapClient;

const DESCRIPTION: &str = "Get weather data (conditions, temperature, wind power and direction). \
                           Returns either the live conditions right now or the forecast for \
                           today and the next three days.";
const DAY_DESCRIPTION: &str = "0 for live conditions right now, 1 for today's forecast, \
                               2 for tomorrow, 3 for the day after tomorrow, 4 for three days \
                               from now. Never more than 4.";
const MAX_DAY: i64 = 4;

#[derive(Debug, Deserialize)]
pub struct WeatherArgs {
    pub city_code: String,
    pub day: i64,
}

/// Which report a validated `day` argument selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForecastDay {
    Live,
    /// Index into the forecast list, today being 0.
    Forecast(usize),
}

impl TryFrom<i64> for ForecastDay {
    type Error = ToolError;

    fn try_from(day: i64) -> Result<Self, Self::Error> {
        match day {
            0 => Ok(ForecastDay::Live),
            1..=MAX_DAY => Ok(ForecastDay::Forecast((day - 1) as usize)),
            _ => Err(ToolError::ArgumentOutOfRange {
                field: "day".to_string(),
                value: day,
                min: 0,
                max: MAX_DAY,
            }),
        }
    }
}

#[derive(Clone)]
pub struct WeatherTool {
    amap: AmapClient,
}

impl WeatherTool {
    pub fn new(amap: AmapClient) -> Self {
        Self { amap }
    }

    async fn report(&self, city_code: &str, day: ForecastDay) -> Result<String, ProviderError> {
        match day {
            ForecastDay::Live => {
                let live = self.amap.live_weather(city_code).await?;
                Ok(describe_live(&live))
            }
            ForecastDay::Forecast(index) => {
                let casts = self.amap.forecast(city_code).await?;
                let cast = casts.get(index).ok_or_else(|| {
                    ProviderError::Schema(format!(
                        "forecast for city {city_code} has {} days, wanted index {index}",
                        casts.len()
                    ))
                })?;
                Ok(describe_cast(cast))
            }
        }
    }
}

fn describe_live(live: &LiveWeather) -> String {
    format!(
        "Current weather: {}, temperature {}℃, humidity {}%, wind power {}, wind direction {}",
        live.weather, live.temperature, live.humidity, live.wind_power, live.wind_direction
    )
}

fn describe_cast(cast: &DailyCast) -> String {
    format!(
        "{} daytime: {}, temperature {}℃, wind power {}, wind direction {}; \
         night: {}, temperature {}℃, wind power {}, wind direction {}",
        cast.date,
        cast.day_weather,
        cast.day_temperature,
        cast.day_wind_power,
        cast.day_wind_direction,
        cast.night_weather,
        cast.night_temperature,
        cast.night_wind_power,
        cast.night_wind_direction
    )
}

impl Tool for WeatherTool {
    const NAME: &'static str = "weather_tool";
    type Error = ToolError;
    type Args = WeatherArgs;
    type Output = String;

    async fn definition(&self, _prompt: String) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.to_string(),
            description: DESCRIPTION.to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "city_code": {
                        "type": "string",
                        "description": "City code (adcode) of the city"
                    },
                    "day": {
                        "type": "integer",
                        "enum": [0, 1, 2, 3, 4],
                        "description": DAY_DESCRIPTION
                    }
                },
                "required": ["city_code", "day"]
            }),
        }
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        let day = ForecastDay::try_from(args.day)?;
        debug!(city_code = %args.city_code, ?day, "weather_tool called");

        self.report(&args.city_code, day).await.map_err(|e| {
            error!("Weather lookup for {} failed: {e}", args.city_code);
            ToolError::lookup("Weather", e)
        })
    }
}
