use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use rig::completion::ToolDefinition;
use rig::tool::Tool;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::errors::{AppError, ToolError};

const DESCRIPTION: &str = "Get the user's current local date and time.";
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Default, Deserialize)]
pub struct TimeArgs {
    /// IANA zone name, e.g. `Europe/Berlin`. Empty means the default zone.
    #[serde(default)]
    pub time_zone: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TimeTool {
    default_zone: Tz,
}

impl TimeTool {
    pub fn new(default_zone: &str) -> Result<Self, AppError> {
        let default_zone = default_zone
            .parse::<Tz>()
            .map_err(|_| AppError::config("DEFAULT_TIMEZONE", format!("unknown time zone '{default_zone}'")))?;
        Ok(Self { default_zone })
    }

    fn format_at(&self, zone: Option<&str>, now: DateTime<Utc>) -> Result<String, ToolError> {
        let tz = match zone.map(str::trim).filter(|z| !z.is_empty()) {
            None => self.default_zone,
            Some(name) => name
                .parse::<Tz>()
                .map_err(|_| ToolError::InvalidTimezone { name: name.to_string() })?,
        };
        Ok(now.with_timezone(&tz).format(TIME_FORMAT).to_string())
    }
}

impl Tool for TimeTool {
    const NAME: &'static str = "time_tool";
    type Error = ToolError;
    type Args = TimeArgs;
    type Output = String;

    async fn definition(&self, _prompt: String) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.to_string(),
            description: DESCRIPTION.to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "time_zone": {
                        "type": "string",
                        "description": "IANA time zone of the user, e.g. Asia/Shanghai"
                    }
                }
            }),
        }
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        debug!(time_zone = ?args.time_zone, "time_tool called");
        self.format_at(args.time_zone.as_deref(), Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn tool() -> TimeTool {
        TimeTool::new("Asia/Shanghai").unwrap()
    }

    fn looks_like_timestamp(s: &str) -> bool {
        let b = s.as_bytes();
        b.len() == 19
            && b.iter().enumerate().all(|(i, c)| match i {
                4 | 7 => *c == b'-',
                10 => *c == b' ',
                13 | 16 => *c == b':',
                _ => c.is_ascii_digit(),
            })
    }

    #[test]
    fn missing_zone_uses_default() {
        let now = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(tool().format_at(None, now).unwrap(), "2026-01-02 11:04:05");
        assert_eq!(tool().format_at(Some("  "), now).unwrap(), "2026-01-02 11:04:05");
    }

    #[test]
    fn explicit_zone_is_honoured() {
        let now = Utc.with_ymd_and_hms(2026, 7, 1, 12, 0, 0).unwrap();
        assert_eq!(tool().format_at(Some("Europe/Berlin"), now).unwrap(), "2026-07-01 14:00:00");
    }

    #[test]
    fn unknown_zone_is_rejected() {
        let err = tool().format_at(Some("Atlantis/Capital"), Utc::now()).unwrap_err();
        assert!(matches!(err, ToolError::InvalidTimezone { ref name } if name == "Atlantis/Capital"));
    }

    #[tokio::test]
    async fn call_with_empty_args_returns_timestamp() {
        let args: TimeArgs = serde_json::from_str("{}").unwrap();
        let out = tool().call(args).await.unwrap();
        assert!(looks_like_timestamp(&out), "unexpected output {out}");
    }

    #[tokio::test]
    async fn definition_names_the_tool() {
        let def = tool().definition(String::new()).await;
        assert_eq!(def.name, "time_tool");
        assert!(def.parameters["properties"]["time_zone"].is_object());
    }
}
