use std::str::FromStr;
use std::time::Duration;

use crate::errors::AppError;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 5678;
const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const DEFAULT_MODEL: &str = "llama3.2";
const DEFAULT_MAX_TURNS: usize = 5;
const DEFAULT_AMAP_URL: &str = "https://restapi.amap.com";
const DEFAULT_IP_ECHO_URL: &str = "https://httpbin.org/ip";
pub const DEFAULT_TIMEZONE: &str = "Asia/Shanghai";
pub const DEFAULT_NEWLINE_PLACEHOLDER: &str = "<br>";
const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 10;
const DEFAULT_SWEEP_SECS: u64 = 60;

/// Process configuration, read once from the environment (and `.env`) at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub ollama_base_url: String,
    pub model: String,
    pub max_turns: usize,
    pub amap_key: String,
    pub amap_base_url: String,
    pub ip_echo_url: String,
    pub default_timezone: String,
    pub newline_placeholder: String,
    pub provider_timeout: Duration,
    /// `None` keeps sessions for the lifetime of the process.
    pub session_ttl: Option<Duration>,
    pub session_sweep_interval: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            ollama_base_url: DEFAULT_OLLAMA_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_turns: DEFAULT_MAX_TURNS,
            amap_key: String::new(),
            amap_base_url: DEFAULT_AMAP_URL.to_string(),
            ip_echo_url: DEFAULT_IP_ECHO_URL.to_string(),
            default_timezone: DEFAULT_TIMEZONE.to_string(),
            newline_placeholder: DEFAULT_NEWLINE_PLACEHOLDER.to_string(),
            provider_timeout: Duration::from_secs(DEFAULT_PROVIDER_TIMEOUT_SECS),
            session_ttl: None,
            session_sweep_interval: Duration::from_secs(DEFAULT_SWEEP_SECS),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so tests need not touch
    /// the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let string = |key: &str, default: String| lookup(key).unwrap_or(default);

        let session_ttl = parse::<u64>(&lookup, "SESSION_TTL_SECS")?
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        let session_sweep_interval = match parse::<u64>(&lookup, "SESSION_SWEEP_SECS")? {
            Some(0) => return Err(AppError::config("SESSION_SWEEP_SECS", "must be at least 1 second")),
            Some(secs) => Duration::from_secs(secs),
            None => defaults.session_sweep_interval,
        };

        Ok(Self {
            host: string("HOST", defaults.host),
            port: parse(&lookup, "PORT")?.unwrap_or(defaults.port),
            ollama_base_url: string("OLLAMA_API_BASE_URL", defaults.ollama_base_url),
            model: string("OLLAMA_MODEL", defaults.model),
            max_turns: parse(&lookup, "AGENT_MAX_TURNS")?.unwrap_or(defaults.max_turns),
            amap_key: string("AMAP_KEY", defaults.amap_key),
            amap_base_url: string("AMAP_BASE_URL", defaults.amap_base_url),
            ip_echo_url: string("IP_ECHO_URL", defaults.ip_echo_url),
            default_timezone: string("DEFAULT_TIMEZONE", defaults.default_timezone),
            newline_placeholder: string("NEWLINE_PLACEHOLDER", defaults.newline_placeholder),
            provider_timeout: parse(&lookup, "PROVIDER_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.provider_timeout),
            session_ttl,
            session_sweep_interval,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| AppError::config(key, e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, AppError> {
        let env: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let cfg = config_from(&[]).unwrap();
        assert_eq!(cfg.bind_addr(), "127.0.0.1:5678");
        assert_eq!(cfg.default_timezone, "Asia/Shanghai");
        assert_eq!(cfg.newline_placeholder, "<br>");
        assert_eq!(cfg.max_turns, 5);
        assert!(cfg.session_ttl.is_none());
    }

    #[test]
    fn overrides_are_applied() {
        let cfg = config_from(&[
            ("PORT", "9000"),
            ("OLLAMA_MODEL", "qwen2.5"),
            ("SESSION_TTL_SECS", "1800"),
            ("PROVIDER_TIMEOUT_SECS", "3"),
        ])
        .unwrap();
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.model, "qwen2.5");
        assert_eq!(cfg.session_ttl, Some(Duration::from_secs(1800)));
        assert_eq!(cfg.provider_timeout, Duration::from_secs(3));
    }

    #[test]
    fn zero_ttl_disables_eviction() {
        let cfg = config_from(&[("SESSION_TTL_SECS", "0")]).unwrap();
        assert!(cfg.session_ttl.is_none());
    }

    #[test]
    fn zero_sweep_interval_is_rejected() {
        let err = config_from(&[("SESSION_SWEEP_SECS", "0")]).unwrap_err();
        assert!(matches!(err, AppError::Config { ref key, .. } if key == "SESSION_SWEEP_SECS"));
        assert_eq!(
            config_from(&[("SESSION_SWEEP_SECS", "15")]).unwrap().session_sweep_interval,
            Duration::from_secs(15)
        );
    }

    #[test]
    fn malformed_number_is_a_config_error() {
        let err = config_from(&[("PORT", "eighty")]).unwrap_err();
        assert!(matches!(err, AppError::Config { ref key, .. } if key == "PORT"));
    }
}
