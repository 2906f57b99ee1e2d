use thiserror::Error;

/// Startup-time failures. Any of these means the process cannot serve requests.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid configuration value for {key}: {message}")]
    Config { key: String, message: String },

    #[error("Failed to build {client} client: {message}")]
    ClientBuild { client: String, message: String },
}

impl AppError {
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Config { key: key.into(), message: message.into() }
    }
}

/// Failures talking to an external data provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Provider at {url} answered with HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("Provider reported failure status '{status}': {info}")]
    ProviderStatus { status: String, info: String },

    #[error("Unexpected provider response: {0}")]
    Schema(String),
}

/// Errors a tool hands back to the agent. They become tool-result messages,
/// never HTTP failures of the chat endpoint.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown time zone '{name}'")]
    InvalidTimezone { name: String },

    #[error("Argument '{field}' must be between {min} and {max} (got {value})")]
    ArgumentOutOfRange { field: String, value: i64, min: i64, max: i64 },

    #[error("{what} lookup failed: {source}")]
    LookupFailed {
        what: String,
        #[source]
        source: ProviderError,
    },
}

impl ToolError {
    pub fn lookup(what: impl Into<String>, source: ProviderError) -> Self {
        ToolError::LookupFailed { what: what.into(), source }
    }
}

/// Failures reported by the agent runner's own event stream.
#[derive(Debug, Clone, Error)]
pub enum AgentError {
    #[error("Model service unavailable at {host}")]
    Unavailable { host: String },

    #[error("Inference error: {message}")]
    Inference { message: String },
}
