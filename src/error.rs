use std::path::PathBuf;
use std::time::Duration;

/// Errors related to configuration loading and parsing.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config at {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Environment variable {var} must be set for model '{model}'")]
    MissingApiKey { var: String, model: String },

    #[error("Invalid config value for {key}: {message}")]
    Invalid { key: String, message: String },
}

/// Errors raised while obtaining an OAuth token from the browser redirect.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Failed to load OAuth client credentials from {path}: {message}")]
    Credentials { path: PathBuf, message: String },

    #[error("Failed to bind redirect listener on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid authorization URL: {0}")]
    AuthUrl(String),

    #[error("Redirect listener closed before an authorization code arrived")]
    ChannelClosed,

    #[error("No authorization code received within {0:?}")]
    RedirectTimeout(Duration),

    #[error("Token exchange failed: {0}")]
    TokenExchange(String),
}

/// Argument validation failures. These never reach the calendar backend; they
/// are reported back to the model as tool errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("unknown function call: {0}")]
    UnknownTool(String),

    #[error("{tool}: arguments must be a JSON object, got {got}")]
    NotAnObject { tool: String, got: String },

    #[error("{tool}: missing required argument '{name}'")]
    MissingArgument { tool: String, name: String },

    #[error("{tool}: invalid type for '{name}': expected {expected}, got {got}")]
    TypeMismatch {
        tool: String,
        name: String,
        expected: String,
        got: String,
    },

    #[error("{tool}: '{name}' must be >= {minimum}, got {value}")]
    BelowMinimum {
        tool: String,
        name: String,
        minimum: i64,
        value: i64,
    },

    #[error("{tool}: {message}")]
    InvalidRange { tool: String, message: String },
}

/// Errors from the calendar backend.
#[derive(Debug, thiserror::Error)]
pub enum CalendarError {
    #[error("Calendar request failed: {0}")]
    Transport(String),

    #[error("Calendar API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Failed to decode calendar response: {0}")]
    Decode(String),
}

/// Errors talking to the language model.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("LLM error: {0}")]
    Transport(String),

    #[error("LLM stream ended without a response: {0}")]
    Stream(String),

    #[error("LLM did not respond within {0:?}")]
    Timeout(Duration),
}

/// Errors that end a dispatch turn.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("unknown function call: {0}")]
    UnknownFunction(String),

    #[error("Model requested more than {limit} rounds of tool calls in one turn")]
    ToolRoundLimit { limit: usize },
}

impl DispatchError {
    /// Whether the session can no longer continue after this error.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, DispatchError::ToolRoundLimit { .. })
    }
}

/// Errors from the MCP clock server.
#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("Failed to bind MCP server on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("MCP server failed: {0}")]
    Io(#[from] std::io::Error),
}
