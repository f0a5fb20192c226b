//! Error types for Voiceline.

/// Top-level error type for the service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Handler error: {0}")]
    Handler(#[from] HandlerError),

    #[error("Call flow error: {0}")]
    Flow(#[from] FlowError),

    #[error("Markup error: {0}")]
    Markup(#[from] MarkupError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
}

/// Configuration-related errors. Fatal at startup: the process refuses to
/// serve without valid credentials.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A registered handler failed. Never propagated to the caller — dispatch
/// logs it and moves on to the next handler.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("Handler {name} failed: {reason}")]
    Failed { name: String, reason: String },
}

/// Call-flow state machine errors.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("Call {call_id} is in state {state}, cannot accept {event}")]
    InvalidState {
        call_id: String,
        state: String,
        event: String,
    },

    #[error("No active call with id {call_id}")]
    UnknownCall { call_id: String },

    #[error("Invalid webhook payload: {reason}")]
    InvalidEvent { reason: String },
}

/// A response plan violated a document invariant and was rejected before
/// transmission.
#[derive(Debug, thiserror::Error)]
pub enum MarkupError {
    #[error("Response plan is empty")]
    EmptyPlan,

    #[error("Response plan does not end in a gather, redirect, or hangup (last: {last})")]
    MissingTerminal { last: String },

    #[error("Spoken text exceeds maximum length: {length} > {max}")]
    SpeechTooLong { length: usize, max: usize },

    #[error("Malformed document: {0}")]
    Malformed(String),

    #[error("XML error: {0}")]
    Xml(String),
}

/// Provider configuration API errors, surfaced to the operator running the
/// webhook configurator. Not retried automatically.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Phone number {number} not found (available: {})", available.join(", "))]
    NumberNotFound {
        number: String,
        available: Vec<String>,
    },

    #[error("Number update rejected with status {status}: {body}")]
    UpdateRejected { status: u16, body: String },

    #[error("Provider API request failed: {0}")]
    Http(String),

    #[error("Invalid response from provider: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        ProviderError::Http(e.to_string())
    }
}

/// Result type alias for the service.
pub type Result<T> = std::result::Result<T, Error>;
