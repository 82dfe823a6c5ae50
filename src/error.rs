//! Error types for snapform.

/// Top-level error type for the engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Encoding error: {0}")]
    Encode(#[from] EncodeError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Pre-flight failures surfaced inline to the user. Never sent to the
/// backend; always reported to the event sink.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Email and image file are both required")]
    MissingInput { has_email: bool, has_file: bool },

    #[error("Email address is malformed: {email}")]
    MalformedEmail { email: String },

    #[error("Not an image file: {mime_type}")]
    NotAnImage { mime_type: String },

    #[error("File is too large: {size_bytes} bytes (limit {limit_bytes})")]
    TooLarge { size_bytes: u64, limit_bytes: u64 },

    #[error("An attempt is already in flight")]
    AttemptInFlight,
}

/// File read failures. Recoverable: the attempt fails, the selection
/// stays for a retry.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Transport-level failures: the exchange never completed. Failures the
/// backend reports in its reply are carried in `SubmissionOutcome`, not
/// here.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Request to {url} failed: {reason}")]
    RequestFailed { url: String, reason: String },

    #[error("Failed to read response body: {0}")]
    BodyRead(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for the engine.
pub type Result<T> = std::result::Result<T, Error>;
