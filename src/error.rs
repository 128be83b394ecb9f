//! Error types for Match Pilot.

use std::path::PathBuf;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
}

/// Configuration-related errors. All of them are fatal before the loop starts.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to read filter file {path}: {source}")]
    FilterRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse filter file {path}: {source}")]
    FilterParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Blank key in filter list {list} at position {index}")]
    BlankFilterKey { list: &'static str, index: usize },
}

/// Errors from the remote profile service or the identity provider.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Request to {service} failed: {reason}")]
    RequestFailed { service: String, reason: String },

    #[error("Authentication failed for {service}: {reason}")]
    AuthFailed { service: String, reason: String },

    #[error("Not authenticated with {service}")]
    NotAuthenticated { service: String },

    #[error("{service} returned HTTP {status}: {body}")]
    Status {
        service: String,
        status: u16,
        body: String,
    },

    #[error("Invalid response from {service}: {reason}")]
    InvalidResponse { service: String, reason: String },
}

/// Pipeline-related errors.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Invalid pipeline configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Action sink task failed: {0}")]
    SinkJoin(String),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
