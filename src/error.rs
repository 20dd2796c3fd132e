//! Error types for the vision analyzer.
//!
//! Each stage owns its own enum so that the session logic can tell a fatal
//! startup problem apart from a recoverable analysis failure. The `Display`
//! output of every variant is what ends up in front of the user.

use thiserror::Error;

/// Required environment values were absent or blank.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing vision credentials: {}", names.join(", "))]
    Missing { names: Vec<&'static str> },
}

/// The vision client could not be built from the given credentials.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Endpoint is not an absolute http(s) URL with a host
    #[error("Invalid vision endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    /// Key was blank
    #[error("Vision key is empty")]
    EmptyKey,

    #[error("Could not build HTTP client: {0}")]
    Http(String),
}

/// A single analysis round-trip failed.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Connection, TLS, or other transport failure
    #[error("request to vision service failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Service answered with a non-success status
    #[error("vision service returned {status}: {message}")]
    Status { status: u16, message: String },

    /// Response body did not match the expected shape
    #[error("could not read vision service response: {0}")]
    Decode(String),
}

/// The uploaded file could not be turned into a byte stream for the service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    #[error("no file was uploaded")]
    Empty,

    #[error("could not read upload: {0}")]
    Read(String),

    #[error("unsupported image format: {0} (only JPEG is accepted)")]
    Unsupported(String),

    #[error("could not decode image: {0}")]
    Decode(String),

    #[error("could not re-encode image: {0}")]
    Encode(String),
}
