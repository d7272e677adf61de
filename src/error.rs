//! Error types for ergast-extract
//!
//! The variants follow the failure taxonomy of the extraction loop:
//! - Transport failures (non-200 status, network errors)
//! - Protocol violations in the pagination metadata
//! - Decoding failures of a page body
//! - Configuration mistakes made by the caller
//!
//! Transport, protocol and decoding errors are contained by the collector: they end the
//! current collection but never discard rows already gathered.

use thiserror::Error;

/// Result type alias for ergast-extract operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for ergast-extract
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "base_url")
        key: Option<String>,
    },

    /// The caller asked for a page encoding that has no normalizer
    #[error("unsupported encoding: {0} (expected json or xml)")]
    UnsupportedEncoding(String),

    /// Server answered with a status other than 200
    #[error("HTTP {status} from {url}")]
    Transport {
        /// HTTP status code returned by the server
        status: u16,
        /// Request URL including the pagination query
        url: String,
        /// Response body, kept for diagnostics
        body: String,
    },

    /// Network error (connect failure, timeout, broken body)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Pagination metadata is missing, degenerate or contradicts an earlier page
    #[error("protocol error from {url}: {reason}")]
    Protocol {
        /// Request URL of the offending page
        url: String,
        /// What was wrong with the metadata
        reason: String,
    },

    /// Page body does not parse as its declared encoding
    #[error("decoding error from {url}: {reason}")]
    Decode {
        /// Request URL of the offending page
        url: String,
        /// Parser message
        reason: String,
    },

    /// Collection was cancelled before the next fetch
    #[error("collection cancelled")]
    Cancelled,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV writer error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for a configuration error tied to a config key
    pub fn config(key: &str, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }

    /// Machine-readable error kind, used in log fields and failure reports
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Config { .. } | Error::UnsupportedEncoding(_) => "config",
            Error::Transport { .. } | Error::Network(_) => "transport",
            Error::Protocol { .. } => "protocol",
            Error::Decode { .. } => "decode",
            Error::Cancelled => "cancelled",
            Error::Io(_) => "io",
            Error::Csv(_) => "csv",
            Error::Serialization(_) => "serialization",
        }
    }

    /// Returns true for errors that indicate a caller mistake rather than a runtime condition
    pub fn is_config(&self) -> bool {
        self.kind() == "config"
    }

    /// HTTP status carried by a transport error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Transport { status, .. } => Some(*status),
            Error::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
