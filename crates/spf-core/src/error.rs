//! Error types for the SPF flattening system
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for flattening operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the SPF flattening system
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors (missing/malformed settings, fatal before any run)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A severity name outside the fixed set of eight
    #[error("Invalid severity level: {0}")]
    InvalidSeverity(String),

    /// Zone id resolution found zero or ambiguous matches
    #[error("No zone found using this api token for domain {zone}")]
    ZoneNotFound {
        /// Zone apex name
        zone: String,
    },

    /// More than one TXT record matched a name that must be unique
    #[error("Multiple SPF records found using {name} for domain {zone}")]
    AmbiguousRecord {
        /// Record name searched for
        name: String,
        /// Zone apex name
        zone: String,
    },

    /// Record creation rejected by the provider
    #[error("Problem creating record for {name}: {message}")]
    CreateFailed {
        /// Record name
        name: String,
        /// Provider-reported detail
        message: String,
    },

    /// Record update rejected by the provider, with every reported message
    #[error("Problem updating record for {name}: {}", messages.join(", "))]
    UpdateFailed {
        /// Record name
        name: String,
        /// Provider-reported error messages
        messages: Vec<String>,
    },

    /// DNS API transport or protocol error
    #[error("DNS API error: {0}")]
    Api(String),

    /// SPF splitting collaborator error
    #[error("Splitter error: {0}")]
    Splitter(String),

    /// One or more digest destinations failed to deliver during flush
    #[error("Digest flush failed for {} destination(s): {}", failures.len(), failures.join("; "))]
    DigestFlush {
        /// One message per failed destination
        failures: Vec<String>,
    },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a DNS API error
    pub fn api(msg: impl Into<String>) -> Self {
        Self::Api(msg.into())
    }

    /// Create a splitter error
    pub fn splitter(msg: impl Into<String>) -> Self {
        Self::Splitter(msg.into())
    }

    /// Create a zone-not-found error
    pub fn zone_not_found(zone: impl Into<String>) -> Self {
        Self::ZoneNotFound { zone: zone.into() }
    }

    /// Create an ambiguous-record error
    pub fn ambiguous_record(name: impl Into<String>, zone: impl Into<String>) -> Self {
        Self::AmbiguousRecord {
            name: name.into(),
            zone: zone.into(),
        }
    }

    /// True for errors that abort the current zone but carry provider detail
    pub fn is_record_write_failure(&self) -> bool {
        matches!(self, Self::CreateFailed { .. } | Self::UpdateFailed { .. })
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
