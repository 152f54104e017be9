//! Error types for the range refresher
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for range operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the range refresher
#[derive(Error, Debug)]
pub enum Error {
    /// The TXT lookup itself failed (network, NXDOMAIN, resolver setup)
    #[error("TXT lookup for {hostname} failed: {message}")]
    Resolution {
        /// Hostname that was queried
        hostname: String,
        /// Resolver-provided reason
        message: String,
    },

    /// A candidate `ip4:`/`ip6:` token was not valid CIDR
    #[error("invalid CIDR expression {token:?}: {message}")]
    Parse {
        /// The offending expression (after the `ipN:` marker)
        token: String,
        /// Parser-provided reason
        message: String,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid lifecycle transition (e.g. starting a stopped refresher)
    #[error("Lifecycle error: {0}")]
    Lifecycle(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a resolution error
    pub fn resolution(hostname: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Resolution {
            hostname: hostname.into(),
            message: message.into(),
        }
    }

    /// Create a CIDR parse error
    pub fn parse(token: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            token: token.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a lifecycle error
    pub fn lifecycle(msg: impl Into<String>) -> Self {
        Self::Lifecycle(msg.into())
    }

    /// Whether the failure is expected to clear up on its own
    ///
    /// Resolution failures are transient; a parse failure means the upstream
    /// record format changed and will keep failing until it changes back.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Resolution { .. })
    }
}
