//! Error taxonomy of the update engine.
//!
//! Every variant degrades to "keep the last good state and retry on the next
//! tick"; none of them is fatal to the process.

use std::fmt;

use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Error, Debug)]
pub enum EngineError {
    /// Network or transport failure while talking to a feed
    #[error("Fetch error for {url}: {message}")]
    Fetch { url: String, message: String },

    /// Malformed payload or missing column/field
    #[error("Parse error in {feed} feed: {message}")]
    Parse { feed: &'static str, message: String },

    /// A fully constructed candidate failed the plausibility check
    #[error("Validation error for {entity}: {reason}")]
    Validation { entity: String, reason: String },

    /// Writing the cached document failed
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// The connector did not finish in time or its task died
    #[error("Connector {connector} aborted: {message}")]
    Aborted { connector: &'static str, message: String },
}

impl EngineError {
    pub fn fetch(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Fetch {
            url: url.into(),
            message: message.to_string(),
        }
    }

    pub fn parse(feed: &'static str, message: impl fmt::Display) -> Self {
        Self::Parse {
            feed,
            message: message.to_string(),
        }
    }

    pub fn validation(entity: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::Validation {
            entity: entity.into(),
            reason: reason.to_string(),
        }
    }

    pub fn persistence(message: impl fmt::Display) -> Self {
        Self::Persistence(message.to_string())
    }

    /// Short category name used in log lines
    pub fn category(&self) -> &'static str {
        match self {
            Self::Fetch { .. } => "fetch",
            Self::Parse { .. } => "parse",
            Self::Validation { .. } => "validation",
            Self::Persistence(_) => "persistence",
            Self::Aborted { .. } => "aborted",
        }
    }
}
