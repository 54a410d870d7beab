//! Error types for the Storyloom engine.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Configuration and storage each get their own error enum; estimation,
//! allocation and truncation are total functions and never fail.

use std::path::PathBuf;
use thiserror::Error;

/// The top-level error type for all Storyloom operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Configuration errors ---
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    // --- Storage errors ---
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Invalid budget or weight configuration. Raised at construction, never at
/// allocation time.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("total token budget must be positive, got {0}")]
    InvalidTotal(usize),

    #[error("weight for category '{category}' is negative: {weight}")]
    NegativeWeight { category: String, weight: f64 },

    #[error("weight for category '{category}' is not a finite number")]
    NonFiniteWeight { category: String },

    #[error("category weights sum to {sum:.3}, expected 1.0 (±0.01)")]
    WeightSum { sum: f64 },

    #[error("category '{0}' is listed more than once")]
    DuplicateCategory(String),

    #[error("invalid category name '{0}': use lowercase letters, digits, '_' or '-'")]
    InvalidCategoryName(String),

    #[error("unknown category '{0}': no content provider is registered for it")]
    UnknownCategory(String),
}

/// Failures touching durable storage. Every variant names the location.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to stat {path}: {source}")]
    Metadata {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parent directory of {0} does not exist")]
    MissingParent(PathBuf),

    #[error("malformed content at {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },
}

impl StoreError {
    /// The storage location this failure refers to.
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::Read { path, .. }
            | Self::Write { path, .. }
            | Self::Metadata { path, .. }
            | Self::Malformed { path, .. } => path,
            Self::MissingParent(path) => path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_displays_correctly() {
        let err = Error::Config(ConfigError::WeightSum { sum: 0.5 });
        assert!(err.to_string().contains("0.500"));
        assert!(err.to_string().contains("Configuration error"));
    }

    #[test]
    fn store_error_carries_location_and_cause() {
        let err = StoreError::Write {
            path: PathBuf::from("/novel/worldview.md"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(err.path(), std::path::Path::new("/novel/worldview.md"));
        assert!(err.to_string().contains("worldview.md"));
        assert!(err.to_string().contains("denied"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
