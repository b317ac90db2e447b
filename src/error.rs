//! Error types for autotag.
//!
//! Error strategy:
//! - Per-file errors (recognition, rename, tagging): caught at the pipeline
//!   boundary and turned into a failure outcome, the batch continues
//! - Run errors (missing directory, walk failure, config): abort the run

use std::path::PathBuf;
use thiserror::Error;

/// Supported audio formats for error messages
pub const SUPPORTED_FORMATS: &str = "MP3, Opus";

#[derive(Debug, Error)]
pub enum AutotagError {
    // =========================================================================
    // Per-file errors - record a failure outcome, continue batch
    // =========================================================================
    #[error("Could not recognize '{path}' after {attempts} attempt(s): {reason}")]
    Recognition {
        path: PathBuf,
        attempts: u32,
        reason: String,
    },

    #[error("Recognition returned no usable title for '{path}'")]
    UnknownTitle { path: PathBuf },

    #[error("Failed to write tags to '{path}': {reason}")]
    TagWrite { path: PathBuf, reason: String },

    #[error("Failed to write cover art to '{path}': {reason}")]
    CoverArt { path: PathBuf, reason: String },

    #[error("No free file name for '{candidate}' after {limit} suffixes")]
    CollisionExhausted { candidate: PathBuf, limit: u32 },

    #[error("Failed to rename '{from}' to '{to}': {source}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported audio format for '{path}'\n  Supported formats: {SUPPORTED_FORMATS}")]
    UnsupportedFormat { path: PathBuf },

    // =========================================================================
    // Run errors - abort
    // =========================================================================
    #[error("Refusing to process '{0}': path contains a 'test' directory (use --test for the self-test fixtures)")]
    RejectedDirectory(PathBuf),

    #[error("Directory not found: '{0}'\n  Tip: Check the path exists and is accessible")]
    DirectoryNotFound(PathBuf),

    #[error("Failed to scan '{path}': {reason}")]
    Walk { path: PathBuf, reason: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for autotag operations
pub type Result<T> = std::result::Result<T, AutotagError>;

impl AutotagError {
    pub fn tag_write(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        AutotagError::TagWrite {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn cover_art(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        AutotagError::CoverArt {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_path() {
        let err = AutotagError::cover_art("/music/a.opus", "HTTP 404");
        let msg = err.to_string();
        assert!(msg.contains("/music/a.opus"));
        assert!(msg.contains("HTTP 404"));
    }
}
