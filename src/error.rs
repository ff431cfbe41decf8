//! Unified error hierarchy for laprs
//!
//! The detector itself only fails hard on a wholly empty input stream;
//! everything else degrades to a soft result or a missing metric. Hard
//! errors therefore come almost exclusively from the storage and
//! configuration layers.

use thiserror::Error;

/// Top-level error type for all laprs operations
#[derive(Debug, Error)]
pub enum LapRsError {
    /// Input stream violations (empty stream, malformed samples)
    #[error("Data error: {0}")]
    Data(String),

    /// SQLite storage errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Result type alias for laprs operations
pub type Result<T> = std::result::Result<T, LapRsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LapRsError::Data("no points for this activity".to_string());
        assert_eq!(err.to_string(), "Data error: no points for this activity");
    }
}
