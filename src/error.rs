//! Error types for georec operations.
//!
//! Provides rich error context for library consumers.

use thiserror::Error;

/// Main error type for georec operations.
///
/// Schema and empty-dataset failures are fatal to the [`fit`] or
/// [`preprocess_data`] call that raised them; no partial model state is
/// committed. Cold-start lookups are never errors.
///
/// [`fit`]: crate::recommend::GeoRecommender::fit
/// [`preprocess_data`]: crate::recommend::GeoRecommender::preprocess_data
///
/// # Examples
///
/// ```
/// use georec::error::GeoRecError;
///
/// let err = GeoRecError::missing_column("[Latitude]");
/// assert!(err.to_string().contains("[Latitude]"));
/// ```
#[derive(Debug, Error)]
pub enum GeoRecError {
    /// A required column is absent from the input table.
    #[error("Schema error: missing required column '{column}'")]
    Schema {
        /// Name of the missing column
        column: String,
    },

    /// A column exists but holds the wrong kind of values.
    #[error("Schema error: column '{column}' must be {expected}")]
    ColumnType {
        /// Column name
        column: String,
        /// Expected column kind ("text" or "numeric")
        expected: String,
    },

    /// Training was requested on a table without rows.
    #[error("Empty dataset: {context}")]
    EmptyDataset {
        /// Where the empty input was found
        context: String,
    },

    /// Invalid hyperparameter value provided.
    #[error("Invalid hyperparameter: {param} = {value}, expected {constraint}")]
    InvalidHyperparameter {
        /// Parameter name
        param: String,
        /// Provided value
        value: String,
        /// Constraint description
        constraint: String,
    },

    /// Lengths or shapes don't line up.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimensions description
        expected: String,
        /// Actual dimensions found
        actual: String,
    },

    /// Operation requires a fitted model.
    #[error("Model not fitted. Call fit() first.")]
    NotFitted,

    /// Generic error with string message.
    #[error("{0}")]
    Other(String),
}

impl From<&str> for GeoRecError {
    fn from(msg: &str) -> Self {
        GeoRecError::Other(msg.to_string())
    }
}

impl From<String> for GeoRecError {
    fn from(msg: String) -> Self {
        GeoRecError::Other(msg)
    }
}

impl GeoRecError {
    /// Create a schema error for a missing column
    #[must_use]
    pub fn missing_column(column: &str) -> Self {
        Self::Schema {
            column: column.to_string(),
        }
    }

    /// Create an empty dataset error
    #[must_use]
    pub fn empty_dataset(context: &str) -> Self {
        Self::EmptyDataset {
            context: context.to_string(),
        }
    }

    /// Create an invalid hyperparameter error
    #[must_use]
    pub fn invalid_hyperparameter(param: &str, value: impl ToString, constraint: &str) -> Self {
        Self::InvalidHyperparameter {
            param: param.to_string(),
            value: value.to_string(),
            constraint: constraint.to_string(),
        }
    }

    /// Create a dimension mismatch error with descriptive context
    #[must_use]
    pub fn dimension_mismatch(context: &str, expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch {
            expected: format!("{context}={expected}"),
            actual: format!("{actual}"),
        }
    }
}

/// Convenience type alias for Results.
pub type Result<T> = std::result::Result<T, GeoRecError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_display() {
        let err = GeoRecError::missing_column("[User ID]");
        let msg = err.to_string();
        assert!(msg.contains("Schema error"));
        assert!(msg.contains("[User ID]"));
    }

    #[test]
    fn test_column_type_display() {
        let err = GeoRecError::ColumnType {
            column: "[Latitude]".to_string(),
            expected: "numeric".to_string(),
        };
        assert!(err.to_string().contains("must be numeric"));
    }

    #[test]
    fn test_empty_dataset_display() {
        let err = GeoRecError::empty_dataset("fit requires at least one row");
        assert!(err.to_string().contains("Empty dataset"));
        assert!(err.to_string().contains("at least one row"));
    }

    #[test]
    fn test_invalid_hyperparameter_display() {
        let err = GeoRecError::invalid_hyperparameter("learning_rate", -0.1, ">0");
        let msg = err.to_string();
        assert!(msg.contains("Invalid hyperparameter"));
        assert!(msg.contains("learning_rate"));
        assert!(msg.contains("-0.1"));
        assert!(msg.contains(">0"));
    }

    #[test]
    fn test_dimension_mismatch_helper() {
        let err = GeoRecError::dimension_mismatch("rows", 100, 50);
        let msg = err.to_string();
        assert!(msg.contains("rows=100"));
        assert!(msg.contains("50"));
    }

    #[test]
    fn test_from_str() {
        let err: GeoRecError = "test error".into();
        assert!(matches!(err, GeoRecError::Other(_)));
        assert_eq!(err.to_string(), "test error");
    }

    #[test]
    fn test_from_string() {
        let err: GeoRecError = "test error".to_string().into();
        assert!(matches!(err, GeoRecError::Other(_)));
    }

    #[test]
    fn test_error_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<GeoRecError>();
    }
}
