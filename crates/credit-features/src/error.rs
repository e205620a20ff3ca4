//! Error types for feature derivation and outlier filtering.
//!
//! A single `thiserror` hierarchy covers schema problems, misuse of the
//! outlier filter, configuration mistakes and wrapped Polars/IO failures.
//!
//! Errors serialize as `{ code, message }` so a caller can forward them as
//! JSON without matching on every variant.

use crate::config::ConfigValidationError;
use crate::types::FeatureStep;
use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for the crate.
#[derive(Error, Debug)]
pub enum FeatureError {
    /// A feature step needs a column its input table does not have.
    #[error("{step} requires column '{column}' in the {table} table")]
    MissingColumn {
        step: FeatureStep,
        table: &'static str,
        column: String,
    },

    /// Column was not found in the dataset.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// `transform` was called before `fit`.
    #[error("Outlier filter has not been fitted; call fit() before transform()")]
    Unfitted,

    /// `fit` was called on a filter that already holds thresholds.
    #[error("Outlier filter is already fitted; construct a new filter to refit")]
    AlreadyFitted,

    /// A column that must hold numbers holds something else.
    #[error("Column '{column}' has non-numeric type {dtype}")]
    NonNumericColumn { column: String, dtype: String },

    /// No valid values found in a column for computation.
    #[error("No valid values found in column '{0}'")]
    NoValidValues(String),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigValidationError),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<FeatureError>,
    },
}

impl FeatureError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        FeatureError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Stable code for programmatic handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MissingColumn { .. } => "MISSING_COLUMN",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::Unfitted => "UNFITTED_STATE",
            Self::AlreadyFitted => "ALREADY_FITTED",
            Self::NonNumericColumn { .. } => "NON_NUMERIC_COLUMN",
            Self::NoValidValues(_) => "NO_VALID_VALUES",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// True for errors caused by using the outlier filter out of order,
    /// as opposed to bad configuration or bad data.
    pub fn is_state_error(&self) -> bool {
        match self {
            Self::Unfitted | Self::AlreadyFitted => true,
            Self::WithContext { source, .. } => source.is_state_error(),
            _ => false,
        }
    }
}

impl Serialize for FeatureError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("FeatureError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, FeatureError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| FeatureError::Polars(e).with_context(context))
    }
}
