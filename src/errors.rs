//! Error handling for the fire risk service
//!
//! Per-request failures (`Validation`, `ModelInvocation`) are recovered at the
//! prediction service boundary and rendered into a response. `ModelLoad` is
//! fatal at startup. The remaining variants cover configuration and tooling.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Main error type for the fire risk service
#[derive(Error, Debug)]
pub enum FireRiskError {
    #[error("Invalid value for '{field}': {message}")]
    Validation { field: String, message: String },

    #[error("Model invocation failed: {message}")]
    ModelInvocation { message: String },

    #[error("Failed to load model from {path}: {message}")]
    ModelLoad { path: String, message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("I/O operation failed: {operation}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization failed: {context}")]
    Serialization {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Dataset error: {message}")]
    Dataset { message: String },

    #[error("Tensor operation failed: {0}")]
    Tensor(#[from] candle_core::Error),
}

/// Shorthand for results carrying a [`FireRiskError`]
pub type FireRiskResult<T> = Result<T, FireRiskError>;

impl FireRiskError {
    /// Create a validation error naming the offending field
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a model invocation error
    pub fn model_invocation(message: impl Into<String>) -> Self {
        Self::ModelInvocation {
            message: message.into(),
        }
    }

    /// Create a model load error
    pub fn model_load(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ModelLoad {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an I/O error
    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    /// Create a serialization error
    pub fn serialization(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Serialization {
            context: context.into(),
            source,
        }
    }

    /// Create a dataset error
    pub fn dataset(message: impl Into<String>) -> Self {
        Self::Dataset {
            message: message.into(),
        }
    }

    /// True for failures caused by a single request rather than the process
    pub fn is_request_error(&self) -> bool {
        matches!(
            self,
            FireRiskError::Validation { .. } | FireRiskError::ModelInvocation { .. }
        )
    }
}

impl IntoResponse for FireRiskError {
    fn into_response(self) -> Response {
        let status = match self {
            FireRiskError::Validation { .. } | FireRiskError::Serialization { .. } => {
                StatusCode::BAD_REQUEST
            }
            FireRiskError::ModelInvocation { .. }
            | FireRiskError::ModelLoad { .. }
            | FireRiskError::Config { .. }
            | FireRiskError::Io { .. }
            | FireRiskError::Dataset { .. }
            | FireRiskError::Tensor(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, self.to_string()).into_response()
    }
}

impl From<serde_json::Error> for FireRiskError {
    fn from(err: serde_json::Error) -> Self {
        FireRiskError::serialization("json_operation", err)
    }
}

impl From<std::io::Error> for FireRiskError {
    fn from(err: std::io::Error) -> Self {
        FireRiskError::io("io_operation", err)
    }
}

impl From<csv::Error> for FireRiskError {
    fn from(err: csv::Error) -> Self {
        FireRiskError::dataset(err.to_string())
    }
}

impl From<figment::Error> for FireRiskError {
    fn from(err: figment::Error) -> Self {
        FireRiskError::config(err.to_string())
    }
}
