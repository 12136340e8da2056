//! Typed error handling for bulkpay
//!
//! Callers can match on the failure category instead of inspecting strings.
//!
//! # Error Categories
//!
//! - [`PayError::Transport`] / [`PayError::Api`]: the whole remote call failed.
//!   These are the only errors a UI layer is expected to surface as a toast.
//! - [`PayError::Validation`]: local input validation rejected the call before
//!   any request was sent.
//! - [`PayError::Ineligible`] / [`PayError::InvalidTransition`]: the lifecycle
//!   state machine refused the request client-side.
//! - [`ConfigError`]: configuration loading and parsing.
//!
//! Partial batch failures and validation blocks are *not* errors: they are
//! carried as data in [`BulkOperationResult`](crate::core::outcome::BulkOperationResult)
//! and [`ValidationReport`](crate::core::outcome::ValidationReport).
//!
//! # Example
//!
//! ```rust,ignore
//! match store.mutate_one(&id, Transition::Confirm).await {
//!     Ok(Some(payment)) => println!("{} is now {}", payment.id, payment.status),
//!     Ok(None) => println!("{} deleted", id),
//!     Err(PayError::Api { status, message }) if status == StatusCode::CONFLICT => {
//!         println!("Backend refused: {}", message);
//!     }
//!     Err(e) => eprintln!("Other error: {}", e),
//! }
//! ```

use crate::core::entity::PaymentId;
use crate::core::lifecycle::{BulkOperation, Transition};
use crate::core::status::PaymentStatus;
use reqwest::StatusCode;
use serde::Serialize;
use thiserror::Error;

/// The main error type for bulkpay operations
#[derive(Debug, Error)]
pub enum PayError {
    /// The request never produced an HTTP response (connection, timeout, TLS)
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// The backend answered with a non-success status
    #[error("Backend returned {status}: {message}")]
    Api { status: StatusCode, message: String },

    /// The backend answered but the body could not be decoded
    #[error("Failed to decode {context}: {message}")]
    Decode { context: String, message: String },

    /// Local input validation failed; nothing was sent
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// An eligibility predicate is false for the current selection
    #[error("Cannot {operation} the current selection: {reason}")]
    Ineligible {
        operation: BulkOperation,
        reason: String,
    },

    /// A single-item transition is not permitted from the cached status
    #[error("Cannot {transition} a payment in {from} status")]
    InvalidTransition {
        transition: Transition,
        from: PaymentStatus,
    },

    /// The payment is not part of the loaded page
    #[error("Payment '{id}' not found")]
    NotFound { id: PaymentId },

    /// A strict parse rejected a value the normalizer would have coerced
    #[error("Unknown {field} value: '{value}'")]
    UnknownValue { field: &'static str, value: String },

    /// Configuration errors
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl PayError {
    /// Get the error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            PayError::Transport { .. } => "TRANSPORT_ERROR",
            PayError::Api { .. } => "API_ERROR",
            PayError::Decode { .. } => "DECODE_ERROR",
            PayError::Validation(_) => "VALIDATION_ERROR",
            PayError::Ineligible { .. } => "INELIGIBLE_SELECTION",
            PayError::InvalidTransition { .. } => "INVALID_TRANSITION",
            PayError::NotFound { .. } => "PAYMENT_NOT_FOUND",
            PayError::UnknownValue { .. } => "UNKNOWN_VALUE",
            PayError::Config(_) => "CONFIG_ERROR",
        }
    }

    /// HTTP status returned by the backend, if the failure came from one
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            PayError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the whole remote call failed (the "generic toast" category)
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            PayError::Transport { .. } | PayError::Api { .. } | PayError::Decode { .. }
        )
    }

    /// Convert to a serializable summary
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.error_code().to_string(),
            message: self.to_string(),
            status: self.status().map(|s| s.as_u16()),
        }
    }
}

/// Serializable error summary, handy for forwarding errors to a UI layer
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Backend HTTP status, when there was one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

// =============================================================================
// Validation Errors
// =============================================================================

/// Errors related to local input validation
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Single field validation error
    #[error("Validation error for field '{field}': {message}")]
    FieldError { field: String, message: String },

    /// Multiple field validation errors
    #[error("Validation errors: {}", join_field_errors(.0))]
    FieldErrors(Vec<FieldValidationError>),

    /// Missing required argument
    #[error("Missing required argument: {argument}")]
    MissingArgument { argument: String },
}

/// A single field validation error
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldValidationError {
    pub field: String,
    pub message: String,
}

fn join_field_errors(errors: &[FieldValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<validator::ValidationErrors> for ValidationError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<FieldValidationError> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| FieldValidationError {
                    field: field.to_string(),
                    message: e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string()),
                })
            })
            .collect();
        fields.sort_by(|a, b| a.field.cmp(&b.field));
        ValidationError::FieldErrors(fields)
    }
}

// =============================================================================
// Config Errors
// =============================================================================

/// Errors related to configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to parse configuration
    #[error("Failed to parse config{}: {message}", .file.as_ref().map(|f| format!(" file '{}'", f)).unwrap_or_default())]
    ParseError {
        file: Option<String>,
        message: String,
    },

    /// Invalid value in configuration
    #[error("Invalid value '{value}' for field '{field}': {message}")]
    InvalidValue {
        field: String,
        value: String,
        message: String,
    },

    /// IO error while reading configuration
    #[error("IO error: {message}")]
    IoError { message: String },
}

// =============================================================================
// Conversions from external errors
// =============================================================================

impl From<reqwest::Error> for PayError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            PayError::Api {
                status,
                message: err.to_string(),
            }
        } else if err.is_decode() {
            PayError::Decode {
                context: "response body".to_string(),
                message: err.to_string(),
            }
        } else {
            PayError::Transport {
                message: err.to_string(),
            }
        }
    }
}

impl From<serde_json::Error> for PayError {
    fn from(err: serde_json::Error) -> Self {
        PayError::Decode {
            context: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for PayError {
    fn from(err: serde_yaml::Error) -> Self {
        PayError::Config(ConfigError::ParseError {
            file: None,
            message: err.to_string(),
        })
    }
}

impl From<std::io::Error> for PayError {
    fn from(err: std::io::Error) -> Self {
        PayError::Config(ConfigError::IoError {
            message: err.to_string(),
        })
    }
}

impl From<validator::ValidationErrors> for PayError {
    fn from(errors: validator::ValidationErrors) -> Self {
        PayError::Validation(errors.into())
    }
}

/// A specialized Result type for bulkpay operations
pub type PayResult<T> = Result<T, PayError>;
