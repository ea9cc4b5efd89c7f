//! Error types for audit operations.

use thiserror::Error;

/// EC2 error code returned when the caller's identity is denied an action.
pub const UNAUTHORIZED_CODE: &str = "UnauthorizedOperation";

/// A failure reported by a cloud API call.
///
/// `code` is the service error code when the service returned one. Transport
/// failures (DNS, TLS, timeouts) carry no code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", describe(.code, .message))]
pub struct ApiError {
    pub code: Option<String>,
    pub message: String,
}

impl ApiError {
    /// Create an error with a service error code.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
        }
    }

    /// Create an error without a service error code.
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }
}

fn describe(code: &Option<String>, message: &str) -> String {
    match code {
        Some(code) => format!("{}: {}", code, message),
        None => message.to_string(),
    }
}

/// A classified instance-listing failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PageError {
    /// The caller is not allowed to list instances in this region.
    #[error("unauthorized: {0}")]
    Unauthorized(ApiError),

    /// Any other listing failure.
    #[error("{0}")]
    Other(ApiError),
}

impl PageError {
    /// Classify an API error by its service error code.
    pub fn classify(err: ApiError) -> Self {
        match err.code.as_deref() {
            Some(UNAUTHORIZED_CODE) => PageError::Unauthorized(err),
            _ => PageError::Other(err),
        }
    }
}

/// Fatal, run-ending errors.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Region discovery failed.
    #[error("unable to retrieve regions: {0}")]
    ListRegions(#[source] ApiError),

    /// Instance listing failed for a reason other than authorization.
    #[error("failed to retrieve instances in {region}: {source}")]
    ListInstances {
        region: String,
        #[source]
        source: ApiError,
    },

    /// A metric query failed.
    #[error("error retrieving metrics for instance {instance_id} in {region}: {source}")]
    QueryMetrics {
        region: String,
        instance_id: String,
        #[source]
        source: ApiError,
    },

    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// CSV report error.
    #[error("csv: {0}")]
    Csv(#[from] csv::Error),

    /// JSON report error.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
