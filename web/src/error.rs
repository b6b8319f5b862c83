//! Error types for web handlers.
//!
//! [`AppError`] bridges the payment error taxonomy and HTTP responses. Every
//! error renders as `{code, message}`; server errors are logged with their
//! source before the response goes out.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use panelpay_core::PaymentError;
use serde::Serialize;
use std::fmt;

/// Application error type for web handlers.
///
/// # Examples
///
/// ```ignore
/// async fn handler() -> Result<Json<Panel>, AppError> {
///     let panel = store.get_panel(id).await?
///         .ok_or_else(|| AppError::not_found("Panel", id))?;
///     Ok(Json(panel))
/// }
/// ```
#[derive(Debug)]
pub struct AppError {
    /// HTTP status code
    status: StatusCode,
    /// Error message (user-facing)
    message: String,
    /// Error code (for client error handling)
    code: String,
    /// Internal error (for logging, not exposed to client)
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            code: code.into(),
            source: None,
        }
    }

    /// Create a new error with a source error.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// HTTP status of the error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable code.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// User-facing message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Create a 400 Bad Request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message, "BAD_REQUEST")
    }

    /// Create a 401 Unauthorized error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message, "UNAUTHORIZED")
    }

    /// Create a 404 Not Found error.
    #[must_use]
    pub fn not_found(resource: impl fmt::Display, id: impl fmt::Display) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            format!("{resource} with id {id} not found"),
            "NOT_FOUND",
        )
    }

    /// Create a 409 Conflict error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message, "CONFLICT")
    }

    /// Create a 400 validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message, "VALIDATION_ERROR")
    }

    /// Create a 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            message,
            "INTERNAL_SERVER_ERROR",
        )
    }

    /// Create a 503 Service Unavailable error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message, "SERVICE_UNAVAILABLE")
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse {
    /// Error code (for client error handling).
    code: String,
    /// Human-readable error message.
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            if let Some(source) = &self.source {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    error = %source,
                    "Internal server error"
                );
            } else {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    "Internal server error"
                );
            }
        }

        let body = ErrorResponse {
            code: self.code,
            message: self.message,
        };

        (self.status, Json(body)).into_response()
    }
}

/// Convert `anyhow::Error` to `AppError`.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal("An internal error occurred").with_source(err)
    }
}

/// Map the payment taxonomy onto HTTP.
impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::Validation(message) => Self::validation(message),
            PaymentError::NotFound { entity, id } => Self::not_found(entity, id),
            PaymentError::UnknownProvider(_) => Self::new(
                StatusCode::BAD_REQUEST,
                err.to_string(),
                "UNKNOWN_PROVIDER",
            ),
            PaymentError::ProviderUnreachable { .. } => Self::new(
                StatusCode::BAD_GATEWAY,
                err.to_string(),
                "PROVIDER_UNREACHABLE",
            ),
            PaymentError::ProviderRejected { .. } => Self::new(
                StatusCode::BAD_GATEWAY,
                err.to_string(),
                "PROVIDER_REJECTED",
            ),
            PaymentError::AmountMismatch { .. } => Self::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                err.to_string(),
                "AMOUNT_MISMATCH",
            ),
            PaymentError::ReferenceMismatch { .. } => Self::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                err.to_string(),
                "REFERENCE_MISMATCH",
            ),
            PaymentError::ProviderConfigMissing(provider) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Payment provider {provider} is not configured"),
                "PROVIDER_CONFIG_MISSING",
            ),
            PaymentError::DuplicateSubdomain(_) => Self::new(
                StatusCode::CONFLICT,
                err.to_string(),
                "DUPLICATE_SUBDOMAIN",
            ),
            PaymentError::Storage(source) => {
                Self::internal("An internal error occurred").with_source(anyhow::Error::new(source))
            }
        }
    }
}
