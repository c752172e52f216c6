//! HTTP error type returned by handlers

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::api::routes::RouteError;
use crate::config::SettingsError;
use crate::domain::DomainError;
use crate::infrastructure::upload::UploadError;

/// Error category reported in JSON error bodies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorType {
    InvalidRequestError,
    AuthenticationError,
    PermissionError,
    NotFoundError,
    MethodNotAllowedError,
    PayloadTooLargeError,
    ServerError,
    ServiceUnavailableError,
}

impl ApiErrorType {
    pub fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => Self::AuthenticationError,
            StatusCode::FORBIDDEN => Self::PermissionError,
            StatusCode::NOT_FOUND => Self::NotFoundError,
            StatusCode::METHOD_NOT_ALLOWED => Self::MethodNotAllowedError,
            StatusCode::PAYLOAD_TOO_LARGE => Self::PayloadTooLargeError,
            StatusCode::SERVICE_UNAVAILABLE => Self::ServiceUnavailableError,
            s if s.is_server_error() => Self::ServerError,
            _ => Self::InvalidRequestError,
        }
    }
}

impl std::fmt::Display for ApiErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRequestError => write!(f, "invalid_request_error"),
            Self::AuthenticationError => write!(f, "authentication_error"),
            Self::PermissionError => write!(f, "permission_error"),
            Self::NotFoundError => write!(f, "not_found_error"),
            Self::MethodNotAllowedError => write!(f, "method_not_allowed_error"),
            Self::PayloadTooLargeError => write!(f, "payload_too_large_error"),
            Self::ServerError => write!(f, "server_error"),
            Self::ServiceUnavailableError => write!(f, "service_unavailable_error"),
        }
    }
}

/// JSON error body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: ApiErrorType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Error raised by a handler.
///
/// The error-handling middleware re-renders it as HTML or JSON and decides
/// whether `detail` reaches the client.
#[derive(Debug, Clone)]
pub struct HttpError {
    pub status: StatusCode,
    pub message: String,
    /// Internal information, only shown when error details are enabled
    pub detail: Option<String>,
}

impl HttpError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            detail: None,
        }
    }

    /// Error for a bare status, using its reason phrase as the message
    pub fn from_status(status: StatusCode) -> Self {
        Self::new(status, status.canonical_reason().unwrap_or("Error"))
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn method_not_allowed(message: impl Into<String>) -> Self {
        Self::new(StatusCode::METHOD_NOT_ALLOWED, message)
    }

    pub fn payload_too_large(message: impl Into<String>) -> Self {
        Self::new(StatusCode::PAYLOAD_TOO_LARGE, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    pub fn error_type(&self) -> ApiErrorType {
        ApiErrorType::from_status(self.status)
    }

    /// Message and detail as the client may see them.
    ///
    /// Server errors collapse to the status reason unless details are enabled.
    pub fn public_parts(&self, display_details: bool) -> (String, Option<String>) {
        if display_details {
            return (self.message.clone(), self.detail.clone());
        }

        if self.status.is_server_error() {
            let reason = self.status.canonical_reason().unwrap_or("Internal Server Error");
            (reason.to_string(), None)
        } else {
            (self.message.clone(), None)
        }
    }

    pub fn to_response_body(&self, display_details: bool) -> ApiErrorResponse {
        let (message, details) = self.public_parts(display_details);
        ApiErrorResponse {
            error: ApiErrorDetail {
                message,
                error_type: self.error_type(),
                details,
            },
        }
    }
}

impl IntoResponse for HttpError {
    /// The body never carries details; the middleware replaces it.
    fn into_response(self) -> Response {
        let body = self.to_response_body(false);
        let mut response = (self.status, Json(body)).into_response();
        response.extensions_mut().insert(self);
        response
    }
}

impl From<DomainError> for HttpError {
    fn from(err: DomainError) -> Self {
        match &err {
            DomainError::NotFound { message } => Self::not_found(message),
            DomainError::Validation { message } => Self::bad_request(message),
            DomainError::Storage { .. } => {
                Self::unavailable("The database is unavailable").with_detail(err.to_string())
            }
            DomainError::Configuration { .. }
            | DomainError::Template { .. }
            | DomainError::Internal { .. } => {
                Self::internal("Internal Server Error").with_detail(err.to_string())
            }
        }
    }
}

impl From<UploadError> for HttpError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::Save(_) => Self::internal(err.to_string()),
            other => Self::bad_request(other.to_string()),
        }
    }
}

impl From<RouteError> for HttpError {
    fn from(err: RouteError) -> Self {
        Self::internal("Failed to build redirect URL").with_detail(err.to_string())
    }
}

impl From<SettingsError> for HttpError {
    fn from(err: SettingsError) -> Self {
        Self::internal("Internal Server Error").with_detail(err.to_string())
    }
}

impl std::fmt::Display for HttpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}: {}", self.status.as_u16(), self.error_type(), self.message)
    }
}

impl std::error::Error for HttpError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_creation() {
        let err = HttpError::not_found("Something went wrong");
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.error_type(), ApiErrorType::NotFoundError);
        assert_eq!(err.message, "Something went wrong");
    }

    #[test]
    fn test_server_error_details_hidden_by_default() {
        let err = HttpError::internal("Failed to render view 'home'").with_detail("disk on fire");

        let (message, detail) = err.public_parts(false);
        assert_eq!(message, "Internal Server Error");
        assert!(detail.is_none());

        let (message, detail) = err.public_parts(true);
        assert_eq!(message, "Failed to render view 'home'");
        assert_eq!(detail.as_deref(), Some("disk on fire"));
    }

    #[test]
    fn test_client_error_message_always_shown() {
        let err = HttpError::bad_request("Invalid file type").with_detail("image/tiff");
        let (message, detail) = err.public_parts(false);
        assert_eq!(message, "Invalid file type");
        assert!(detail.is_none());
    }

    #[test]
    fn test_domain_error_conversion() {
        let err: HttpError = DomainError::not_found("View 'x' not found").into();
        assert_eq!(err.status, StatusCode::NOT_FOUND);

        let err: HttpError = DomainError::configuration("Database name is required").into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.detail.unwrap().contains("Database name is required"));

        let err: HttpError = DomainError::storage("connection refused").into();
        assert_eq!(err.status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_upload_error_conversion() {
        let err: HttpError = UploadError::Save("read-only filesystem".to_string()).into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);

        let err: HttpError = UploadError::InvalidType { media_type: None }.into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_into_response_carries_error() {
        let response = HttpError::not_found("gone").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.extensions().get::<HttpError>().is_some());
    }

    #[test]
    fn test_error_serialization() {
        let body = HttpError::payload_too_large("Too big").to_response_body(false);
        let json = serde_json::to_string(&body).unwrap();

        assert!(json.contains("payload_too_large_error"));
        assert!(json.contains("Too big"));
        assert!(!json.contains("details"));
    }
}
