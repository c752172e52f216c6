//! Shared request/response types

pub mod error;
pub mod json;

pub use error::{ApiErrorDetail, ApiErrorResponse, ApiErrorType, HttpError};
pub use json::{Json, APP_MEDIA_TYPE_JSON};
