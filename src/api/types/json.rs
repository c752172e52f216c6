//! JSON response renderer

use axum::{
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

use super::error::HttpError;

pub const APP_MEDIA_TYPE_JSON: &str = "application/json";

/// JSON response with an `application/json` content type.
///
/// Slashes are left unescaped. A value that fails to serialize becomes a 500
/// routed through the error-handling middleware.
#[derive(Debug, Clone, Copy, Default)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    /// Consume the wrapper and return the inner value
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> std::ops::Deref for Json<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> IntoResponse for Json<T>
where
    T: Serialize,
{
    fn into_response(self) -> Response {
        match serde_json::to_vec(&self.0) {
            Ok(body) => (
                [(header::CONTENT_TYPE, HeaderValue::from_static(APP_MEDIA_TYPE_JSON))],
                body,
            )
                .into_response(),
            Err(e) => {
                error!(error = %e, "Failed to serialize JSON response");
                HttpError::internal("Failed to encode JSON response")
                    .with_detail(e.to_string())
                    .into_response()
            }
        }
    }
}

impl<T> From<T> for Json<T> {
    fn from(value: T) -> Self {
        Json(value)
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use http_body_util::BodyExt;
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn test_json_response_headers_and_body() {
        let response = Json(json!({"url": "http://localhost/app"})).into_response();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            APP_MEDIA_TYPE_JSON
        );

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], br#"{"url":"http://localhost/app"}"#);
    }

    #[test]
    fn test_json_deref() {
        let json = Json("hello".to_string());
        assert_eq!(*json, "hello");
    }

    #[test]
    fn test_json_into_inner() {
        let json = Json(42);
        assert_eq!(json.into_inner(), 42);
    }
}
