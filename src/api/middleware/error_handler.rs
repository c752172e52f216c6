//! Renders every error response as an HTML error page or a JSON error body

use axum::{
    body::{self, Body},
    extract::State,
    http::{header, HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::api::controllers::base::html_response;
use crate::api::routes::API_PREFIX;
use crate::api::state::AppState;
use crate::api::types::{HttpError, Json};
use crate::infrastructure::helpers::{escape_html, UrlContext};
use crate::infrastructure::views::ViewData;

pub const NOT_FOUND_VIEW: &str = "errors/404";
pub const ERROR_VIEW: &str = "errors/error";

/// Bare framework bodies longer than this are not used as the message
const MAX_BARE_BODY: usize = 64 * 1024;

/// How an error response should be rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorFormat {
    Html,
    Json,
}

impl ErrorFormat {
    /// JSON for API paths and clients that accept JSON but not HTML
    pub fn negotiate(path: &str, base_path: &str, headers: &HeaderMap) -> Self {
        let api_path = path
            .strip_prefix(base_path)
            .is_some_and(|rest| rest == API_PREFIX || rest.starts_with("/api/"));
        if api_path {
            return Self::Json;
        }

        let accept = headers
            .get(header::ACCEPT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if accept.contains("application/json") && !accept.contains("text/html") {
            Self::Json
        } else {
            Self::Html
        }
    }
}

pub async fn error_handling_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let format = ErrorFormat::negotiate(request.uri().path(), state.base_path(), request.headers());
    let url = UrlContext::from_request_head(request.headers(), request.uri(), state.base_path());
    let path = request.uri().path().to_string();

    let response = next.run(request).await;
    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let err = match parts.extensions.remove::<HttpError>() {
        Some(err) => err,
        None => bare_error(status, &parts.headers, body).await,
    };

    if status.is_server_error() {
        error!(path = %path, status = %status.as_u16(), message = %err.message, detail = ?err.detail, "Server error");
    } else {
        debug!(path = %path, status = %status.as_u16(), message = %err.message, "Client error");
    }

    let display_details = state.display_error_details();
    let mut rendered = match format {
        ErrorFormat::Json => (status, Json(err.to_response_body(display_details))).into_response(),
        ErrorFormat::Html => render_error_page(&state, &err, &url, display_details).await,
    };

    parts.headers.remove(header::CONTENT_TYPE);
    parts.headers.remove(header::CONTENT_LENGTH);
    for (name, value) in parts.headers.iter() {
        rendered.headers_mut().entry(name).or_insert_with(|| value.clone());
    }

    rendered
}

/// Error for a response that did not come from an [`HttpError`]
async fn bare_error(status: StatusCode, headers: &HeaderMap, body: Body) -> HttpError {
    let err = HttpError::from_status(status);

    let is_text = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_none_or(|ct| ct.starts_with("text/plain"));
    if !is_text {
        return err;
    }

    match body::to_bytes(body, MAX_BARE_BODY).await {
        Ok(bytes) => {
            let text = String::from_utf8_lossy(&bytes).trim().to_string();
            if text.is_empty() {
                err
            } else {
                HttpError::new(status, text)
            }
        }
        Err(_) => err,
    }
}

async fn render_error_page(
    state: &AppState,
    err: &HttpError,
    url: &UrlContext,
    display_details: bool,
) -> Response {
    let (message, details) = err.public_parts(display_details);
    let title = err.status.canonical_reason().unwrap_or("Error");

    let mut data = ViewData::new();
    data.insert(
        "page_title".to_string(),
        format!("{} - {}", err.status.as_u16(), title).into(),
    );
    data.insert("status".to_string(), err.status.as_u16().into());
    data.insert("title".to_string(), title.into());
    data.insert("message".to_string(), message.clone().into());
    data.insert(
        "details".to_string(),
        details.clone().map(Value::String).unwrap_or(Value::Null),
    );

    let view = if err.status == StatusCode::NOT_FOUND {
        NOT_FOUND_VIEW
    } else {
        ERROR_VIEW
    };

    match state.views.render(view, &data, url).await {
        Ok(body) => html_response(err.status, body),
        Err(e) => {
            warn!(view = %view, error = %e, "Failed to render error view");
            let mut body = format!(
                "<h1>{} {}</h1><p>{}</p>",
                err.status.as_u16(),
                escape_html(title),
                escape_html(&message)
            );
            if let Some(details) = details {
                body.push_str(&format!("<pre>{}</pre>", escape_html(&details)));
            }
            html_response(err.status, body)
        }
    }
}
