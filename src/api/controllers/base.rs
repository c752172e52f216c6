//! Request-scoped controller base

use std::collections::HashMap;
use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::{debug, error};

use crate::api::state::AppState;
use crate::api::types::HttpError;
use crate::infrastructure::helpers::UrlContext;
use crate::infrastructure::views::ViewData;

pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Extractor giving a handler access to the view renderer and route table
#[derive(Debug, Clone)]
pub struct BaseController {
    pub state: AppState,
    pub url: UrlContext,
}

impl FromRequestParts<AppState> for BaseController {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self {
            url: UrlContext::from_parts(parts, state.base_path()),
            state: state.clone(),
        })
    }
}

impl BaseController {
    /// Render `view` as an HTML page
    pub async fn render(&self, view: &str, data: &ViewData) -> Result<Response, HttpError> {
        let body = self
            .state
            .views
            .render(view, data, &self.url)
            .await
            .map_err(|e| {
                error!(view = %view, error = %e, "Failed to render view");
                HttpError::from(e)
            })?;

        Ok(html_response(StatusCode::OK, body))
    }

    /// Redirect to a named route with `302 Found`
    pub fn redirect<Q>(
        &self,
        route: &str,
        args: &HashMap<String, String>,
        query: &Q,
    ) -> Result<Response, HttpError>
    where
        Q: Serialize + ?Sized,
    {
        self.redirect_with_status(route, args, query, StatusCode::FOUND)
    }

    pub fn redirect_with_status<Q>(
        &self,
        route: &str,
        args: &HashMap<String, String>,
        query: &Q,
        status: StatusCode,
    ) -> Result<Response, HttpError>
    where
        Q: Serialize + ?Sized,
    {
        let location = self.state.routes.url_for(route, args, query)?;
        let location = HeaderValue::from_str(&location).map_err(|e| {
            HttpError::internal("Failed to build redirect URL").with_detail(e.to_string())
        })?;

        debug!(route = %route, location = ?location, "Redirecting");
        Ok((status, [(header::LOCATION, location)]).into_response())
    }
}

/// HTML response with the UTF-8 content type
pub fn html_response(status: StatusCode, body: String) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, HeaderValue::from_static(HTML_CONTENT_TYPE))],
        body,
    )
        .into_response()
}
