//! Helper functions shared by controllers and views

use std::fmt::Debug;
use std::path::{Component, Path, PathBuf};
use std::time::UNIX_EPOCH;

use axum::http::{header, request::Parts, HeaderMap, Uri};
use axum::response::{Html, IntoResponse, Response};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::config::AppSection;
use crate::domain::DomainError;

/// Escape a string for HTML text and attribute contexts.
///
/// `&`, `"`, `'`, `<` and `>` become `&amp;`, `&quot;`, `&#039;`, `&lt;`
/// and `&gt;`.
pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Scheme, host and mount point of the current request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlContext {
    pub scheme: String,
    pub host: String,
    pub base_path: String,
}

impl UrlContext {
    pub fn new(
        scheme: impl Into<String>,
        host: impl Into<String>,
        base_path: impl Into<String>,
    ) -> Self {
        Self {
            scheme: scheme.into(),
            host: host.into(),
            base_path: base_path.into(),
        }
    }

    /// Derive the context from request headers, honouring `X-Forwarded-Proto`
    pub fn from_parts(parts: &Parts, base_path: &str) -> Self {
        Self::from_request_head(&parts.headers, &parts.uri, base_path)
    }

    pub fn from_request_head(headers: &HeaderMap, uri: &Uri, base_path: &str) -> Self {
        let host = headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .or_else(|| uri.authority().map(|a| a.to_string()))
            .unwrap_or_else(|| "localhost".to_string());

        let scheme = headers
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.trim().to_lowercase())
            .filter(|s| s == "https" || s == "http")
            .or_else(|| uri.scheme_str().map(|s| s.to_string()))
            .unwrap_or_else(|| "http".to_string());

        Self::new(scheme, host, base_path)
    }

    /// Full URL for `path`, e.g. `base_url("/users")` gives
    /// `http://localhost:8080/my-app/users`
    pub fn base_url(&self, path: &str) -> String {
        format!("{}://{}{}{}", self.scheme, self.host, self.base_path, path)
    }
}

impl Default for UrlContext {
    fn default() -> Self {
        Self::new("http", "localhost", "")
    }
}

/// Resolves asset URLs under the public assets directory
#[derive(Debug, Clone)]
pub struct AssetResolver {
    assets_dir: String,
    assets_path: PathBuf,
    debug_mode: bool,
}

impl AssetResolver {
    pub fn new(assets_dir: impl Into<String>, assets_path: impl Into<PathBuf>, debug_mode: bool) -> Self {
        Self {
            assets_dir: assets_dir.into(),
            assets_path: assets_path.into(),
            debug_mode,
        }
    }

    pub fn from_settings(app: &AppSection) -> Self {
        Self::new(app.assets_dir.clone(), app.assets_path(), app.debug_mode)
    }

    /// URL of an asset relative to the assets directory, e.g. `/css/style.css`.
    ///
    /// Returns an empty string when the file does not exist. With `cache_bust`
    /// the file's modification time is appended as the query string. Outside
    /// debug mode `.js`/`.css` are swapped for their `.min` counterparts.
    pub fn asset_url(&self, url: &UrlContext, asset_uri: &str, cache_bust: bool) -> String {
        let relative = asset_uri.trim_start_matches('/');
        if !is_safe_relative(Path::new(relative)) {
            return String::new();
        }

        let file_path = self.assets_path.join(relative);
        let Ok(metadata) = std::fs::metadata(&file_path) else {
            return String::new();
        };
        if !metadata.is_file() {
            return String::new();
        }

        let token = if cache_bust {
            metadata
                .modified()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| format!("?{}", d.as_secs()))
                .unwrap_or_default()
        } else {
            String::new()
        };

        let uri = if self.debug_mode {
            format!("/{}", relative)
        } else {
            format!("/{}", minified_name(relative))
        };

        format!("{}{}", url.base_url(&format!("{}{}", self.assets_dir, uri)), token)
    }
}

fn minified_name(uri: &str) -> String {
    for ext in ["js", "css"] {
        let plain = format!(".{}", ext);
        let min = format!(".min.{}", ext);
        if uri.ends_with(&plain) && !uri.ends_with(&min) {
            return format!("{}{}", &uri[..uri.len() - plain.len()], min);
        }
    }
    uri.to_string()
}

/// True when the path only descends into normal components
pub(crate) fn is_safe_relative(path: &Path) -> bool {
    path.components().all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// Drop the seconds from a date-time string, giving `YYYY-MM-DD HH:MM`
pub fn date_remove_secs(date: &str) -> Result<String, DomainError> {
    const FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];

    let date = date.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(date) {
        return Ok(parsed.format("%Y-%m-%d %H:%M").to_string());
    }

    for format in FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(date, format) {
            return Ok(parsed.format("%Y-%m-%d %H:%M").to_string());
        }
    }

    if let Ok(parsed) = NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        return Ok(format!("{} 00:00", parsed.format("%Y-%m-%d")));
    }

    Err(DomainError::validation(format!("Unrecognised date: '{}'", date)))
}

/// Dump a value as an HTML page and stop handling the request.
///
/// Return the response straight from a handler while debugging.
pub fn dump<T: Debug + ?Sized>(data: &T) -> Response {
    let body = format!("<pre>{}</pre>", escape_html(&format!("{:#?}", data)));
    Html(body).into_response()
}

/// Render `<option>` elements for a `<select>`.
///
/// Starts with a `-- Select --` option, selected when `previous_select` is
/// empty or `"0"`. Items lacking either key are skipped and every value is
/// escaped.
pub fn render_select_options(
    items: &[Value],
    previous_select: &str,
    value_key: &str,
    option_key: &str,
) -> String {
    let no_selection = previous_select.is_empty() || previous_select == "0";
    let default_selected = if no_selection { " selected" } else { "" };
    let mut options = format!("<option value=\"\"{}>-- Select --</option>", default_selected);

    for item in items {
        let (Some(value), Some(text)) = (
            item.get(value_key).and_then(value_to_text),
            item.get(option_key).and_then(value_to_text),
        ) else {
            continue;
        };

        let selected = if value == previous_select { " selected" } else { "" };
        options.push_str(&format!(
            "<option value=\"{}\"{}>{}</option>",
            escape_html(&value),
            selected,
            escape_html(&text)
        ));
    }

    options
}

/// Scalar value as text; `None` for null and containers
pub(crate) fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(true) => Some("1".to_string()),
        Value::Bool(false) => Some(String::new()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
