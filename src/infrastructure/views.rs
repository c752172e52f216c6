//! View rendering
//!
//! Views are `.html` files under the views directory. Directives:
//! - `${var:path}` / `${var:path:default}` - HTML-escaped value, `path` may be dotted (`data.title`)
//! - `${raw:path}` - unescaped value, for trusted markup
//! - `${include:common/header}` - render another view in place
//! - `${url:/users}` - absolute URL under the app's base path
//! - `${asset:/css/style.css}` - cache-busted asset URL

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use moka::future::Cache;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::AppSection;
use crate::domain::DomainError;
use crate::infrastructure::helpers::{
    escape_html, is_safe_relative, value_to_text, AssetResolver, UrlContext,
};

/// Data handed from a controller to a view
pub type ViewData = Map<String, Value>;

pub const VIEW_EXTENSION: &str = "html";

const MAX_INCLUDE_DEPTH: usize = 8;
const TEMPLATE_CACHE_CAPACITY: u64 = 256;

static DIRECTIVE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{(var|raw|include|url|asset):([^}:]+)(?::([^}]*))?\}").unwrap()
});

type RenderFuture<'a> = Pin<Box<dyn Future<Output = Result<String, DomainError>> + Send + 'a>>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Directive {
    Var { path: String, default: Option<String> },
    Raw { path: String, default: Option<String> },
    Include(String),
    Url(String),
    Asset(String),
}

#[derive(Debug)]
struct Placement {
    start: usize,
    end: usize,
    directive: Directive,
}

/// Loads and renders views from disk
pub struct ViewRenderer {
    views_dir: PathBuf,
    assets: AssetResolver,
    cache: Option<Cache<String, Arc<String>>>,
}

impl std::fmt::Debug for ViewRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewRenderer")
            .field("views_dir", &self.views_dir)
            .field("cached", &self.cache.is_some())
            .finish()
    }
}

impl ViewRenderer {
    /// With `cache_templates` each view is read from disk once
    pub fn new(views_dir: impl Into<PathBuf>, assets: AssetResolver, cache_templates: bool) -> Self {
        let cache = cache_templates.then(|| Cache::new(TEMPLATE_CACHE_CAPACITY));

        Self {
            views_dir: views_dir.into(),
            assets,
            cache,
        }
    }

    /// Templates are re-read on every render in debug mode
    pub fn from_settings(app: &AppSection) -> Self {
        Self::new(
            app.resolve(&app.views_dir),
            AssetResolver::from_settings(app),
            !app.debug_mode,
        )
    }

    pub fn views_dir(&self) -> &Path {
        &self.views_dir
    }

    pub fn assets(&self) -> &AssetResolver {
        &self.assets
    }

    /// Render `name` (e.g. `home` or `errors/404.html`) with `data`
    pub async fn render(
        &self,
        name: &str,
        data: &ViewData,
        url: &UrlContext,
    ) -> Result<String, DomainError> {
        self.render_view(name, data, url, 0).await
    }

    fn render_view<'a>(
        &'a self,
        name: &'a str,
        data: &'a ViewData,
        url: &'a UrlContext,
        depth: usize,
    ) -> RenderFuture<'a> {
        Box::pin(async move {
            if depth > MAX_INCLUDE_DEPTH {
                return Err(DomainError::template(format!(
                    "Include depth exceeded while rendering view '{}'",
                    name
                )));
            }

            let template = self.load(name).await?;
            let placements = parse_directives(&template);

            let mut output = String::with_capacity(template.len());
            let mut last = 0;

            for placement in placements {
                output.push_str(&template[last..placement.start]);

                match &placement.directive {
                    Directive::Var { path, default } => {
                        let text = lookup_text(data, path, default.as_deref(), name)?;
                        output.push_str(&escape_html(&text));
                    }
                    Directive::Raw { path, default } => {
                        output.push_str(&lookup_text(data, path, default.as_deref(), name)?);
                    }
                    Directive::Include(partial) => {
                        let rendered = self.render_view(partial, data, url, depth + 1).await?;
                        output.push_str(&rendered);
                    }
                    Directive::Url(path) => output.push_str(&escape_html(&url.base_url(path))),
                    Directive::Asset(path) => {
                        output.push_str(&escape_html(&self.assets.asset_url(url, path, true)));
                    }
                }

                last = placement.end;
            }

            output.push_str(&template[last..]);
            Ok(output)
        })
    }

    fn view_path(&self, name: &str) -> Result<PathBuf, DomainError> {
        let relative = Path::new(name.trim_start_matches('/'));
        if name.trim().is_empty() || !is_safe_relative(relative) {
            return Err(DomainError::validation(format!("Invalid view name: '{}'", name)));
        }

        let mut path = self.views_dir.join(relative);
        if path.extension().is_none() {
            path.set_extension(VIEW_EXTENSION);
        }
        Ok(path)
    }

    async fn load(&self, name: &str) -> Result<Arc<String>, DomainError> {
        if let Some(cache) = &self.cache {
            if let Some(template) = cache.get(name).await {
                return Ok(template);
            }
        }

        let path = self.view_path(name)?;
        debug!(view = %name, path = %path.display(), "Loading view");

        let template = tokio::fs::read_to_string(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DomainError::not_found(format!("View '{}' not found", name))
            } else {
                DomainError::internal(format!("Failed to read view '{}': {}", name, e))
            }
        })?;
        let template = Arc::new(template);

        if let Some(cache) = &self.cache {
            cache.insert(name.to_string(), template.clone()).await;
        }

        Ok(template)
    }
}

fn parse_directives(template: &str) -> Vec<Placement> {
    DIRECTIVE_PATTERN
        .captures_iter(template)
        .filter_map(|cap| {
            let whole = cap.get(0)?;
            let kind = cap.get(1)?.as_str();
            let arg = cap.get(2)?.as_str().trim().to_string();
            let default = cap.get(3).map(|m| m.as_str().to_string());

            let directive = match kind {
                "var" => Directive::Var { path: arg, default },
                "raw" => Directive::Raw { path: arg, default },
                "include" => Directive::Include(arg),
                "url" => Directive::Url(arg),
                "asset" => Directive::Asset(arg),
                _ => return None,
            };

            Some(Placement {
                start: whole.start(),
                end: whole.end(),
                directive,
            })
        })
        .collect()
}

fn lookup<'a>(data: &'a ViewData, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = data.get(segments.next()?)?;

    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    Some(current)
}

fn lookup_text(
    data: &ViewData,
    path: &str,
    default: Option<&str>,
    view: &str,
) -> Result<String, DomainError> {
    match lookup(data, path) {
        Some(Value::Null) | None => default.map(|d| d.to_string()).ok_or_else(|| {
            DomainError::template(format!(
                "Missing required variable '{}' in view '{}'",
                path, view
            ))
        }),
        Some(value) => Ok(value_to_text(value).unwrap_or_else(|| value.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use serde_json::json;

    use super::*;

    fn renderer(dir: &Path, cache: bool) -> ViewRenderer {
        ViewRenderer::new(
            dir,
            AssetResolver::new("/public/assets", dir.join("assets"), true),
            cache,
        )
    }

    fn write(dir: &Path, name: &str, contents: &str) {
        let path = dir.join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn data(value: Value) -> ViewData {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_parse_directives() {
        let placements = parse_directives("<h1>${var:data.title:Home}</h1>${include:common/footer}");
        assert_eq!(placements.len(), 2);
        assert_eq!(
            placements[0].directive,
            Directive::Var {
                path: "data.title".to_string(),
                default: Some("Home".to_string())
            }
        );
        assert_eq!(
            placements[1].directive,
            Directive::Include("common/footer".to_string())
        );
    }

    #[tokio::test]
    async fn test_render_escapes_variables() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "home.html", "<p>${var:data.message}</p><div>${raw:data.message}</div>");

        let html = renderer(dir.path(), false)
            .render(
                "home",
                &data(json!({"data": {"message": "<b>hi</b>"}})),
                &UrlContext::default(),
            )
            .await
            .unwrap();

        assert_eq!(html, "<p>&lt;b&gt;hi&lt;/b&gt;</p><div><b>hi</b></div>");
    }

    #[tokio::test]
    async fn test_render_defaults_and_missing_variables() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "title.html", "${var:page_title:Default Title}");
        write(dir.path(), "strict.html", "${var:page_title}");

        let views = renderer(dir.path(), false);
        let empty = ViewData::new();
        let ctx = UrlContext::default();

        assert_eq!(views.render("title", &empty, &ctx).await.unwrap(), "Default Title");

        let err = views.render("strict", &empty, &ctx).await.unwrap_err();
        assert!(matches!(err, DomainError::Template { .. }));
    }

    #[tokio::test]
    async fn test_render_includes_partials() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "common/header.html", "<title>${var:page_title}</title>");
        write(dir.path(), "page.html", "${include:common/header}<main>${var:count}</main>");

        let html = renderer(dir.path(), false)
            .render("page", &data(json!({"page_title": "Home", "count": 3})), &UrlContext::default())
            .await
            .unwrap();

        assert_eq!(html, "<title>Home</title><main>3</main>");
    }

    #[tokio::test]
    async fn test_recursive_include_is_bounded() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "loop.html", "${include:loop}");

        let err = renderer(dir.path(), false)
            .render("loop", &ViewData::new(), &UrlContext::default())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("Include depth exceeded"));
    }

    #[tokio::test]
    async fn test_missing_view_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = renderer(dir.path(), false)
            .render("nope", &ViewData::new(), &UrlContext::default())
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_view_name_traversal_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = renderer(dir.path(), false)
            .render("../secret", &ViewData::new(), &UrlContext::default())
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_url_and_asset_directives() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "assets/css/style.css", "body{}");
        write(
            dir.path(),
            "links.html",
            r#"<a href="${url:/home}">x</a><img src="${asset:/images/none.png}">"#,
        );

        let ctx = UrlContext::new("http", "localhost:8080", "/my-app");
        let html = renderer(dir.path(), false)
            .render("links", &ViewData::new(), &ctx)
            .await
            .unwrap();

        assert_eq!(
            html,
            r#"<a href="http://localhost:8080/my-app/home">x</a><img src="">"#
        );
    }

    #[tokio::test]
    async fn test_cached_templates_are_reused() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "page.html", "first");

        let views = renderer(dir.path(), true);
        let ctx = UrlContext::default();
        assert_eq!(views.render("page", &ViewData::new(), &ctx).await.unwrap(), "first");

        write(dir.path(), "page.html", "second");
        assert_eq!(views.render("page", &ViewData::new(), &ctx).await.unwrap(), "first");
    }
}
