//! Named routes and URL generation

use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;

pub const HOME_INDEX: &str = "home.index";
pub const HOME: &str = "home";
pub const HOME_ERROR: &str = "home.error";
pub const PING: &str = "ping";
pub const ERROR: &str = "error";
pub const DEBUG_SETTINGS: &str = "debug.settings";
pub const API_STATUS: &str = "api.status";
pub const API_UPLOADS: &str = "api.uploads";

/// Mount point of the JSON API
pub const API_PREFIX: &str = "/api";

/// Path patterns; API paths are relative to [`API_PREFIX`]
pub mod paths {
    pub const HOME_INDEX: &str = "/";
    pub const HOME: &str = "/home";
    pub const HOME_ERROR: &str = "/home/error";
    pub const PING: &str = "/ping";
    pub const ERROR: &str = "/error";
    pub const DEBUG_SETTINGS: &str = "/debug/settings";
    pub const API_STATUS: &str = "/status";
    pub const API_UPLOADS: &str = "/uploads";
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("Route '{0}' is not defined")]
    UnknownRoute(String),

    #[error("Missing argument '{argument}' for route '{route}'")]
    MissingArgument { route: String, argument: String },

    #[error("Invalid query string: {0}")]
    Query(String),
}

/// Route names mapped to their path patterns, e.g. `/users/{id}`
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    base_path: String,
    routes: HashMap<String, String>,
}

impl RouteTable {
    pub fn new(base_path: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            routes: HashMap::new(),
        }
    }

    /// Table with every route the application serves
    pub fn with_defaults(base_path: impl Into<String>) -> Self {
        Self::new(base_path)
            .route(HOME_INDEX, paths::HOME_INDEX)
            .route(HOME, paths::HOME)
            .route(HOME_ERROR, paths::HOME_ERROR)
            .route(PING, paths::PING)
            .route(ERROR, paths::ERROR)
            .route(DEBUG_SETTINGS, paths::DEBUG_SETTINGS)
            .route(API_STATUS, format!("{}{}", API_PREFIX, paths::API_STATUS))
            .route(API_UPLOADS, format!("{}{}", API_PREFIX, paths::API_UPLOADS))
    }

    pub fn route(mut self, name: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.routes.insert(name.into(), pattern.into());
        self
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn pattern(&self, name: &str) -> Option<&str> {
        self.routes.get(name).map(String::as_str)
    }

    /// Route names with their patterns, sorted by name
    pub fn named_routes(&self) -> Vec<(&str, &str)> {
        let mut routes: Vec<_> = self
            .routes
            .iter()
            .map(|(name, pattern)| (name.as_str(), pattern.as_str()))
            .collect();
        routes.sort_unstable();
        routes
    }

    /// Build the path for `name`, prefixed with the base path.
    ///
    /// `{placeholder}` segments are filled from `args`; `query` is appended
    /// as an encoded query string when non-empty.
    pub fn url_for<Q>(
        &self,
        name: &str,
        args: &HashMap<String, String>,
        query: &Q,
    ) -> Result<String, RouteError>
    where
        Q: Serialize + ?Sized,
    {
        let pattern = self
            .pattern(name)
            .ok_or_else(|| RouteError::UnknownRoute(name.to_string()))?;

        let mut path = String::with_capacity(self.base_path.len() + pattern.len());
        path.push_str(&self.base_path);

        let mut rest = pattern;
        while let Some(open) = rest.find('{') {
            let Some(close) = rest[open..].find('}').map(|i| open + i) else {
                break;
            };

            path.push_str(&rest[..open]);
            let argument = &rest[open + 1..close];
            let value = args.get(argument).ok_or_else(|| RouteError::MissingArgument {
                route: name.to_string(),
                argument: argument.to_string(),
            })?;
            path.push_str(value);
            rest = &rest[close + 1..];
        }
        path.push_str(rest);

        if path.is_empty() {
            path.push('/');
        }

        let query =
            serde_urlencoded::to_string(query).map_err(|e| RouteError::Query(e.to_string()))?;
        if !query.is_empty() {
            path.push('?');
            path.push_str(&query);
        }

        Ok(path)
    }
}
