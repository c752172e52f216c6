//! Home page controller

use axum::response::Response;
use chrono::Local;
use serde_json::{json, Value};

use super::base::BaseController;
use crate::api::types::HttpError;
use crate::infrastructure::helpers::{date_remove_secs, render_select_options};
use crate::infrastructure::views::ViewData;

pub struct HomeController;

impl HomeController {
    pub async fn index(controller: BaseController) -> Result<Response, HttpError> {
        let now = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();

        let routes: Vec<Value> = controller
            .state
            .routes
            .named_routes()
            .into_iter()
            .map(|(name, pattern)| json!({"name": name, "pattern": pattern}))
            .collect();

        let mut data = ViewData::new();
        data.insert("page_title".to_string(), "Home".into());
        data.insert(
            "data".to_string(),
            json!({
                "title": "Home",
                "message": "Welcome to the home page",
            }),
        );
        data.insert("rendered_at".to_string(), date_remove_secs(&now)?.into());
        data.insert(
            "route_options".to_string(),
            render_select_options(&routes, "home", "name", "pattern").into(),
        );

        controller.render("home", &data).await
    }

    pub async fn error(controller: BaseController) -> Result<Response, HttpError> {
        let mut data = ViewData::new();
        data.insert("page_title".to_string(), "Error".into());
        data.insert(
            "data".to_string(),
            json!({
                "title": "Error",
                "message": "An example error page rendered by a controller",
            }),
        );

        controller.render("error", &data).await
    }
}
