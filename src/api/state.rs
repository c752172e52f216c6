//! Application state for shared services

use std::sync::Arc;

use crate::api::routes::RouteTable;
use crate::config::AppSettings;
use crate::infrastructure::database::{BaseModel, DatabaseService};
use crate::infrastructure::helpers::AssetResolver;
use crate::infrastructure::upload::UploadHelper;
use crate::infrastructure::views::ViewRenderer;

/// Services shared by every handler.
///
/// Every service is built once at startup; the database pool connects on
/// first use.
#[derive(Debug, Clone)]
pub struct AppState {
    pub settings: Arc<AppSettings>,
    pub views: Arc<ViewRenderer>,
    pub db: Arc<DatabaseService>,
    pub routes: Arc<RouteTable>,
    pub assets: AssetResolver,
    pub uploads: Arc<UploadHelper>,
}

impl AppState {
    pub fn new(settings: AppSettings) -> Self {
        let config = settings.settings();
        let views = ViewRenderer::from_settings(&config.app);
        let assets = views.assets().clone();
        let db = DatabaseService::new(config.db.clone());
        let routes = RouteTable::with_defaults(config.app.normalized_base_path());
        let uploads = UploadHelper::from_settings(config);

        Self {
            settings: Arc::new(settings),
            views: Arc::new(views),
            db: Arc::new(db),
            routes: Arc::new(routes),
            assets,
            uploads: Arc::new(uploads),
        }
    }

    pub fn base_path(&self) -> &str {
        self.routes.base_path()
    }

    pub fn display_error_details(&self) -> bool {
        self.settings.settings().error.display_error_details
    }

    pub fn debug_mode(&self) -> bool {
        self.settings.settings().app.debug_mode
    }

    /// Model base sharing the application's database connection
    pub fn model(&self) -> BaseModel {
        BaseModel::new(Arc::clone(&self.db))
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{AppEnv, Settings};

    use super::*;

    #[test]
    fn test_state_uses_normalized_base_path() {
        let mut settings = Settings::default();
        settings.app.base_path = "my-app/".to_string();
        let settings = AppSettings::from_settings(AppEnv::Dev, settings).unwrap();

        let state = AppState::new(settings);
        assert_eq!(state.base_path(), "/my-app");
        assert!(!state.db.is_connected());
        assert!(!state.display_error_details());
    }
}
