//! Controllers rendering views for the web routes

pub mod base;
pub mod home;

pub use base::BaseController;
pub use home::HomeController;
