//! HTTP middleware

pub mod error_handler;
pub mod logging;

pub use error_handler::{error_handling_middleware, ErrorFormat};
pub use logging::logging_middleware;
