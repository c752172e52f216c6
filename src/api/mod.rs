//! HTTP layer: routes, controllers and middleware

pub mod controllers;
pub mod middleware;
pub mod rest;
pub mod router;
pub mod routes;
pub mod state;
pub mod types;
pub mod web;

pub use router::create_router;
pub use routes::{RouteError, RouteTable};
pub use state::AppState;
