//! Infrastructure layer - storage, views, uploads and logging

pub mod database;
pub mod helpers;
pub mod logging;
pub mod upload;
pub mod views;
