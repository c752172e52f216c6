//! Domain layer - shared error type

pub mod error;

pub use error::DomainError;
