//! Shared types for the wamux gateway crates.

pub mod error;

pub use error::GatewayError;
