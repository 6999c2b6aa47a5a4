//! Relay Core - Shared data models, types, and errors

pub mod errors;
pub mod models;

pub use errors::{Error, Result};
pub use models::*;
