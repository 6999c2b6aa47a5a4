//! Relay Networking - HTTP client and login handshake

pub mod auth;
pub mod http;

pub use auth::{AuthBridge, LoginHandshake};
pub use http::ConsoleClient;
