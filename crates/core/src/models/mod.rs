//! Data models for the relay console API

mod auth;
mod checkin;
mod credit;
mod user;

pub use auth::*;
pub use checkin::*;
pub use credit::*;
pub use user::*;
