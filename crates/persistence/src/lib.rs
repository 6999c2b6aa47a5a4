//! Relay Persistence - Session storage and encryption layer

pub mod encryption;
pub mod sqlite;
pub mod store;

pub use encryption::derive_machine_key;
pub use encryption::TokenEncryptor;
pub use sqlite::Database;
pub use store::SessionStore;
