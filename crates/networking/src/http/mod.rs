//! HTTP layer for the relay backend

mod client;

pub use client::ConsoleClient;
