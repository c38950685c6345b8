//! Library entrypoint for aliceblue-bot.
//!
//! Exposes all modules so integration tests can import them.

pub mod api;
pub mod auth;
pub mod config;
pub mod data;
pub mod notify;
pub mod signal;
