//! Data models and the polling quote feed.

pub mod models;
pub mod quote_feed;
