//! Broker API surface: session acquisition, authenticated client, errors.

pub mod client;
pub mod errors;
pub mod session;

pub use client::BrokerClient;
pub use errors::{ApiError, SessionError};
pub use session::SessionAcquirer;
