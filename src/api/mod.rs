//! Backend API module
//!
//! HTTP client wrappers around the remote study platform (question answering,
//! history, documents). The controller consumes it through the HistoryApi trait.

pub mod client;
pub mod commands;
pub mod error;
pub mod history;
pub mod types;

pub use client::{BackendClient, BackendConfig};
pub use error::ApiError;
pub use history::HistoryApi;
