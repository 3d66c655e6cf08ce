//! Error types for backend API calls

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error types for remote API operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ApiError {
    /// The caller aborted the request; never surfaced to the user
    Cancelled,
    /// The resource does not exist (deletes treat this as already satisfied)
    NotFound,
    /// The backend rejected the request
    Api { status: u16, message: String },
    /// Connection, DNS, or timeout failure
    Network(String),
    /// The backend answered with a body we could not decode
    InvalidResponse(String),
}

impl ApiError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ApiError::Cancelled)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Cancelled => write!(f, "Request cancelled"),
            ApiError::NotFound => write!(f, "Not found"),
            ApiError::Api { status, message } => write!(f, "Backend error ({}): {}", status, message),
            ApiError::Network(msg) => write!(f, "Network error: {}", msg),
            ApiError::InvalidResponse(msg) => write!(f, "Invalid response: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}
