//! History API trait
//!
//! The seam between the conversation controller and the remote backend.
//! Production code uses BackendClient; tests substitute a scripted fake.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::error::ApiError;
use super::types::{AskRequest, AskResponse, HistoryRecord};

/// Remote history store operations the conversation controller relies on
#[async_trait]
pub trait HistoryApi: Send + Sync {
    /// Submit a question; the backend answers it and persists the exchange.
    /// The cancel token aborts the wait client-side only - the backend may
    /// still commit a result after the abort.
    async fn ask(
        &self,
        request: AskRequest,
        cancel: CancellationToken,
    ) -> Result<AskResponse, ApiError>;

    /// List history records for the current user, newest first
    async fn list_history(
        &self,
        document_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<HistoryRecord>, ApiError>;

    /// Delete a single history record. Not-found counts as success.
    async fn delete_record(&self, history_id: &str) -> Result<(), ApiError>;

    /// Delete every record in a conversation. Not-found counts as success.
    async fn delete_conversation(&self, conversation_id: &str) -> Result<(), ApiError>;
}
