//! Chat commands - conversation list, selection, submission, cancellation

use tauri::State;

use crate::state::AppState;
use super::types::{ChatView, SubmitOutcome, ThreadId};

/// Reload all history and rebuild the threaded conversation list
#[tauri::command]
pub async fn chat_load_conversations(state: State<'_, AppState>) -> Result<ChatView, String> {
    let controller = state.controller().await;
    controller
        .load_conversations()
        .await
        .map_err(|e| e.to_string())
}

/// Switch the active conversation
#[tauri::command]
pub async fn chat_select_conversation(
    state: State<'_, AppState>,
    conversation_id: String,
) -> Result<ChatView, String> {
    let controller = state.controller().await;
    controller
        .select_conversation(ThreadId::parse(&conversation_id))
        .await
        .map_err(|e| e.to_string())
}

/// Submit a question against the active (or a brand-new) thread
#[tauri::command]
pub async fn chat_submit_question(
    state: State<'_, AppState>,
    question: String,
    document_id: Option<String>,
) -> Result<SubmitOutcome, String> {
    let controller = state.controller().await;
    controller
        .submit_question(question, document_id)
        .await
        .map_err(|e| e.to_string())
}

/// Cancel the in-flight question; returns the typed text for the input field
#[tauri::command]
pub async fn chat_cancel_request(state: State<'_, AppState>) -> Result<Option<String>, String> {
    let controller = state.controller().await;
    controller
        .cancel_active_request()
        .await
        .map_err(|e| e.to_string())
}

/// Rename a conversation (local-only; the backend has no title field)
#[tauri::command]
pub async fn chat_rename_conversation(
    state: State<'_, AppState>,
    conversation_id: String,
    title: String,
) -> Result<ChatView, String> {
    let controller = state.controller().await;
    controller
        .rename_conversation(ThreadId::parse(&conversation_id), title)
        .await
        .map_err(|e| e.to_string())
}

/// Delete a conversation and all its exchanges
#[tauri::command]
pub async fn chat_delete_conversation(
    state: State<'_, AppState>,
    conversation_id: String,
) -> Result<ChatView, String> {
    let controller = state.controller().await;
    controller
        .delete_conversation(ThreadId::parse(&conversation_id))
        .await
        .map_err(|e| e.to_string())
}

/// Current snapshot of the chat screen (for re-renders)
#[tauri::command]
pub async fn chat_get_view(state: State<'_, AppState>) -> Result<ChatView, String> {
    let controller = state.controller().await;
    Ok(controller.view().await)
}

/// Check whether a question is currently in flight
#[tauri::command]
pub async fn chat_is_processing(state: State<'_, AppState>) -> Result<bool, String> {
    let controller = state.controller().await;
    Ok(controller.is_busy().await)
}
