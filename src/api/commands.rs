//! Backend API commands - document listing and connectivity

use tauri::State;

use crate::state::AppState;
use super::types::DocumentInfo;

/// List the user's documents for the question scope picker
#[tauri::command]
pub async fn api_list_documents(
    state: State<'_, AppState>,
) -> Result<Vec<DocumentInfo>, String> {
    let backend = state.backend().await;
    backend.list_documents().await.map_err(|e| e.to_string())
}

/// Check that the configured backend is reachable
#[tauri::command]
pub async fn api_check_connection(state: State<'_, AppState>) -> Result<String, String> {
    let backend = state.backend().await;
    backend.check_connection().await.map_err(|e| e.to_string())
}
