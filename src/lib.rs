// Study-Local - Desktop client for a document Q&A study platform
//
// The webview renders; this process owns the conversation session state:
// - Threading remote history into conversations
// - Optimistic question submission with cancellation
// - Local persistence of the active thread and title overrides

// Core modules
pub mod api;
pub mod chat;
pub mod database;
pub mod state;

use std::sync::Arc;

use tauri::Manager;

use api::{BackendClient, BackendConfig};

// ============== Settings Commands ==============

#[tauri::command]
async fn db_get_setting(
    key: String,
    state: tauri::State<'_, state::AppState>,
) -> Result<Option<String>, String> {
    let db = state.db().await;
    db.get_setting(&key).map_err(|e| e.to_string())
}

#[tauri::command]
async fn db_set_setting(
    key: String,
    value: String,
    value_type: String,
    state: tauri::State<'_, state::AppState>,
) -> Result<(), String> {
    let db = state.db().await;
    db.set_setting(&key, &value, &value_type).map_err(|e| e.to_string())
}

#[tauri::command]
async fn db_get_all_settings(
    state: tauri::State<'_, state::AppState>,
) -> Result<Vec<database::Setting>, String> {
    let db = state.db().await;
    db.get_all_settings_list().map_err(|e| e.to_string())
}

#[tauri::command]
async fn db_delete_setting(
    key: String,
    state: tauri::State<'_, state::AppState>,
) -> Result<(), String> {
    let db = state.db().await;
    db.delete_setting(&key).map_err(|e| e.to_string())
}

// ============== Main App Entry ==============

pub fn run() {
    // Initialize env_logger to output to stderr (reads RUST_LOG env var)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    tauri::Builder::default()
        .plugin(tauri_plugin_dialog::init())
        .manage(state::AppState::new())
        .setup(|app| {
            log::info!("Study-Local application setup starting...");

            // Initialize database
            let db = match database::DatabaseManager::init_with_app_handle(&app.handle()) {
                Ok(db) => {
                    log::info!("Database initialized successfully");
                    db
                }
                Err(e) => {
                    log::error!("Failed to initialize database: {}", e);
                    return Err(Box::new(std::io::Error::new(
                        std::io::ErrorKind::Other,
                        format!("Database initialization failed: {}", e),
                    )));
                }
            };

            // Build the backend client from locally stored preferences
            let mut config = BackendConfig::default();
            if let Ok(Some(base_url)) = db.get_setting("api_base_url") {
                config.base_url = base_url;
            }
            if let Ok(Some(token)) = db.get_setting("api_token") {
                if !token.is_empty() {
                    config.api_token = Some(token);
                }
            }
            log::info!("Using backend at {}", config.base_url);
            let backend = Arc::new(BackendClient::new(config));

            // Wire the session controller over the shared database and client
            let app_state: tauri::State<state::AppState> = app.state();
            tauri::async_runtime::block_on(async {
                app_state.init_services(db, backend).await;
            });

            log::info!("Study-Local application setup complete");
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            // Chat commands
            chat::commands::chat_load_conversations,
            chat::commands::chat_select_conversation,
            chat::commands::chat_submit_question,
            chat::commands::chat_cancel_request,
            chat::commands::chat_rename_conversation,
            chat::commands::chat_delete_conversation,
            chat::commands::chat_get_view,
            chat::commands::chat_is_processing,
            // Backend API commands
            api::commands::api_list_documents,
            api::commands::api_check_connection,
            // Settings commands
            db_get_setting,
            db_set_setting,
            db_get_all_settings,
            db_delete_setting,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
