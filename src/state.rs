// State management for Study-Local

use std::sync::Arc;
use tokio::sync::RwLock;

use crate::api::BackendClient;
use crate::chat::SessionController;
use crate::database::DatabaseManager;

/// Wrapper around DatabaseManager for shared access
pub struct DbWrapper {
    inner: Arc<DatabaseManager>,
}

impl DbWrapper {
    pub fn new(db: DatabaseManager) -> Self {
        Self {
            inner: Arc::new(db),
        }
    }

    pub fn inner(&self) -> &DatabaseManager {
        &self.inner
    }

    pub fn arc(&self) -> Arc<DatabaseManager> {
        self.inner.clone()
    }
}

impl std::ops::Deref for DbWrapper {
    type Target = DatabaseManager;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

pub struct AppState {
    /// Database manager for SQLite persistence
    database: Arc<RwLock<Option<DbWrapper>>>,
    /// HTTP client for the remote study platform
    backend: Arc<RwLock<Option<Arc<BackendClient>>>>,
    /// Conversation session controller
    controller: Arc<RwLock<Option<Arc<SessionController>>>>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            database: Arc::new(RwLock::new(None)),
            backend: Arc::new(RwLock::new(None)),
            controller: Arc::new(RwLock::new(None)),
        }
    }

    /// Initialize the database, the backend client, and the session
    /// controller built over both
    pub async fn init_services(&self, db: DatabaseManager, backend: Arc<BackendClient>) {
        let wrapper = DbWrapper::new(db);
        let db_arc = wrapper.arc();
        {
            let mut guard = self.database.write().await;
            *guard = Some(wrapper);
        }

        let controller = Arc::new(SessionController::new(backend.clone(), db_arc));
        {
            let mut guard = self.backend.write().await;
            *guard = Some(backend);
        }
        let mut guard = self.controller.write().await;
        *guard = Some(controller);
    }

    /// Get the database manager, panicking if not initialized
    /// Use this only when you're sure the database is initialized
    pub async fn db(&self) -> impl std::ops::Deref<Target = DatabaseManager> + '_ {
        let guard = self.database.read().await;
        tokio::sync::RwLockReadGuard::map(guard, |opt| {
            opt.as_ref().expect("Database not initialized").inner()
        })
    }

    /// Get the backend client for async operations
    pub async fn backend(&self) -> Arc<BackendClient> {
        let guard = self.backend.read().await;
        guard.as_ref().expect("Backend client not initialized").clone()
    }

    /// Get the session controller for async operations
    pub async fn controller(&self) -> Arc<SessionController> {
        let guard = self.controller.read().await;
        guard
            .as_ref()
            .expect("Session controller not initialized")
            .clone()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
