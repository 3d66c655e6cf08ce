//! Conversation session controller
//!
//! Translates remote history records into threaded conversations, tracks the
//! active thread, submits questions against it, and keeps the optimistic UI
//! state consistent with what the backend eventually committed - including
//! when the user cancels mid-flight.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::api::types::{AskRequest, HistoryRecord};
use crate::api::HistoryApi;
use crate::database::DatabaseManager;

use super::request_registry::{self, RequestId};
use super::store::{PendingRequest, SessionStore};
use super::types::{
    thread_of, ChatMessage, ChatView, ConversationSummary, SubmitOutcome, ThreadId,
};

/// Settings key remembering the active thread across restarts
const SETTING_ACTIVE_CONVERSATION: &str = "active_conversation_id";

/// Errors surfaced by session operations
#[derive(Debug, Clone, PartialEq)]
pub enum SessionError {
    /// Another question is already in flight
    Busy,
    /// The question text was empty
    EmptyQuestion,
    /// A remote call failed
    Backend(String),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Busy => write!(f, "A question is already being processed"),
            SessionError::EmptyQuestion => write!(f, "Question must not be empty"),
            SessionError::Backend(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for SessionError {}

/// Tunables for the controller
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Records fetched per full history reload
    pub history_page_size: usize,
    /// Wait before the post-cancellation cleanup sweep; must outlast backend
    /// processing (retrieval plus generation can take several seconds)
    pub cleanup_delay: Duration,
    /// Cleanup window opens this long before the cancel instant
    /// (tolerates clock skew between client and backend)
    pub cleanup_window_before: chrono::Duration,
    /// Cleanup window closes this long after the cancel instant
    pub cleanup_window_after: chrono::Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            history_page_size: 100,
            cleanup_delay: Duration::from_secs(7),
            cleanup_window_before: chrono::Duration::seconds(2),
            cleanup_window_after: chrono::Duration::seconds(8),
        }
    }
}

/// Owns the session store and runs every state transition of the chat screen
pub struct SessionController {
    api: Arc<dyn HistoryApi>,
    db: Arc<DatabaseManager>,
    config: ControllerConfig,
    store: Mutex<SessionStore>,
}

impl SessionController {
    pub fn new(api: Arc<dyn HistoryApi>, db: Arc<DatabaseManager>) -> Self {
        Self::with_config(api, db, ControllerConfig::default())
    }

    pub fn with_config(
        api: Arc<dyn HistoryApi>,
        db: Arc<DatabaseManager>,
        config: ControllerConfig,
    ) -> Self {
        Self {
            api,
            db,
            config,
            store: Mutex::new(SessionStore::default()),
        }
    }

    /// Current snapshot of the chat screen
    pub async fn view(&self) -> ChatView {
        self.store.lock().await.view()
    }

    /// True while a question is in flight
    pub async fn is_busy(&self) -> bool {
        self.store.lock().await.pending.is_some()
    }

    /// Reload all history from the backend and rebuild the conversation list.
    ///
    /// Threads are grouped by conversation id (records without one become
    /// singleton threads keyed by their own id) and sorted newest first.
    /// Locally cached threads the server no longer knows are purged; the
    /// remembered active thread is restored when it still exists. On fetch
    /// failure no cache is touched.
    pub async fn load_conversations(&self) -> Result<ChatView, SessionError> {
        let fetched = match self
            .api
            .list_history(None, self.config.history_page_size)
            .await
        {
            Ok(records) => records,
            Err(e) => {
                let message = e.to_string();
                let mut store = self.store.lock().await;
                store.last_error = Some(message.clone());
                return Err(SessionError::Backend(message));
            }
        };

        // Group records into threads, oldest exchange first within each
        let mut groups: std::collections::HashMap<ThreadId, Vec<HistoryRecord>> =
            std::collections::HashMap::new();
        for record in fetched {
            groups.entry(thread_of(&record)).or_default().push(record);
        }
        for records in groups.values_mut() {
            records.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        }

        let titles: std::collections::HashMap<String, String> = self
            .db
            .get_all_conversation_titles()
            .map(|rows| rows.into_iter().map(|t| (t.conversation_id, t.title)).collect())
            .unwrap_or_else(|e| {
                log::warn!("Failed to load conversation titles: {:#}", e);
                Default::default()
            });

        let mut summaries: Vec<ConversationSummary> = groups
            .iter()
            .map(|(id, records)| {
                let first = &records[0];
                let last = &records[records.len() - 1];
                ConversationSummary {
                    id: id.clone(),
                    question: first.question.clone(),
                    answer: last.answer.clone(),
                    created_at: last.created_at,
                    document_id: first.document_id.clone(),
                    title: titles.get(&id.to_string()).cloned(),
                    exchange_count: records.len(),
                }
            })
            .collect();
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let mut store = self.store.lock().await;
        let previous_active = store.active.clone();

        // Reconcile: threads the server no longer reports disappear from
        // every local cache
        for id in store.known_threads() {
            if !groups.contains_key(&id) {
                store.records.remove(&id);
                store.messages.remove(&id);
                if store.active.as_ref() == Some(&id) {
                    store.active = None;
                    store.live.clear();
                }
                if let Err(e) = self.db.delete_conversation_title(&id.to_string()) {
                    log::warn!("Failed to drop stale title for {}: {:#}", id, e);
                }
            }
        }

        store.records = groups;
        store.conversations = summaries;

        if store.active.is_none() {
            let remembered = self
                .db
                .get_setting(SETTING_ACTIVE_CONVERSATION)
                .ok()
                .flatten()
                .map(|s| ThreadId::parse(&s))
                .filter(|id| store.records.contains_key(id));
            let newest = store.conversations.first().map(|c| c.id.clone());
            if let Some(id) = remembered.or(newest) {
                activate_thread(&mut store, &id);
            }
        } else if let Some(id) = store.active.clone() {
            if store.active != previous_active || store.live.is_empty() {
                activate_thread(&mut store, &id);
            }
        }

        self.remember_active(store.active.as_ref());
        store.last_error = None;
        Ok(store.view())
    }

    /// Switch the active thread. Cached messages show instantly; a thread
    /// with cold caches falls back to its summary exchange and triggers a
    /// background reload to repair the cache. Switching away never discards
    /// the previous thread's rendered messages.
    pub async fn select_conversation(
        self: &Arc<Self>,
        id: ThreadId,
    ) -> Result<ChatView, SessionError> {
        let (view, needs_reload) = {
            let mut store = self.store.lock().await;
            let needs_reload = activate_thread(&mut store, &id);
            (store.view(), needs_reload)
        };

        self.remember_active(Some(&id));

        if needs_reload {
            let controller = Arc::clone(self);
            tokio::spawn(async move {
                if let Err(e) = controller.load_conversations().await {
                    log::warn!("Background reconciliation reload failed: {}", e);
                }
            });
        }

        Ok(view)
    }

    /// Submit a question against the active thread (or start a new one).
    ///
    /// At most one submission may be in flight; the optimistic user turn and
    /// a typing placeholder are shown until the backend settles. A response
    /// whose request id no longer matches the pending slot is discarded
    /// without touching any state.
    pub async fn submit_question(
        &self,
        question: String,
        document_id: Option<String>,
    ) -> Result<SubmitOutcome, SessionError> {
        if question.trim().is_empty() {
            return Err(SessionError::EmptyQuestion);
        }

        let (request_id, token, thread_at_submit) = {
            let mut store = self.store.lock().await;
            if store.pending.is_some() {
                return Err(SessionError::Busy);
            }

            // Self-healing: drop any stale placeholders a crashed request
            // left behind before adding ours
            store.strip_transient();

            let request_id = RequestId::next();
            let token = request_registry::register_request(request_id);
            let thread_at_submit = store.active.clone();

            store.live.push(ChatMessage::pending_user(question.clone()));
            store.live.push(ChatMessage::typing());
            store.pending = Some(PendingRequest {
                id: request_id,
                question: question.clone(),
                document_id: document_id.clone(),
                thread_at_submit: thread_at_submit.clone(),
            });
            store.last_error = None;

            (request_id, token, thread_at_submit)
        };

        let request = AskRequest {
            question: question.clone(),
            document_ids: document_id.clone().map(|id| vec![id]),
            // Placeholder ids exist only on this client and are never sent
            conversation_id: thread_at_submit
                .as_ref()
                .and_then(|id| id.as_remote())
                .map(String::from),
        };

        let result = self.api.ask(request, token).await;
        request_registry::finish_request(request_id);

        let mut store = self.store.lock().await;

        // Stale-response guard: if the pending slot no longer carries our
        // request id, the user cancelled or moved on. Nothing may change.
        if store.pending.as_ref().map(|p| p.id) != Some(request_id) {
            return Ok(SubmitOutcome::Discarded);
        }

        let response = match result {
            Ok(response) => response,
            Err(e) if e.is_cancelled() => {
                // The token fired without the cancel handler clearing the
                // slot; roll back the same way it would have
                store.pending = None;
                store.strip_transient();
                return Ok(SubmitOutcome::Discarded);
            }
            Err(e) => {
                let message = e.to_string();
                store.pending = None;
                store.strip_transient();
                store.last_error = Some(message.clone());
                return Ok(SubmitOutcome::Rejected {
                    error: message,
                    restored_input: question,
                });
            }
        };

        let Some(pending) = store.pending.take() else {
            return Ok(SubmitOutcome::Discarded);
        };

        let now = Utc::now();
        let server_thread: Option<ThreadId> = response
            .conversation_id
            .clone()
            .or_else(|| response.history_id.clone())
            .map(ThreadId::Remote);

        // Target thread precedence: continuity with the thread active at
        // submit time wins over whatever the server reports; otherwise the
        // server id; otherwise a fresh placeholder
        let mut target = pending
            .thread_at_submit
            .clone()
            .or_else(|| server_thread.clone())
            .unwrap_or_else(ThreadId::fresh_local);

        store.strip_transient();

        let mut messages = store.settled_messages(&target);
        messages.push(ChatMessage::user(pending.question.clone()));
        messages.push(ChatMessage::assistant(
            response.answer.clone(),
            response.references.clone(),
        ));

        store.records.entry(target.clone()).or_default().push(HistoryRecord {
            id: response.history_id.clone().unwrap_or_default(),
            conversation_id: response
                .conversation_id
                .clone()
                .or_else(|| target.as_remote().map(String::from)),
            question: pending.question.clone(),
            answer: response.answer.clone(),
            references: response.references.clone(),
            document_id: pending.document_id.clone(),
            created_at: now,
        });

        // The settled exchange belongs to the target thread; make it active
        // so the next question continues it
        store.active = Some(target.clone());
        store.install_messages(&target, messages);

        // A placeholder thread the server just named gets every cache entry
        // re-keyed to the real id
        if !target.is_remote() {
            if let Some(server_id) = server_thread {
                store.migrate_thread(&target, &server_id);
                if let Err(e) = self
                    .db
                    .rename_conversation_title_key(&target.to_string(), &server_id.to_string())
                {
                    log::warn!("Failed to migrate title override: {:#}", e);
                }
                target = server_id;
            }
        }

        match store.summary_mut(&target) {
            Some(summary) => {
                summary.answer = response.answer.clone();
                summary.created_at = now;
                summary.exchange_count += 1;
            }
            None => {
                // New threads go to the top; the full re-sort only happens
                // on reloads to avoid visual jitter
                store.conversations.insert(
                    0,
                    ConversationSummary {
                        id: target.clone(),
                        question: pending.question.clone(),
                        answer: response.answer.clone(),
                        created_at: now,
                        document_id: pending.document_id.clone(),
                        title: None,
                        exchange_count: 1,
                    },
                );
            }
        }

        self.remember_active(store.active.as_ref());
        Ok(SubmitOutcome::Settled { view: store.view() })
    }

    /// Abort the in-flight question, roll back its optimistic messages, and
    /// return the typed text so the input field can be restored.
    ///
    /// The abort is advisory - the backend may still commit the answer - so
    /// a delayed sweep re-fetches history and deletes any record created
    /// inside a window around the cancel instant.
    pub async fn cancel_active_request(self: &Arc<Self>) -> Result<Option<String>, SessionError> {
        let (restored, cancelled_at) = {
            let mut store = self.store.lock().await;

            // Taking the slot clears the active-request marker before any
            // message state changes, so a response that is already racing us
            // is identified as stale
            let Some(pending) = store.pending.take() else {
                return Ok(None);
            };
            request_registry::cancel_request(pending.id);

            store.strip_transient();
            let now = Utc::now();
            store.last_cancel_at = Some(now);
            (pending.question, now)
        };

        let controller = Arc::clone(self);
        tokio::spawn(async move {
            controller.orphan_sweep(cancelled_at).await;
        });

        Ok(Some(restored))
    }

    /// Best-effort compensation for answers the backend committed after the
    /// user already dismissed them. Time-window based, not transactional.
    async fn orphan_sweep(&self, cancelled_at: DateTime<Utc>) {
        tokio::time::sleep(self.config.cleanup_delay).await;

        let records = match self
            .api
            .list_history(None, self.config.history_page_size)
            .await
        {
            Ok(records) => records,
            Err(e) => {
                log::warn!("Cancellation cleanup could not list history: {}", e);
                return;
            }
        };

        let window_start = cancelled_at - self.config.cleanup_window_before;
        let window_end = cancelled_at + self.config.cleanup_window_after;
        let orphans: Vec<HistoryRecord> = records
            .into_iter()
            .filter(|r| r.created_at >= window_start && r.created_at <= window_end)
            .collect();

        if orphans.is_empty() {
            return;
        }

        let mut deleted = 0usize;
        for orphan in &orphans {
            match self.api.delete_record(&orphan.id).await {
                Ok(()) => deleted += 1,
                Err(e) => log::warn!("Failed to delete orphaned record {}: {}", orphan.id, e),
            }
        }
        log::info!("Cancellation cleanup removed {} orphaned record(s)", deleted);

        if deleted > 0 {
            if let Err(e) = self.load_conversations().await {
                log::warn!("Post-cleanup reload failed: {}", e);
                return;
            }
            // The reload keeps existing rendered caches; rebuild the active
            // thread from fresh records so the deleted exchange disappears
            let mut store = self.store.lock().await;
            if let Some(id) = store.active.clone() {
                if !store.rebuild_messages(&id) {
                    store.install_messages(&id, Vec::new());
                }
            }
        }
    }

    /// Store a user-assigned thread title locally. The backend has no title
    /// field, so this never makes a remote call. An empty title clears the
    /// override.
    pub async fn rename_conversation(
        &self,
        id: ThreadId,
        title: String,
    ) -> Result<ChatView, SessionError> {
        let trimmed = title.trim();

        let result = if trimmed.is_empty() {
            self.db.delete_conversation_title(&id.to_string())
        } else {
            self.db.set_conversation_title(&id.to_string(), trimmed)
        };
        if let Err(e) = result {
            log::warn!("Failed to persist conversation title: {:#}", e);
        }

        let mut store = self.store.lock().await;
        if let Some(summary) = store.summary_mut(&id) {
            summary.title = if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            };
        }
        Ok(store.view())
    }

    /// Delete a thread remotely (cascading) and locally. An
    /// already-deleted thread counts as success. If the deleted thread was
    /// active, the next-newest remaining one takes over.
    pub async fn delete_conversation(
        self: &Arc<Self>,
        id: ThreadId,
    ) -> Result<ChatView, SessionError> {
        if let Some(remote_id) = id.as_remote() {
            if let Err(e) = self.api.delete_conversation(remote_id).await {
                let message = e.to_string();
                let mut store = self.store.lock().await;
                store.last_error = Some(message.clone());
                return Err(SessionError::Backend(message));
            }
        }

        {
            let mut store = self.store.lock().await;
            let was_active = store.active.as_ref() == Some(&id);
            store.purge_thread(&id);
            if was_active {
                if let Some(next) = store.conversations.first().map(|c| c.id.clone()) {
                    activate_thread(&mut store, &next);
                }
            }
            self.remember_active(store.active.as_ref());
        }

        if let Err(e) = self.db.delete_conversation_title(&id.to_string()) {
            log::warn!("Failed to drop title for deleted thread: {:#}", e);
        }

        // Reconcile with the backend's view of the world
        if let Err(e) = self.load_conversations().await {
            log::warn!("Post-delete reload failed: {}", e);
        }

        Ok(self.view().await)
    }

    /// Remember (or forget) the active thread across restarts. Best-effort:
    /// a failed write degrades to "no remembered preference".
    fn remember_active(&self, id: Option<&ThreadId>) {
        let result = match id {
            Some(id) => self
                .db
                .set_setting(SETTING_ACTIVE_CONVERSATION, &id.to_string(), "string"),
            None => self.db.delete_setting(SETTING_ACTIVE_CONVERSATION),
        };
        if let Err(e) = result {
            log::warn!("Failed to persist active conversation: {:#}", e);
        }
    }

    #[cfg(test)]
    pub(crate) async fn known_threads(&self) -> Vec<ThreadId> {
        self.store.lock().await.known_threads()
    }
}

/// Make a thread active and materialize its messages from the best source
/// available: rendered cache, then record cache, then the summary's first
/// exchange. Returns true when only the summary fallback was available and
/// a reconciliation reload should repair the cache.
fn activate_thread(store: &mut SessionStore, id: &ThreadId) -> bool {
    store.active = Some(id.clone());

    if let Some(cached) = store.messages.get(id) {
        if !cached.is_empty() {
            store.live = cached.clone();
            return false;
        }
    }

    if store.rebuild_messages(id) {
        return false;
    }

    if let Some(summary) = store.summary(id).cloned() {
        let fallback = vec![
            ChatMessage::user(summary.question),
            ChatMessage::assistant(summary.answer, vec![]),
        ];
        store.install_messages(id, fallback);
        return true;
    }

    store.install_messages(id, Vec::new());
    false
}
