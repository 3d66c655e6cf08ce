//! Session store - the caches behind the chat screen
//!
//! Owned exclusively by the controller and mutated only under its lock.
//! Writes replace whole entries so readers always see settled snapshots,
//! never a half-applied update.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::api::types::HistoryRecord;
use super::request_registry::RequestId;
use super::types::{messages_from_records, ChatMessage, ChatView, ConversationSummary, ThreadId};

/// One submission awaiting its response. Created on submit, destroyed on
/// settlement, failure, or cancellation - it never outlives its request.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub id: RequestId,
    /// The typed question, kept for rollback into the input field
    pub question: String,
    pub document_id: Option<String>,
    /// Thread that was active at submit time; settlement prefers it over
    /// whatever thread the backend reports
    pub thread_at_submit: Option<ThreadId>,
}

/// Mutable session state for the chat screen
#[derive(Default)]
pub struct SessionStore {
    /// Committed exchanges per thread, oldest first
    pub records: HashMap<ThreadId, Vec<HistoryRecord>>,
    /// Rendered messages per thread; survives switching away so returning to
    /// a thread needs no reload
    pub messages: HashMap<ThreadId, Vec<ChatMessage>>,
    /// Sidebar entries, newest first; re-sorted only on full reloads
    pub conversations: Vec<ConversationSummary>,
    /// Currently displayed thread
    pub active: Option<ThreadId>,
    /// Messages currently displayed; the only place optimistic/typing
    /// placeholders ever live
    pub live: Vec<ChatMessage>,
    /// The single in-flight submission, if any
    pub pending: Option<PendingRequest>,
    /// Most recent operation failure, surfaced as the error banner
    pub last_error: Option<String>,
    /// When the user last cancelled a request; anchors the cleanup window
    pub last_cancel_at: Option<DateTime<Utc>>,
}

impl SessionStore {
    /// Snapshot for the webview
    pub fn view(&self) -> ChatView {
        ChatView {
            conversations: self.conversations.clone(),
            active_id: self.active.clone(),
            messages: self.live.clone(),
            busy: self.pending.is_some(),
            error: self.last_error.clone(),
        }
    }

    /// Remove optimistic/typing placeholders from the live view
    pub fn strip_transient(&mut self) {
        self.live.retain(|m| !m.is_transient());
    }

    /// Settled messages for a thread: the live view when it is active
    /// (minus placeholders), otherwise its cache entry
    pub fn settled_messages(&self, id: &ThreadId) -> Vec<ChatMessage> {
        let source: &[ChatMessage] = if self.active.as_ref() == Some(id) {
            &self.live
        } else {
            self.messages.get(id).map(Vec::as_slice).unwrap_or(&[])
        };
        source.iter().filter(|m| !m.is_transient()).cloned().collect()
    }

    /// Install a thread's messages, mirroring them into the live view when
    /// the thread is active
    pub fn install_messages(&mut self, id: &ThreadId, messages: Vec<ChatMessage>) {
        if self.active.as_ref() == Some(id) {
            self.live = messages.clone();
        }
        self.messages.insert(id.clone(), messages);
    }

    /// Rebuild a thread's rendered messages from its record cache.
    /// Returns false when no records are cached for it.
    pub fn rebuild_messages(&mut self, id: &ThreadId) -> bool {
        let messages = match self.records.get(id) {
            Some(records) if !records.is_empty() => messages_from_records(records),
            _ => return false,
        };
        self.install_messages(id, messages);
        true
    }

    /// Drop every cache entry for a thread; clears the active pointer if it
    /// pointed there
    pub fn purge_thread(&mut self, id: &ThreadId) {
        self.records.remove(id);
        self.messages.remove(id);
        self.conversations.retain(|c| &c.id != id);
        if self.active.as_ref() == Some(id) {
            self.active = None;
            self.live.clear();
        }
    }

    /// Re-key every cache entry from a placeholder id to its server id
    pub fn migrate_thread(&mut self, from: &ThreadId, to: &ThreadId) {
        if let Some(records) = self.records.remove(from) {
            self.records.insert(to.clone(), records);
        }
        if let Some(messages) = self.messages.remove(from) {
            self.messages.insert(to.clone(), messages);
        }
        for conversation in &mut self.conversations {
            if &conversation.id == from {
                conversation.id = to.clone();
            }
        }
        if self.active.as_ref() == Some(from) {
            self.active = Some(to.clone());
        }
    }

    pub fn summary(&self, id: &ThreadId) -> Option<&ConversationSummary> {
        self.conversations.iter().find(|c| &c.id == id)
    }

    pub fn summary_mut(&mut self, id: &ThreadId) -> Option<&mut ConversationSummary> {
        self.conversations.iter_mut().find(|c| &c.id == id)
    }

    /// Every thread id any cache currently knows about
    pub fn known_threads(&self) -> Vec<ThreadId> {
        let mut ids: Vec<ThreadId> = self.records.keys().cloned().collect();
        for id in self.messages.keys() {
            if !ids.contains(id) {
                ids.push(id.clone());
            }
        }
        for conversation in &self.conversations {
            if !ids.contains(&conversation.id) {
                ids.push(conversation.id.clone());
            }
        }
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote(id: &str) -> ThreadId {
        ThreadId::Remote(id.to_string())
    }

    fn settled_pair(question: &str, answer: &str) -> Vec<ChatMessage> {
        vec![ChatMessage::user(question), ChatMessage::assistant(answer, vec![])]
    }

    #[test]
    fn test_strip_transient_keeps_settled_messages() {
        let mut store = SessionStore::default();
        store.live = settled_pair("q", "a");
        store.live.push(ChatMessage::pending_user("next?"));
        store.live.push(ChatMessage::typing());

        store.strip_transient();
        assert_eq!(store.live, settled_pair("q", "a"));
    }

    #[test]
    fn test_settled_messages_prefers_live_for_active_thread() {
        let mut store = SessionStore::default();
        let id = remote("c1");
        store.active = Some(id.clone());
        store.messages.insert(id.clone(), settled_pair("stale", "stale"));
        store.live = settled_pair("fresh", "fresh");
        store.live.push(ChatMessage::typing());

        let settled = store.settled_messages(&id);
        assert_eq!(settled, settled_pair("fresh", "fresh"));

        // Inactive threads come from the cache
        let other = remote("c2");
        store.messages.insert(other.clone(), settled_pair("other", "other"));
        assert_eq!(store.settled_messages(&other), settled_pair("other", "other"));
    }

    #[test]
    fn test_install_messages_mirrors_to_live_when_active() {
        let mut store = SessionStore::default();
        let id = remote("c1");
        store.active = Some(id.clone());

        store.install_messages(&id, settled_pair("q", "a"));
        assert_eq!(store.live, settled_pair("q", "a"));

        let other = remote("c2");
        store.install_messages(&other, settled_pair("x", "y"));
        // Installing an inactive thread leaves the live view alone
        assert_eq!(store.live, settled_pair("q", "a"));
    }

    #[test]
    fn test_migrate_thread_preserves_content_and_cleans_old_key() {
        let mut store = SessionStore::default();
        let from = ThreadId::Local(17);
        let to = remote("c9");

        store.messages.insert(from.clone(), settled_pair("q", "a"));
        store.conversations.push(ConversationSummary {
            id: from.clone(),
            question: "q".to_string(),
            answer: "a".to_string(),
            created_at: Utc::now(),
            document_id: None,
            title: None,
            exchange_count: 1,
        });
        store.active = Some(from.clone());

        store.migrate_thread(&from, &to);

        assert!(store.messages.get(&from).is_none());
        assert_eq!(store.messages.get(&to).unwrap(), &settled_pair("q", "a"));
        assert_eq!(store.conversations[0].id, to);
        assert_eq!(store.active, Some(to));
    }

    #[test]
    fn test_purge_thread_clears_active_pointer() {
        let mut store = SessionStore::default();
        let id = remote("c1");
        store.active = Some(id.clone());
        store.live = settled_pair("q", "a");
        store.messages.insert(id.clone(), settled_pair("q", "a"));

        store.purge_thread(&id);

        assert!(store.active.is_none());
        assert!(store.live.is_empty());
        assert!(store.messages.is_empty());
    }
}
