//! Conversation types and structures

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::api::types::{HistoryRecord, Reference};

/// Reserved prefix for thread ids that exist only on this client.
/// Ids carrying it must never be sent to the backend.
pub const LOCAL_THREAD_PREFIX: &str = "temp-";

/// Characters of the first question shown as a derived thread title
const TITLE_PREVIEW_CHARS: usize = 50;

/// Identity of a conversation thread
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ThreadId {
    /// Server-assigned conversation id
    Remote(String),
    /// Client-generated placeholder (millisecond timestamp), standing in for
    /// a thread the server has not acknowledged yet
    Local(i64),
}

impl ThreadId {
    /// Parse the string form used by the webview and local storage
    pub fn parse(s: &str) -> ThreadId {
        if let Some(rest) = s.strip_prefix(LOCAL_THREAD_PREFIX) {
            if let Ok(millis) = rest.parse::<i64>() {
                return ThreadId::Local(millis);
            }
        }
        ThreadId::Remote(s.to_string())
    }

    /// A fresh placeholder id for a thread awaiting its first server id
    pub fn fresh_local() -> ThreadId {
        ThreadId::Local(Utc::now().timestamp_millis())
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, ThreadId::Remote(_))
    }

    /// The id that may be transmitted to the backend, if any
    pub fn as_remote(&self) -> Option<&str> {
        match self {
            ThreadId::Remote(id) => Some(id),
            ThreadId::Local(_) => None,
        }
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThreadId::Remote(id) => write!(f, "{}", id),
            ThreadId::Local(millis) => write!(f, "{}{}", LOCAL_THREAD_PREFIX, millis),
        }
    }
}

impl Serialize for ThreadId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ThreadId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(ThreadId::parse(&s))
    }
}

/// The thread a history record belongs to: its conversation id, or its own
/// record id when the backend assigned none (singleton thread)
pub fn thread_of(record: &HistoryRecord) -> ThreadId {
    match &record.conversation_id {
        Some(id) => ThreadId::Remote(id.clone()),
        None => ThreadId::Remote(record.id.clone()),
    }
}

/// One rendered chat bubble
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub text: String,
    pub is_user: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<Vec<Reference>>,
    /// Optimistic user turn still awaiting its server response
    #[serde(default)]
    pub pending: bool,
    /// Assistant placeholder shown while the answer is generated
    #[serde(default)]
    pub typing: bool,
}

impl ChatMessage {
    /// A settled user turn
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_user: true,
            references: None,
            pending: false,
            typing: false,
        }
    }

    /// A settled assistant turn with its citations
    pub fn assistant(text: impl Into<String>, references: Vec<Reference>) -> Self {
        Self {
            text: text.into(),
            is_user: false,
            references: if references.is_empty() { None } else { Some(references) },
            pending: false,
            typing: false,
        }
    }

    /// The optimistic user turn shown before the backend confirms
    pub fn pending_user(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_user: true,
            references: None,
            pending: true,
            typing: false,
        }
    }

    /// The typing placeholder owned by an in-flight request
    pub fn typing() -> Self {
        Self {
            text: String::new(),
            is_user: false,
            references: None,
            pending: false,
            typing: true,
        }
    }

    /// True for messages a pending request owns (never part of settled state)
    pub fn is_transient(&self) -> bool {
        self.pending || self.typing
    }
}

/// Rebuild the rendered messages for a thread from its committed records
pub fn messages_from_records(records: &[HistoryRecord]) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(records.len() * 2);
    for record in records {
        messages.push(ChatMessage::user(record.question.clone()));
        messages.push(ChatMessage::assistant(
            record.answer.clone(),
            record.references.clone(),
        ));
    }
    messages
}

/// One sidebar entry for a conversation thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: ThreadId,
    /// First question of the thread (title source)
    pub question: String,
    /// Latest answer (preview)
    pub answer: String,
    /// Newest record time in the thread
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub document_id: Option<String>,
    /// User-assigned title override, if any
    #[serde(default)]
    pub title: Option<String>,
    pub exchange_count: usize,
}

impl ConversationSummary {
    /// The title shown in the sidebar: the override, or the first question
    /// truncated to a preview
    pub fn display_title(&self) -> String {
        if let Some(title) = &self.title {
            return title.clone();
        }
        let mut preview: String = self.question.chars().take(TITLE_PREVIEW_CHARS).collect();
        if self.question.chars().count() > TITLE_PREVIEW_CHARS {
            preview.push_str("...");
        }
        preview
    }
}

/// Snapshot of the chat screen state handed to the webview
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatView {
    pub conversations: Vec<ConversationSummary>,
    pub active_id: Option<ThreadId>,
    pub messages: Vec<ChatMessage>,
    /// True while a question is in flight
    pub busy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of a question submission
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmitOutcome {
    /// The exchange settled; the input field may be cleared
    Settled { view: ChatView },
    /// The backend rejected the question; the typed text is handed back so
    /// the user can retry without retyping
    Rejected { error: String, restored_input: String },
    /// The response arrived after its request was cancelled or superseded;
    /// no state changed
    Discarded,
}
