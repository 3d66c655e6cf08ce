//! Conversation session module
//!
//! Threads remote history records into conversations, tracks the active
//! thread, and keeps optimistic UI state consistent with the backend -
//! including under cancellation.

pub mod commands;
pub mod controller;
pub mod request_registry;
pub mod store;
pub mod types;

pub use controller::{ControllerConfig, SessionController, SessionError};
pub use types::{ChatMessage, ChatView, ConversationSummary, SubmitOutcome, ThreadId};
