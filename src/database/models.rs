// Database models - Settings and conversation titles
use serde::{Deserialize, Serialize};

/// A single key-value setting row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Setting {
    pub key: String,
    pub value: String,
    pub value_type: String,
    pub updated_at: String,
}

/// A user-assigned title override for a conversation thread
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTitle {
    pub conversation_id: String,
    pub title: String,
    pub updated_at: String,
}
