//! Wire types for the study platform API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One retrieval citation attached to an answer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    #[serde(default)]
    pub document_id: Option<String>,
    #[serde(default)]
    pub chunk_id: Option<String>,
    #[serde(default)]
    pub chunk_index: Option<u32>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub content_preview: Option<String>,
}

/// One persisted question/answer exchange as returned by the history endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: String,
    /// Groups exchanges into a thread; absent for records created before
    /// threading existed (each such record is its own thread)
    #[serde(default)]
    pub conversation_id: Option<String>,
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub references: Vec<Reference>,
    #[serde(default)]
    pub document_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Request body for the ask-question endpoint
#[derive(Debug, Clone, Serialize)]
pub struct AskRequest {
    pub question: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

/// Response body from the ask-question endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct AskResponse {
    pub answer: String,
    #[serde(default)]
    pub references: Vec<Reference>,
    #[serde(default)]
    pub history_id: Option<String>,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

/// Document metadata from the documents endpoint (scope picker only;
/// upload and parsing live entirely on the backend)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub id: String,
    pub filename: String,
    #[serde(default)]
    pub file_type: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub upload_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub chunk_count: Option<u32>,
    #[serde(default)]
    pub is_embedded: bool,
}

/// Health probe response
#[derive(Debug, Clone, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ask_request_omits_empty_fields() {
        let request = AskRequest {
            question: "What is entropy?".to_string(),
            document_ids: None,
            conversation_id: None,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json, serde_json::json!({"question": "What is entropy?"}));
    }

    #[test]
    fn test_history_record_tolerates_missing_optionals() {
        let json = serde_json::json!({
            "id": "h1",
            "question": "q",
            "answer": "a",
            "created_at": "2025-03-01T12:00:00Z"
        });

        let record: HistoryRecord = serde_json::from_value(json).unwrap();
        assert_eq!(record.conversation_id, None);
        assert!(record.references.is_empty());
        assert_eq!(record.document_id, None);
    }
}
