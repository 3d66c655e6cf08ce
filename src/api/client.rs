//! Study platform backend client
//!
//! Talks to the remote REST API (default: localhost:8000)

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use super::error::ApiError;
use super::history::HistoryApi;
use super::types::{AskRequest, AskResponse, DocumentInfo, HealthResponse, HistoryRecord};

/// Backend connection configuration
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub base_url: String,
    pub api_token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            api_token: None,
            timeout_secs: 120,
        }
    }
}

/// Normalize a user-entered base URL (trim whitespace, strip trailing slashes)
pub fn clean_base_url(url: &str) -> String {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return BackendConfig::default().base_url;
    }
    trimmed.trim_end_matches('/').to_string()
}

/// HTTP client for the study platform backend
pub struct BackendClient {
    config: BackendConfig,
    client: Client,
}

impl BackendClient {
    pub fn new(mut config: BackendConfig) -> Self {
        config.base_url = clean_base_url(&config.base_url);

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    pub fn with_default_config() -> Self {
        Self::new(BackendConfig::default())
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    /// Attach the bearer token, if one is configured
    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.config.api_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Check that the backend is reachable and healthy
    pub async fn check_connection(&self) -> Result<String, ApiError> {
        let response = self
            .authorize(self.client.get(self.url("/health")))
            .send()
            .await
            .map_err(|e| ApiError::Network(format!("Cannot reach backend: {}", e)))?;

        let health: HealthResponse = decode_json(response).await?;
        Ok(health.status)
    }

    /// List the user's documents (for the question scope picker)
    pub async fn list_documents(&self) -> Result<Vec<DocumentInfo>, ApiError> {
        let response = self
            .authorize(self.client.get(self.url("/documents")))
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        decode_json(response).await
    }
}

/// Decode a response body, mapping HTTP failures to the ApiError taxonomy
async fn decode_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let status = response.status();

    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(ApiError::NotFound);
    }

    if !status.is_success() {
        let message = extract_detail(response).await;
        return Err(ApiError::Api {
            status: status.as_u16(),
            message,
        });
    }

    response
        .json::<T>()
        .await
        .map_err(|e| ApiError::InvalidResponse(e.to_string()))
}

/// Check a response for success, discarding any body
async fn check_status(response: reqwest::Response) -> Result<(), ApiError> {
    let status = response.status();

    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(ApiError::NotFound);
    }

    if !status.is_success() {
        let message = extract_detail(response).await;
        return Err(ApiError::Api {
            status: status.as_u16(),
            message,
        });
    }

    Ok(())
}

/// Pull the FastAPI-style `detail` string out of an error body when present
async fn extract_detail(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(String::from))
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        })
}

#[async_trait]
impl HistoryApi for BackendClient {
    async fn ask(
        &self,
        request: AskRequest,
        cancel: CancellationToken,
    ) -> Result<AskResponse, ApiError> {
        let send = self
            .authorize(self.client.post(self.url("/query/ask")))
            .json(&request)
            .send();

        // The abort is advisory: dropping the future stops us waiting, but the
        // backend may have committed the exchange already. The controller's
        // cleanup sweep handles that case.
        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(ApiError::Cancelled),
            result = send => result.map_err(|e| ApiError::Network(e.to_string()))?,
        };

        tokio::select! {
            _ = cancel.cancelled() => Err(ApiError::Cancelled),
            decoded = decode_json(response) => decoded,
        }
    }

    async fn list_history(
        &self,
        document_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<HistoryRecord>, ApiError> {
        let mut query: Vec<(&str, String)> = vec![("limit", limit.to_string())];
        if let Some(doc) = document_id {
            query.push(("document_id", doc.to_string()));
        }

        let response = self
            .authorize(self.client.get(self.url("/history")).query(&query))
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        decode_json(response).await
    }

    async fn delete_record(&self, history_id: &str) -> Result<(), ApiError> {
        let response = self
            .authorize(
                self.client
                    .delete(self.url(&format!("/history/{}", history_id))),
            )
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        match check_status(response).await {
            Err(ApiError::NotFound) => Ok(()),
            other => other,
        }
    }

    async fn delete_conversation(&self, conversation_id: &str) -> Result<(), ApiError> {
        let response = self
            .authorize(
                self.client
                    .delete(self.url(&format!("/history/conversation/{}", conversation_id))),
            )
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        match check_status(response).await {
            Err(ApiError::NotFound) => Ok(()),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_base_url() {
        assert_eq!(clean_base_url("http://localhost:8000"), "http://localhost:8000");
        assert_eq!(clean_base_url("http://localhost:8000/"), "http://localhost:8000");
        assert_eq!(clean_base_url("  http://api.example.com///  "), "http://api.example.com");
        assert_eq!(clean_base_url(""), "http://localhost:8000");
        assert_eq!(clean_base_url("   "), "http://localhost:8000");
    }

    #[test]
    fn test_client_normalizes_configured_url() {
        let client = BackendClient::new(BackendConfig {
            base_url: "http://localhost:9000///".to_string(),
            ..BackendConfig::default()
        });
        assert_eq!(client.base_url(), "http://localhost:9000");
        assert_eq!(client.url("/health"), "http://localhost:9000/health");
    }
}
