use crate::cli::Args;
use crate::error::ChatError;
use crate::models::chat::{ HealthQuery, HealthResponse };
use log::info;
use reqwest::Client as HttpClient;
use std::time::Duration;

/// Forwards health queries to the external LLM service and returns its
/// answer unmodified. No retry, no circuit breaking; the only
/// protection is the configured request timeout.
pub struct LlmRelay {
    http: HttpClient,
    base_url: String,
}

impl LlmRelay {
    pub fn new(args: &Args) -> Result<Self, ChatError> {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(args.request_timeout_secs))
            .build()
            .map_err(|e| ChatError::Upstream(e.to_string()))?;

        Ok(Self {
            http,
            base_url: args.llm_service_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn analyse(&self, query: &HealthQuery) -> Result<HealthResponse, ChatError> {
        if query.symptoms.trim().is_empty() {
            return Err(ChatError::EmptySymptoms);
        }

        info!("Received symptom analysis request: {}...", truncate(&query.symptoms, 50));

        let url = format!("{}/analyse-symptoms", self.base_url);
        let resp = self.http
            .post(&url)
            .json(query)
            .send().await
            .map_err(|e| ChatError::Upstream(e.to_string()))?
            .error_for_status()
            .map_err(|e| ChatError::Upstream(e.to_string()))?;

        let body = resp.bytes().await.map_err(|e| ChatError::Upstream(e.to_string()))?;
        if body.is_empty() {
            return Err(ChatError::UpstreamEmpty);
        }

        serde_json::from_slice(&body).map_err(|e| ChatError::Upstream(e.to_string()))
    }
}

/// Char-boundary safe prefix for log lines.
pub fn truncate(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
