use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{LlmProvider, LlmRequest, LlmResponse, UsageMetadata};
use crate::error::SummaryError;

/// Remote LLM provider using OpenAI-compatible HTTP API
pub struct RemoteLlmProvider {
    base_url: String,
    api_key: String,
    model: String,
    default_timeout: Duration,
    client: reqwest::Client,
}

impl RemoteLlmProvider {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            default_timeout: Duration::from_secs(60),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.default_timeout = Duration::from_secs(timeout_secs);
        self
    }

    /// Map an upstream error status to the pipeline's failure taxonomy.
    /// Only a transient 429 is retryable; everything else is terminal.
    fn classify_status(status: reqwest::StatusCode, body: &str) -> SummaryError {
        match status.as_u16() {
            429 if body.contains("insufficient_quota") || body.contains("quota") => {
                SummaryError::QuotaExceeded
            }
            429 => SummaryError::RateLimited,
            401 | 403 => SummaryError::AuthFailed,
            _ => SummaryError::Internal(anyhow!("LLM API error {}: {}", status, body)),
        }
    }
}

#[async_trait::async_trait]
impl LlmProvider for RemoteLlmProvider {
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse, SummaryError> {
        let timeout = request
            .timeout_seconds
            .map(Duration::from_secs)
            .unwrap_or(self.default_timeout);

        // Build OpenAI-compatible request. The JSON-object response format
        // keeps the model on the strict output schema the prompt asks for.
        let req_body = OpenAiRequest {
            model: self.model.clone(),
            messages: vec![Message {
                role: "user".to_string(),
                content: request.prompt,
            }],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            response_format: ResponseFormat {
                format_type: "json_object".to_string(),
            },
        };

        // Make HTTP request with timeout
        let response = tokio::time::timeout(
            timeout,
            self.client
                .post(&self.base_url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .json(&req_body)
                .send(),
        )
        .await
        .map_err(|_| SummaryError::Internal(anyhow!("LLM request timed out after {:?}", timeout)))?
        .map_err(|e| SummaryError::Internal(anyhow!("LLM HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Self::classify_status(status, &body));
        }

        let resp_body: OpenAiResponse = response.json().await.map_err(|e| {
            SummaryError::MalformedResponse(format!("failed to parse LLM response: {}", e))
        })?;

        let choice = resp_body.choices.first().ok_or_else(|| {
            SummaryError::MalformedResponse("LLM response has no choices".to_string())
        })?;

        let usage = UsageMetadata {
            prompt_tokens: resp_body.usage.prompt_tokens.unwrap_or(0),
            completion_tokens: resp_body.usage.completion_tokens.unwrap_or(0),
            total_tokens: resp_body.usage.total_tokens.unwrap_or(0),
        };

        Ok(LlmResponse {
            content: choice.message.content.clone(),
            usage,
            model: resp_body.model.unwrap_or_else(|| self.model.clone()),
        })
    }
}

// OpenAI API request/response structures
#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    model: Option<String>,
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Default, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: Option<usize>,
    #[serde(default)]
    completion_tokens: Option<usize>,
    #[serde(default)]
    total_tokens: Option<usize>,
}
