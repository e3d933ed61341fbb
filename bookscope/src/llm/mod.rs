use serde::Deserialize;

use crate::error::SummaryError;

/// Core trait for generation providers (remote today, local someday)
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate completion for a given prompt. Failures come back already
    /// classified so the invoker can decide between retry, fallback and
    /// terminal propagation.
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse, SummaryError>;
}

/// Request structure for LLM generation
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub prompt: String,
    pub max_tokens: Option<usize>,
    pub temperature: Option<f32>,
    pub timeout_seconds: Option<u64>,
}

/// Response from LLM generation
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub content: String,
    pub usage: UsageMetadata,
    pub model: String,
}

/// Token usage metadata for tracking
#[derive(Debug, Clone, Default)]
pub struct UsageMetadata {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

/// The JSON object the prompt asks the model to emit.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneratedPayload {
    pub short_summary: String,
    pub detailed_summary: String,
    #[serde(default)]
    pub reasoning_factors: Vec<String>,
    #[serde(default)]
    pub sources_used: Vec<String>,
}

/// Parse the model's content into the expected payload. Anything that does
/// not yield both summary fields is a malformed response.
pub fn parse_generated_payload(content: &str) -> Result<GeneratedPayload, SummaryError> {
    let cleaned = extract_json_from_text(content).ok_or_else(|| {
        SummaryError::MalformedResponse("no JSON object found in model output".to_string())
    })?;
    let payload: GeneratedPayload = serde_json::from_str(&cleaned)
        .map_err(|e| SummaryError::MalformedResponse(format!("invalid summary JSON: {}", e)))?;
    if payload.short_summary.trim().is_empty() || payload.detailed_summary.trim().is_empty() {
        return Err(SummaryError::MalformedResponse(
            "model returned empty summary fields".to_string(),
        ));
    }
    Ok(payload)
}

pub mod remote;

/// Helper to extract JSON from text that might contain markdown backticks or preamble
pub fn extract_json_from_text(text: &str) -> Option<String> {
    // 1. Try to find content between ```json and ```
    if let Some(start) = text.find("```json") {
        let rest = &text[start + 7..];
        if let Some(end) = rest.find("```") {
            return Some(rest[..end].trim().to_string());
        }
    }

    // 2. Try to find content between ``` and ```
    if let Some(start) = text.find("```") {
        let rest = &text[start + 3..];
        if let Some(end) = rest.find("```") {
            return Some(rest[..end].trim().to_string());
        }
    }

    // 3. Try to find the first '{' and last '}'
    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        return Some(text[start..=end].to_string());
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_fenced_json() {
        let text =
            "Here you go:\n```json\n{\"short_summary\":\"a\",\"detailed_summary\":\"b\"}\n```";
        let payload = parse_generated_payload(text).expect("parse");
        assert_eq!(payload.short_summary, "a");
        assert_eq!(payload.detailed_summary, "b");
        assert!(payload.reasoning_factors.is_empty());
    }

    #[test]
    fn extracts_bare_object_with_preamble() {
        let text =
            "Sure! {\"short_summary\":\"a\",\"detailed_summary\":\"b\",\"sources_used\":[\"x\"]}";
        let payload = parse_generated_payload(text).expect("parse");
        assert_eq!(payload.sources_used, vec!["x"]);
    }

    #[test]
    fn missing_fields_are_malformed() {
        let err = parse_generated_payload("{\"short_summary\":\"only one\"}").unwrap_err();
        assert_eq!(err.classification(), "malformed_response");

        let err = parse_generated_payload("no json at all").unwrap_err();
        assert_eq!(err.classification(), "malformed_response");

        let err = parse_generated_payload("{\"short_summary\":\"\",\"detailed_summary\":\"\"}")
            .unwrap_err();
        assert_eq!(err.classification(), "malformed_response");
    }
}
