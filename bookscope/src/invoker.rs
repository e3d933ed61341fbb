//! Orchestration of a single summary generation.
//!
//! State machine: Init -> RateCheck -> Invoke -> {Success, RetryWait ->
//! Invoke, Fallback} -> Done. Retry and pacing are two separate policies
//! composed here: `RetryPolicy` governs how often a rate-limited call is
//! re-attempted, `ThrottlePolicy` enforces minimum spacing before every
//! outbound call regardless of retry state.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::confidence;
use crate::counters::{hour_window, month_window, CounterStore};
use crate::error::SummaryError;
use crate::fallback;
use crate::language::LanguageGuard;
use crate::llm::{parse_generated_payload, GeneratedPayload, LlmProvider};
use crate::request;
use crate::summary::{
    AiBookSummary, ProcessingMethod, SummaryRequest, DETAILED_SUMMARY_LIMIT, SHORT_SUMMARY_LIMIT,
};
use crate::truncate::truncate;

/// Confidence placeholder carried by the fallback path before the scorer
/// runs its full metric computation.
const FALLBACK_BASELINE_CONFIDENCE: u8 = 50;

/// Retry applies only to upstream rate-limit signals. Up to `max_attempts`
/// calls total; the delay after failed attempt k (0-indexed) is
/// `base_delay * backoff_multiplier^k`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub backoff_multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            backoff_multiplier: 2,
        }
    }
}

impl RetryPolicy {
    pub fn delay_after(&self, failed_attempt: u32) -> Duration {
        self.base_delay * self.backoff_multiplier.pow(failed_attempt)
    }
}

/// Client-side minimum spacing between outbound calls, protecting the
/// upstream service independently of retry state.
#[derive(Debug, Clone)]
pub struct ThrottlePolicy {
    pub min_spacing: Duration,
}

impl Default for ThrottlePolicy {
    fn default() -> Self {
        Self {
            min_spacing: Duration::from_millis(500),
        }
    }
}

/// A finished generation plus how it was produced.
#[derive(Debug, Clone)]
pub struct InvocationOutcome {
    pub summary: AiBookSummary,
    pub used_fallback: bool,
}

pub struct SummaryInvoker {
    provider: Arc<dyn LlmProvider>,
    counters: Arc<dyn CounterStore>,
    guard: Arc<LanguageGuard>,
    retry: RetryPolicy,
    throttle: ThrottlePolicy,
    hourly_cap: i64,
    monthly_cap: i64,
    timeout_seconds: Option<u64>,
    // Sole piece of shared mutable state: timestamp of the last outbound
    // call, used only for inter-call spacing.
    last_call: Mutex<Option<Instant>>,
}

impl SummaryInvoker {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        counters: Arc<dyn CounterStore>,
        guard: Arc<LanguageGuard>,
    ) -> Self {
        Self {
            provider,
            counters,
            guard,
            retry: RetryPolicy::default(),
            throttle: ThrottlePolicy::default(),
            hourly_cap: 10,
            monthly_cap: 1000,
            timeout_seconds: None,
            last_call: Mutex::new(None),
        }
    }

    pub fn with_limits(mut self, limits: &common::LimitsConfig) -> Self {
        self.hourly_cap = limits.hourly_cap();
        self.monthly_cap = limits.monthly_cap();
        self.throttle.min_spacing = Duration::from_millis(limits.min_spacing_ms());
        self.retry.max_attempts = limits.max_attempts();
        self.retry.base_delay = Duration::from_millis(limits.base_delay_ms());
        self
    }

    pub fn with_timeout(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = Some(timeout_seconds);
        self
    }

    /// Run the full pipeline for one request.
    pub async fn generate_summary(
        &self,
        client_id: &str,
        request: &SummaryRequest,
    ) -> Result<InvocationOutcome, SummaryError> {
        if request.title.trim().is_empty() {
            return Err(SummaryError::InvalidRequest("title is required".to_string()));
        }
        if request.isbn.trim().is_empty() {
            return Err(SummaryError::InvalidRequest("isbn is required".to_string()));
        }

        self.rate_check(client_id).await?;

        let params = request::build(request);
        let translation_applied = params.needs_translation;

        let mut attempt: u32 = 0;
        loop {
            self.pace().await;
            match self
                .provider
                .generate(params.to_llm_request(self.timeout_seconds))
                .await
            {
                Ok(response) => {
                    info!(
                        "summary generated for isbn {} ({} tokens, model {})",
                        request.isbn, response.usage.total_tokens, response.model
                    );
                    // A non-parseable body is terminal, never retried.
                    let payload = parse_generated_payload(&response.content)?;
                    return Ok(InvocationOutcome {
                        summary: self.assemble_generated(request, payload, translation_applied),
                        used_fallback: false,
                    });
                }
                Err(e) if e.is_retryable() => {
                    attempt += 1;
                    if attempt >= self.retry.max_attempts {
                        warn!(
                            "generation rate-limited on all {} attempts for isbn {}, \
                             falling back to template",
                            self.retry.max_attempts, request.isbn
                        );
                        break;
                    }
                    let delay = self.retry.delay_after(attempt - 1);
                    info!(
                        "generation rate-limited (attempt {}), retrying in {:?}",
                        attempt, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                // Quota, auth, malformed: configuration problems, not
                // transient load. Propagate; a fallback would hide them.
                Err(e) => return Err(e),
            }
        }

        let summary = self.assemble_fallback(request, translation_applied)?;
        Ok(InvocationOutcome {
            summary,
            used_fallback: true,
        })
    }

    /// RateCheck state: per-client hourly counter first, then the global
    /// monthly counter. Both count this attempt whether or not it is
    /// allowed to proceed.
    async fn rate_check(&self, client_id: &str) -> Result<(), SummaryError> {
        let now = Utc::now();

        let client_key = format!("client:{}", client_id);
        let allowed = self
            .counters
            .check_and_increment(&client_key, &hour_window(now), self.hourly_cap)
            .await?;
        if !allowed {
            warn!("client {} over hourly cap ({}/h)", client_id, self.hourly_cap);
            return Err(SummaryError::RateLimited);
        }

        let allowed = self
            .counters
            .check_and_increment("global", &month_window(now), self.monthly_cap)
            .await?;
        if !allowed {
            warn!("global monthly cap reached ({}/month)", self.monthly_cap);
            return Err(SummaryError::GlobalCapReached);
        }

        Ok(())
    }

    /// Enforce minimum spacing before an outbound call. Holding the lock
    /// across the sleep serializes concurrent callers, which is exactly
    /// the point.
    async fn pace(&self) {
        let mut last = self.last_call.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.throttle.min_spacing {
                tokio::time::sleep(self.throttle.min_spacing - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    fn assemble_generated(
        &self,
        request: &SummaryRequest,
        payload: GeneratedPayload,
        translation_applied: bool,
    ) -> AiBookSummary {
        // The guard runs over generated text too, not just templates.
        let short = truncate(
            &self.guard.scrub(&payload.short_summary, &request.target_language),
            SHORT_SUMMARY_LIMIT,
        );
        let detailed = truncate(
            &self.guard.scrub(&payload.detailed_summary, &request.target_language),
            DETAILED_SUMMARY_LIMIT,
        );

        let report = confidence::score(request, false, translation_applied);
        // Prefer the model's own reasoning/sources when it provided them.
        let reasoning_factors = if payload.reasoning_factors.is_empty() {
            report.reasoning_factors
        } else {
            payload.reasoning_factors
        };
        let sources_used = if payload.sources_used.is_empty() {
            report.sources_used
        } else {
            payload.sources_used
        };

        AiBookSummary {
            short_summary: short,
            detailed_summary: detailed,
            confidence_score: report.overall,
            reasoning_factors,
            sources_used,
            source_attribution: report.attribution,
            detailed_confidence_factors: report.factors,
            language: request.target_language.clone(),
            generated_at: Utc::now(),
            processing_method: ProcessingMethod::OpenaiApi,
            translation_applied,
        }
    }

    fn assemble_fallback(
        &self,
        request: &SummaryRequest,
        translation_applied: bool,
    ) -> Result<AiBookSummary, SummaryError> {
        let generated = fallback::generate(request, &self.guard)?;

        let report = confidence::score(request, true, translation_applied);
        let mut summary = AiBookSummary {
            short_summary: generated.short_summary,
            detailed_summary: generated.detailed_summary,
            // Fixed baseline, replaced below by the full metric pass.
            confidence_score: FALLBACK_BASELINE_CONFIDENCE,
            reasoning_factors: report.reasoning_factors,
            sources_used: report.sources_used,
            source_attribution: report.attribution,
            detailed_confidence_factors: report.factors,
            language: request.target_language.clone(),
            generated_at: Utc::now(),
            processing_method: ProcessingMethod::FallbackTemplate,
            translation_applied,
        };
        summary.confidence_score = report.overall;
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_delays_double() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(0), Duration::from_millis(500));
        assert_eq!(policy.delay_after(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_after(2), Duration::from_millis(2000));
    }

    #[test]
    fn limits_config_maps_onto_policies() {
        let limits = common::LimitsConfig {
            hourly_cap: Some(5),
            monthly_cap: Some(100),
            min_spacing_ms: Some(250),
            max_attempts: Some(2),
            base_delay_ms: Some(100),
        };
        let invoker = SummaryInvoker::new(
            Arc::new(NoopProvider),
            Arc::new(crate::counters::MemoryCounterStore::new()),
            Arc::new(LanguageGuard::new()),
        )
        .with_limits(&limits);
        assert_eq!(invoker.hourly_cap, 5);
        assert_eq!(invoker.monthly_cap, 100);
        assert_eq!(invoker.throttle.min_spacing, Duration::from_millis(250));
        assert_eq!(invoker.retry.max_attempts, 2);
        assert_eq!(invoker.retry.base_delay, Duration::from_millis(100));
    }

    struct NoopProvider;

    #[async_trait::async_trait]
    impl LlmProvider for NoopProvider {
        async fn generate(
            &self,
            _request: crate::llm::LlmRequest,
        ) -> Result<crate::llm::LlmResponse, SummaryError> {
            Err(SummaryError::RateLimited)
        }
    }
}
