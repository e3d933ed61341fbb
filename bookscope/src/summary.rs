use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Hard character budget for the short summary form.
pub const SHORT_SUMMARY_LIMIT: usize = 300;
/// Hard character budget for the detailed summary form.
pub const DETAILED_SUMMARY_LIMIT: usize = 1000;

/// Structured book metadata driving a summary generation.
///
/// All fields originate from an upstream metadata lookup and are never
/// mutated after construction. This is also the POST body of the
/// `/api/v1/summaries` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryRequest {
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    pub isbn: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub publisher: String,
    #[serde(default)]
    pub published_date: String,
    #[serde(default)]
    pub page_count: u32,
    #[serde(default = "default_language")]
    pub source_language: String,
    #[serde(default = "default_language")]
    pub target_language: String,
    /// Optional rating metadata, feeds confidence scoring only
    #[serde(default)]
    pub average_rating: Option<f64>,
    #[serde(default)]
    pub ratings_count: Option<u64>,
}

fn default_language() -> String {
    "en".to_string()
}

impl SummaryRequest {
    /// True when the requested output language differs from the book's
    /// recorded original language.
    pub fn needs_translation(&self) -> bool {
        self.source_language != self.target_language
    }
}

/// How the summary text was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingMethod {
    OpenaiApi,
    FallbackTemplate,
}

/// What kind of source an attribution entry points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    BookDescription,
    Metadata,
    CategoryData,
    AiKnowledge,
    FallbackTemplate,
}

/// One source that contributed to a generated summary.
///
/// `weight` is declarative only: it is reported to the caller but does not
/// feed the confidence formula.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceAttribution {
    pub source_type: SourceType,
    /// Truncated excerpt of the source content
    pub content: String,
    /// 0-100
    pub reliability: u8,
    /// 0-100
    pub relevance: u8,
    /// Character length of the untruncated source content
    pub length: usize,
    /// Human-readable source label
    pub source: String,
    pub weight: f64,
}

/// A named sub-metric inside a confidence factor group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Factor {
    pub name: String,
    /// 0-100
    pub score: u8,
}

/// One of the five confidence factor groups: a rolled-up score plus exactly
/// four named sub-metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactorGroup {
    /// 0-100
    pub score: u8,
    pub factors: Vec<Factor>,
}

/// Full factor breakdown behind a confidence score. Derived data; never
/// persisted independently of its parent summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailedConfidenceFactors {
    pub data_quality: FactorGroup,
    pub source_reliability: FactorGroup,
    pub content_coverage: FactorGroup,
    pub ai_processing: FactorGroup,
    pub cross_validation: FactorGroup,
}

/// The finished summary handed to callers. Immutable once constructed;
/// callers may persist it verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiBookSummary {
    pub short_summary: String,
    pub detailed_summary: String,
    /// 0-100, integer
    pub confidence_score: u8,
    pub reasoning_factors: Vec<String>,
    pub sources_used: Vec<String>,
    /// Always exactly 4 entries
    pub source_attribution: Vec<SourceAttribution>,
    pub detailed_confidence_factors: DetailedConfidenceFactors,
    /// Equals the request's target language
    pub language: String,
    pub generated_at: DateTime<Utc>,
    pub processing_method: ProcessingMethod,
    /// source_language != target_language
    pub translation_applied: bool,
}
