//! Deterministic confidence scoring for generated summaries.
//!
//! All formulas here are fixed arithmetic, not learned. The scorer is a pure
//! function of the book metadata and two processing-outcome flags, so the
//! same request always yields the same score.

use crate::summary::{
    DetailedConfidenceFactors, Factor, FactorGroup, SourceAttribution, SourceType, SummaryRequest,
};
use crate::truncate::truncate;

/// Sentinel values emitted by the upstream metadata lookup when it has no
/// real publisher/author on record. These score low on reliability.
const UNKNOWN_PUBLISHER: &str = "Unknown Publisher";
const UNKNOWN_AUTHOR: &str = "Unknown Author";

/// Penalty subtracted from the overall score when output language differs
/// from the book's recorded original language.
const TRANSLATION_PENALTY: f64 = 10.0;

/// Full scoring output: the overall score, the five factor groups, the
/// 4-entry attribution list and the human-readable reasoning trail.
#[derive(Debug, Clone)]
pub struct ConfidenceReport {
    pub overall: u8,
    pub factors: DetailedConfidenceFactors,
    pub attribution: Vec<SourceAttribution>,
    pub reasoning_factors: Vec<String>,
    pub sources_used: Vec<String>,
}

/// Compute the confidence score and source attribution for a request.
///
/// `uses_fallback` marks template-generated output, `translation_applied`
/// marks cross-language output; both select fixed constants in the
/// ai_processing group and the latter additionally applies a flat penalty.
pub fn score(
    request: &SummaryRequest,
    uses_fallback: bool,
    translation_applied: bool,
) -> ConfidenceReport {
    let desc_len = request.description.chars().count();
    let has_complete_metadata = has_complete_metadata(request);
    let has_categories = !request.categories.is_empty();

    let data_quality = data_quality(request, desc_len, has_complete_metadata);
    let source_reliability = source_reliability(request, desc_len);
    let content_coverage = content_coverage(desc_len, has_categories);
    let ai_processing = ai_processing(uses_fallback, translation_applied);
    let cross_validation = cross_validation(has_complete_metadata, has_categories);

    let penalty = if translation_applied {
        TRANSLATION_PENALTY
    } else {
        0.0
    };
    let overall = (0.25 * data_quality.score as f64
        + 0.25 * source_reliability.score as f64
        + 0.2 * content_coverage.score as f64
        + 0.15 * ai_processing.score as f64
        + 0.15 * cross_validation.score as f64
        - penalty)
        .clamp(0.0, 100.0)
        .round() as u8;

    let mut reasoning_factors = vec![format!("Description length: {} chars", desc_len)];
    reasoning_factors.push(if has_complete_metadata {
        "Complete publisher and author metadata available".to_string()
    } else {
        "Incomplete metadata lowers data quality".to_string()
    });
    if has_categories {
        reasoning_factors.push(format!(
            "Categorized under: {}",
            request.categories.join(", ")
        ));
    }
    if translation_applied {
        reasoning_factors.push(format!(
            "Translated from {} to {}",
            request.source_language, request.target_language
        ));
    }
    if uses_fallback {
        reasoning_factors.push("Deterministic template used (generation unavailable)".to_string());
    }

    let attribution = attribution(request, uses_fallback, desc_len);
    let sources_used = attribution.iter().map(|a| a.source.clone()).collect();

    ConfidenceReport {
        overall,
        factors: DetailedConfidenceFactors {
            data_quality,
            source_reliability,
            content_coverage,
            ai_processing,
            cross_validation,
        },
        attribution,
        reasoning_factors,
        sources_used,
    }
}

fn has_complete_metadata(request: &SummaryRequest) -> bool {
    !request.title.is_empty()
        && !request.authors.is_empty()
        && !request.authors.iter().any(|a| a == UNKNOWN_AUTHOR)
        && !request.publisher.is_empty()
        && request.publisher != UNKNOWN_PUBLISHER
        && !request.published_date.is_empty()
}

fn group(score: f64, factors: Vec<(&str, f64)>) -> FactorGroup {
    FactorGroup {
        score: score.clamp(0.0, 100.0).round() as u8,
        factors: factors
            .into_iter()
            .map(|(name, s)| Factor {
                name: name.to_string(),
                score: s.clamp(0.0, 100.0).round() as u8,
            })
            .collect(),
    }
}

fn data_quality(request: &SummaryRequest, desc_len: usize, complete: bool) -> FactorGroup {
    let desc_ratio = (desc_len as f64 / 100.0).min(1.0);
    let score = (30.0 * desc_ratio
        + 25.0 * complete as u8 as f64
        + 15.0 * (request.page_count > 0) as u8 as f64
        + 15.0 * (!request.categories.is_empty()) as u8 as f64
        + 10.0 * request.average_rating.is_some() as u8 as f64
        + 5.0 * request.ratings_count.is_some() as u8 as f64)
        .min(100.0);
    group(
        score,
        vec![
            ("description_depth", (desc_len as f64).min(100.0)),
            ("metadata_completeness", if complete { 100.0 } else { 40.0 }),
            (
                "page_count_present",
                if request.page_count > 0 { 100.0 } else { 0.0 },
            ),
            (
                "rating_signals",
                if request.average_rating.is_some() {
                    100.0
                } else {
                    0.0
                },
            ),
        ],
    )
}

fn source_reliability(request: &SummaryRequest, desc_len: usize) -> FactorGroup {
    let publisher_reliability =
        if request.publisher.is_empty() || request.publisher == UNKNOWN_PUBLISHER {
            30.0
        } else {
            85.0
        };
    let author_credibility = if request.authors.is_empty()
        || request.authors.iter().any(|a| a == UNKNOWN_AUTHOR)
    {
        30.0
    } else {
        85.0
    };
    // Share of the metadata fields actually filled in, scaled to 0-100.
    let present = [
        desc_len > 0,
        !request.categories.is_empty(),
        request.page_count > 0,
        !request.published_date.is_empty(),
        !request.isbn.is_empty(),
    ]
    .iter()
    .filter(|p| **p)
    .count();
    let metadata_completeness = present as f64 * 20.0;

    let score = 0.3 * publisher_reliability + 0.3 * author_credibility + 0.4 * metadata_completeness;
    group(
        score,
        vec![
            ("publisher_reliability", publisher_reliability),
            ("author_credibility", author_credibility),
            ("metadata_completeness", metadata_completeness),
            (
                "isbn_present",
                if request.isbn.is_empty() { 0.0 } else { 100.0 },
            ),
        ],
    )
}

fn content_coverage(desc_len: usize, has_categories: bool) -> FactorGroup {
    let desc_coverage = (desc_len as f64 / 10.0).min(100.0);
    let category_coverage = if has_categories { 80.0 } else { 40.0 };
    let depth_signal = if desc_len > 200 { 90.0 } else { 60.0 };
    let score = 0.4 * desc_coverage + 0.3 * category_coverage + 0.3 * depth_signal;
    group(
        score,
        vec![
            ("description_coverage", desc_coverage),
            ("category_coverage", category_coverage),
            ("depth_signal", depth_signal),
            ("structural_fields", 75.0),
        ],
    )
}

/// Fixed constants selected by the (uses_fallback, translation_applied)
/// combination. Translation always yields a strictly lower language
/// consistency than the same path without translation.
fn ai_processing(uses_fallback: bool, translation_applied: bool) -> FactorGroup {
    let (language_consistency, translation_quality, summarization_accuracy, response_coherence) =
        match (uses_fallback, translation_applied) {
            (false, false) => (95.0, 95.0, 90.0, 90.0),
            (false, true) => (80.0, 75.0, 85.0, 88.0),
            (true, false) => (90.0, 90.0, 70.0, 85.0),
            (true, true) => (75.0, 70.0, 65.0, 80.0),
        };
    let score = 0.3 * language_consistency
        + 0.3 * translation_quality
        + 0.2 * summarization_accuracy
        + 0.2 * response_coherence;
    group(
        score,
        vec![
            ("language_consistency", language_consistency),
            ("translation_quality", translation_quality),
            ("summarization_accuracy", summarization_accuracy),
            ("response_coherence", response_coherence),
        ],
    )
}

fn cross_validation(complete: bool, has_categories: bool) -> FactorGroup {
    let metadata_agreement = if complete { 80.0 } else { 50.0 };
    let external_consistency = 85.0;
    let category_agreement = if has_categories { 90.0 } else { 70.0 };
    let format_validation = 90.0;
    let score = 0.3 * metadata_agreement
        + 0.2 * external_consistency
        + 0.3 * category_agreement
        + 0.2 * format_validation;
    group(
        score,
        vec![
            ("metadata_agreement", metadata_agreement),
            ("external_consistency", external_consistency),
            ("category_agreement", category_agreement),
            ("format_validation", format_validation),
        ],
    )
}

/// Always exactly 4 entries with fixed relative weights. The weights are
/// informational only and do not feed the overall score.
fn attribution(
    request: &SummaryRequest,
    uses_fallback: bool,
    desc_len: usize,
) -> Vec<SourceAttribution> {
    let metadata_line = format!(
        "{} / {} / {} / {}",
        request.title,
        request.authors.join(", "),
        request.publisher,
        request.published_date
    );
    let categories_line = request.categories.join(", ");

    let (final_type, final_source, final_content, final_reliability) = if uses_fallback {
        (
            SourceType::FallbackTemplate,
            "Deterministic fallback template",
            "Template interpolated from structured metadata only".to_string(),
            60,
        )
    } else {
        (
            SourceType::AiKnowledge,
            "AI model knowledge",
            "Model-internal knowledge conditioned on the provided metadata".to_string(),
            80,
        )
    };

    vec![
        SourceAttribution {
            source_type: SourceType::BookDescription,
            content: truncate(&request.description, 150),
            reliability: 90,
            relevance: 95,
            length: desc_len,
            source: "Book description".to_string(),
            weight: 0.4,
        },
        SourceAttribution {
            source_type: SourceType::Metadata,
            content: truncate(&metadata_line, 150),
            reliability: 85,
            relevance: 80,
            length: metadata_line.chars().count(),
            source: "Publisher metadata".to_string(),
            weight: 0.25,
        },
        SourceAttribution {
            source_type: SourceType::CategoryData,
            content: truncate(&categories_line, 150),
            reliability: 75,
            relevance: 70,
            length: categories_line.chars().count(),
            source: "Category data".to_string(),
            weight: 0.15,
        },
        SourceAttribution {
            source_type: final_type,
            content: final_content.clone(),
            reliability: final_reliability,
            relevance: 75,
            length: final_content.chars().count(),
            source: final_source.to_string(),
            weight: 0.2,
        },
    ]
}
