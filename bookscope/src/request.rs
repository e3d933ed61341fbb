//! Pure transform from book metadata to invocation parameters.
//!
//! No I/O here: everything the external call needs (prompt, token budget,
//! temperature) is derived deterministically from the request.

use crate::llm::LlmRequest;
use crate::summary::SummaryRequest;

/// Token budget for same-language generation.
const MAX_TOKENS_SAME_LANGUAGE: usize = 400;
/// Token budget when output must be produced in a different language.
const MAX_TOKENS_CROSS_LANGUAGE: usize = 500;
/// Low temperature to favor determinism and format adherence.
const TEMPERATURE: f32 = 0.2;

/// Resolved parameters for one generation call.
#[derive(Debug, Clone)]
pub struct InvocationParams {
    pub prompt: String,
    pub max_tokens: usize,
    pub temperature: f32,
    pub needs_translation: bool,
    pub language_name: &'static str,
}

impl InvocationParams {
    pub fn to_llm_request(&self, timeout_seconds: Option<u64>) -> LlmRequest {
        LlmRequest {
            prompt: self.prompt.clone(),
            max_tokens: Some(self.max_tokens),
            temperature: Some(self.temperature),
            timeout_seconds,
        }
    }
}

/// Resolve a language code to its display name. Fixed 6-entry table;
/// unknown codes default to English.
pub fn language_display_name(code: &str) -> &'static str {
    match code {
        "en" => "English",
        "es" => "Spanish",
        "fr" => "French",
        "de" => "German",
        "it" => "Italian",
        "pt" => "Portuguese",
        _ => "English",
    }
}

/// Preferred native words for common summary connectives, used to bias
/// generation away from literal source-language loanwords.
pub fn vocabulary_hints(code: &str) -> &'static [(&'static str, &'static str)] {
    match code {
        "es" => &[
            ("however", "sin embargo"),
            ("also", "también"),
            ("about", "sobre"),
            ("through", "a través de"),
            ("written by", "escrito por"),
        ],
        "fr" => &[
            ("however", "cependant"),
            ("also", "également"),
            ("about", "sur"),
            ("through", "à travers"),
            ("written by", "écrit par"),
        ],
        "de" => &[
            ("however", "jedoch"),
            ("also", "außerdem"),
            ("about", "über"),
            ("through", "durch"),
            ("written by", "geschrieben von"),
        ],
        "it" => &[
            ("however", "tuttavia"),
            ("also", "inoltre"),
            ("about", "su"),
            ("through", "attraverso"),
            ("written by", "scritto da"),
        ],
        "pt" => &[
            ("however", "no entanto"),
            ("also", "também"),
            ("about", "sobre"),
            ("through", "através de"),
            ("written by", "escrito por"),
        ],
        _ => &[],
    }
}

/// Build the invocation parameters for a request. Pure and deterministic.
pub fn build(request: &SummaryRequest) -> InvocationParams {
    let needs_translation = request.needs_translation();
    let language_name = language_display_name(&request.target_language);

    let translation_instructions = if needs_translation {
        let hints = vocabulary_hints(&request.target_language)
            .iter()
            .map(|(en, native)| format!("use \"{}\" (never \"{}\")", native, en))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "5. The book metadata is in another language; write the ENTIRE summary in {}.\n\
             6. Mandatory vocabulary: {}.\n",
            language_name, hints
        )
    } else {
        String::new()
    };

    let prompt = format!(
        r#"You are a book-summary generator. Write factual, neutral summaries in {language}.

IMPORTANT INSTRUCTIONS:
1. Base the summary on the metadata below; never invent plot details.
2. "short_summary" must be 250-300 characters.
3. "detailed_summary" must be 800-1000 characters.
4. Write every field in {language}, including category names.
{translation_instructions}
OUTPUT FORMAT (strict JSON):
{{
  "short_summary": "one-paragraph summary",
  "detailed_summary": "longer summary",
  "reasoning_factors": ["short note on what informed the summary"],
  "sources_used": ["label of each source drawn on"]
}}

BOOK METADATA:
Title: {title}
Authors: {authors}
ISBN: {isbn}
Categories: {categories}
Publisher: {publisher}
Published: {published}
Pages: {pages}
Description: {description}
"#,
        language = language_name,
        translation_instructions = translation_instructions,
        title = request.title,
        authors = request.authors.join(", "),
        isbn = request.isbn,
        categories = request.categories.join(", "),
        publisher = request.publisher,
        published = request.published_date,
        pages = request.page_count,
        description = request.description,
    );

    InvocationParams {
        prompt,
        max_tokens: if needs_translation {
            MAX_TOKENS_CROSS_LANGUAGE
        } else {
            MAX_TOKENS_SAME_LANGUAGE
        },
        temperature: TEMPERATURE,
        needs_translation,
        language_name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(source: &str, target: &str) -> SummaryRequest {
        SummaryRequest {
            title: "Nexus".to_string(),
            authors: vec!["Yuval Noah Harari".to_string()],
            isbn: "9780525520024".to_string(),
            description: "Information networks through the ages.".to_string(),
            categories: vec!["History".to_string()],
            publisher: "Random House".to_string(),
            published_date: "2024-09-10".to_string(),
            page_count: 528,
            source_language: source.to_string(),
            target_language: target.to_string(),
            average_rating: None,
            ratings_count: None,
        }
    }

    #[test]
    fn same_language_uses_smaller_budget() {
        let params = build(&request("en", "en"));
        assert!(!params.needs_translation);
        assert_eq!(params.max_tokens, 400);
        assert_eq!(params.language_name, "English");
        assert!(!params.prompt.contains("Mandatory vocabulary"));
    }

    #[test]
    fn cross_language_adds_vocabulary_hints() {
        let params = build(&request("en", "es"));
        assert!(params.needs_translation);
        assert_eq!(params.max_tokens, 500);
        assert_eq!(params.language_name, "Spanish");
        assert!(params.prompt.contains("Mandatory vocabulary"));
        assert!(params.prompt.contains("sin embargo"));
    }

    #[test]
    fn unknown_language_defaults_to_english() {
        assert_eq!(language_display_name("zz"), "English");
        let params = build(&request("en", "zz"));
        // Different code still counts as translation, but there are no
        // hints for it.
        assert!(params.needs_translation);
        assert!(vocabulary_hints("zz").is_empty());
    }

    #[test]
    fn deterministic() {
        let req = request("en", "de");
        assert_eq!(build(&req).prompt, build(&req).prompt);
    }

    #[test]
    fn prompt_carries_metadata() {
        let params = build(&request("en", "en"));
        for needle in ["Nexus", "Yuval Noah Harari", "9780525520024", "Random House", "528"] {
            assert!(params.prompt.contains(needle), "missing {}", needle);
        }
    }
}
