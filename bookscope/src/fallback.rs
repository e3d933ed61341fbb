//! Deterministic offline summary synthesis.
//!
//! When generation retries are exhausted the invoker falls back to a fixed
//! natural-language template interpolated from structured metadata only: no
//! external calls, no randomness. Identical requests always yield identical
//! text (the generation timestamp is added later by the invoker).

use crate::error::SummaryError;
use crate::language::LanguageGuard;
use crate::summary::{SummaryRequest, DETAILED_SUMMARY_LIMIT, SHORT_SUMMARY_LIMIT};
use crate::truncate::truncate;

/// Raw template output, before the invoker attaches scoring and metadata.
#[derive(Debug, Clone)]
pub struct FallbackSummary {
    pub short_summary: String,
    pub detailed_summary: String,
}

/// Synthesize a summary from metadata alone.
///
/// Category names are translated through a fixed per-language table
/// (unmapped categories pass through lowercased, untranslated - acceptable
/// degradation, not an error), then the target language's template is
/// interpolated. If an interpolated template would exceed its character
/// budget a fixed shorter sentence for that language is used instead of
/// truncating mid-sentence. The result goes through the language guard and
/// the final truncation pass.
///
/// A request without a title cannot produce any sentence; that is a
/// terminal error, not a further degradation.
pub fn generate(
    request: &SummaryRequest,
    guard: &LanguageGuard,
) -> Result<FallbackSummary, SummaryError> {
    if request.title.trim().is_empty() {
        return Err(SummaryError::InvalidRequest(
            "fallback generation requires a title".to_string(),
        ));
    }

    let lang = normalize_language(&request.target_language);
    let categories = translated_categories(request, lang);
    let parts = TemplateParts::from_request(request, lang, &categories);

    let short = parts.short(lang);
    let short = if short.chars().count() > SHORT_SUMMARY_LIMIT {
        parts.compact(lang)
    } else {
        short
    };

    let detailed = parts.detailed(lang);
    let detailed = if detailed.chars().count() > DETAILED_SUMMARY_LIMIT {
        parts.compact(lang)
    } else {
        detailed
    };

    Ok(FallbackSummary {
        short_summary: truncate(&guard.scrub(&short, lang), SHORT_SUMMARY_LIMIT),
        detailed_summary: truncate(&guard.scrub(&detailed, lang), DETAILED_SUMMARY_LIMIT),
    })
}

/// Unknown codes default to English, mirroring the request builder.
fn normalize_language(code: &str) -> &'static str {
    match code {
        "es" => "es",
        "fr" => "fr",
        "de" => "de",
        "it" => "it",
        "pt" => "pt",
        _ => "en",
    }
}

/// Translate one category name through the fixed table for `lang`.
/// Unmapped categories pass through lowercased.
pub fn translate_category(category: &str, lang: &str) -> String {
    if lang == "en" {
        return category.to_string();
    }
    let key = category.to_lowercase();
    category_table(lang)
        .iter()
        .find(|(en, _)| *en == key)
        .map(|(_, translated)| translated.to_string())
        .unwrap_or(key)
}

fn translated_categories(request: &SummaryRequest, lang: &str) -> Vec<String> {
    request
        .categories
        .iter()
        .map(|c| translate_category(c, lang))
        .collect()
}

fn category_table(lang: &str) -> &'static [(&'static str, &'static str)] {
    match lang {
        "es" => &[
            ("fiction", "Ficción"),
            ("nonfiction", "No ficción"),
            ("history", "Historia"),
            ("science", "Ciencia"),
            ("biography", "Biografía"),
            ("philosophy", "Filosofía"),
            ("psychology", "Psicología"),
            ("religion", "Religión"),
            ("poetry", "Poesía"),
            ("drama", "Teatro"),
            ("business", "Negocios"),
            ("economics", "Economía"),
            ("technology", "Tecnología"),
            ("computers", "Informática"),
            ("art", "Arte"),
            ("music", "Música"),
            ("travel", "Viajes"),
            ("cooking", "Cocina"),
            ("health", "Salud"),
            ("education", "Educación"),
            ("self-help", "Autoayuda"),
            ("juvenile fiction", "Ficción juvenil"),
        ],
        "fr" => &[
            ("fiction", "Fiction"),
            ("nonfiction", "Essai"),
            ("history", "Histoire"),
            ("science", "Science"),
            ("biography", "Biographie"),
            ("philosophy", "Philosophie"),
            ("psychology", "Psychologie"),
            ("religion", "Religion"),
            ("poetry", "Poésie"),
            ("drama", "Théâtre"),
            ("business", "Affaires"),
            ("economics", "Économie"),
            ("technology", "Technologie"),
            ("computers", "Informatique"),
            ("art", "Art"),
            ("music", "Musique"),
            ("travel", "Voyage"),
            ("cooking", "Cuisine"),
            ("health", "Santé"),
            ("education", "Éducation"),
            ("self-help", "Développement personnel"),
            ("juvenile fiction", "Fiction jeunesse"),
        ],
        "de" => &[
            ("fiction", "Belletristik"),
            ("nonfiction", "Sachbuch"),
            ("history", "Geschichte"),
            ("science", "Wissenschaft"),
            ("biography", "Biografie"),
            ("philosophy", "Philosophie"),
            ("psychology", "Psychologie"),
            ("religion", "Religion"),
            ("poetry", "Lyrik"),
            ("drama", "Drama"),
            ("business", "Wirtschaft"),
            ("economics", "Ökonomie"),
            ("technology", "Technik"),
            ("computers", "Informatik"),
            ("art", "Kunst"),
            ("music", "Musik"),
            ("travel", "Reisen"),
            ("cooking", "Kochen"),
            ("health", "Gesundheit"),
            ("education", "Bildung"),
            ("self-help", "Selbsthilfe"),
            ("juvenile fiction", "Jugendliteratur"),
        ],
        "it" => &[
            ("fiction", "Narrativa"),
            ("nonfiction", "Saggistica"),
            ("history", "Storia"),
            ("science", "Scienza"),
            ("biography", "Biografia"),
            ("philosophy", "Filosofia"),
            ("psychology", "Psicologia"),
            ("religion", "Religione"),
            ("poetry", "Poesia"),
            ("drama", "Teatro"),
            ("business", "Affari"),
            ("economics", "Economia"),
            ("technology", "Tecnologia"),
            ("computers", "Informatica"),
            ("art", "Arte"),
            ("music", "Musica"),
            ("travel", "Viaggi"),
            ("cooking", "Cucina"),
            ("health", "Salute"),
            ("education", "Istruzione"),
            ("self-help", "Auto-aiuto"),
            ("juvenile fiction", "Narrativa per ragazzi"),
        ],
        "pt" => &[
            ("fiction", "Ficção"),
            ("nonfiction", "Não ficção"),
            ("history", "História"),
            ("science", "Ciência"),
            ("biography", "Biografia"),
            ("philosophy", "Filosofia"),
            ("psychology", "Psicologia"),
            ("religion", "Religião"),
            ("poetry", "Poesia"),
            ("drama", "Teatro"),
            ("business", "Negócios"),
            ("economics", "Economia"),
            ("technology", "Tecnologia"),
            ("computers", "Informática"),
            ("art", "Arte"),
            ("music", "Música"),
            ("travel", "Viagens"),
            ("cooking", "Culinária"),
            ("health", "Saúde"),
            ("education", "Educação"),
            ("self-help", "Autoajuda"),
            ("juvenile fiction", "Ficção juvenil"),
        ],
        _ => &[],
    }
}

/// Pre-resolved interpolation inputs shared by all template forms.
struct TemplateParts {
    title: String,
    authors: String,
    categories: String,
    first_category: String,
    publisher: String,
    year: String,
    page_count: u32,
    description_excerpt: String,
}

impl TemplateParts {
    fn from_request(request: &SummaryRequest, lang: &str, categories: &[String]) -> Self {
        let conjunction = match lang {
            "es" => " y ",
            "fr" => " et ",
            "de" => " und ",
            "it" => " e ",
            "pt" => " e ",
            _ => " and ",
        };
        let authors = match request.authors.len() {
            0 => String::new(),
            1 => request.authors[0].clone(),
            n => format!(
                "{}{}{}",
                request.authors[..n - 1].join(", "),
                conjunction,
                request.authors[n - 1]
            ),
        };
        Self {
            title: request.title.clone(),
            authors,
            categories: categories.join(", "),
            first_category: categories.first().cloned().unwrap_or_default(),
            publisher: request.publisher.clone(),
            year: request.published_date.chars().take(4).collect(),
            page_count: request.page_count,
            description_excerpt: truncate(request.description.trim(), 400),
        }
    }

    fn short(&self, lang: &str) -> String {
        // No author clause at all when the metadata carries no authors;
        // a dangling connective reads worse than the omission.
        let mut s = if self.authors.is_empty() {
            match lang {
                "es" | "it" | "pt" => format!("«{}»", self.title),
                "fr" => format!("« {} »", self.title),
                "de" => format!("„{}\"", self.title),
                _ => format!("\"{}\"", self.title),
            }
        } else {
            match lang {
                "es" => format!("«{}», de {}", self.title, self.authors),
                "fr" => format!("« {} », de {}", self.title, self.authors),
                "de" => format!("„{}\" von {}", self.title, self.authors),
                "it" => format!("«{}», di {}", self.title, self.authors),
                "pt" => format!("«{}», de {}", self.title, self.authors),
                _ => format!("\"{}\" by {}", self.title, self.authors),
            }
        };
        if !self.categories.is_empty() {
            s.push_str(&match lang {
                "es" => format!(", es una obra de {}", self.categories),
                "fr" => format!(", est un ouvrage de {}", self.categories),
                "de" => format!(", ist ein Werk aus dem Bereich {}", self.categories),
                "it" => format!(", è un'opera di {}", self.categories),
                "pt" => format!(", é uma obra de {}", self.categories),
                _ => format!(", is a work of {}", self.categories),
            });
        }
        if !self.publisher.is_empty() && !self.year.is_empty() {
            s.push_str(&match lang {
                "es" => format!(" publicada por {} en {}", self.publisher, self.year),
                "fr" => format!(" publié par {} en {}", self.publisher, self.year),
                "de" => format!(", erschienen bei {} im Jahr {}", self.publisher, self.year),
                "it" => format!(" pubblicata da {} nel {}", self.publisher, self.year),
                "pt" => format!(" publicada por {} em {}", self.publisher, self.year),
                _ => format!(" published by {} in {}", self.publisher, self.year),
            });
        }
        s.push('.');
        s
    }

    fn detailed(&self, lang: &str) -> String {
        let mut s = self.short(lang);
        if self.page_count > 0 {
            s.push_str(&match lang {
                "es" => format!(" La edición cuenta con {} páginas.", self.page_count),
                "fr" => format!(" L'édition compte {} pages.", self.page_count),
                "de" => format!(" Die Ausgabe umfasst {} Seiten.", self.page_count),
                "it" => format!(" L'edizione conta {} pagine.", self.page_count),
                "pt" => format!(" A edição tem {} páginas.", self.page_count),
                _ => format!(" The edition runs to {} pages.", self.page_count),
            });
        }
        if !self.description_excerpt.is_empty() {
            s.push(' ');
            s.push_str(&self.description_excerpt);
        }
        s
    }

    /// Fixed shorter sentence used when a full template would bust its
    /// character budget.
    fn compact(&self, lang: &str) -> String {
        let category_clause = if self.first_category.is_empty() {
            String::new()
        } else {
            match lang {
                "es" => format!(" de {}", self.first_category),
                "fr" => format!(" de {}", self.first_category),
                "de" => format!(" aus dem Bereich {}", self.first_category),
                "it" => format!(" di {}", self.first_category),
                "pt" => format!(" de {}", self.first_category),
                _ => format!(" of {}", self.first_category),
            }
        };
        match lang {
            "es" => format!("«{}» es una obra{}.", self.title, category_clause),
            "fr" => format!("« {} » est un ouvrage{}.", self.title, category_clause),
            "de" => format!("„{}\" ist ein Werk{}.", self.title, category_clause),
            "it" => format!("«{}» è un'opera{}.", self.title, category_clause),
            "pt" => format!("«{}» é uma obra{}.", self.title, category_clause),
            _ => format!("\"{}\" is a work{}.", self.title, category_clause),
        }
    }
}
