//! Heuristic language-consistency scrubber.
//!
//! Summaries requested in es/de/pt/it routinely leak English words from the
//! source metadata (category names, connectives like "written by"). The
//! guard runs an ordered list of whole-word, case-insensitive substitutions
//! over any generated or templated text: multi-word phrase patterns first,
//! then single words. This is a best-effort net, not a correctness
//! guarantee, and it makes no attempt at full linguistic purity.

use regex::Regex;
use std::collections::HashMap;

struct Rule {
    pattern: Regex,
    replacement: &'static str,
}

struct RuleTable {
    phrases: Vec<Rule>,
    words: Vec<Rule>,
}

/// Compiled substitution tables, keyed by target language code. Compile
/// once at startup and share; the tables are never rebuilt per call.
pub struct LanguageGuard {
    tables: HashMap<&'static str, RuleTable>,
}

impl LanguageGuard {
    pub fn new() -> Self {
        let mut tables = HashMap::new();
        for (lang, phrases, words) in rule_specs() {
            tables.insert(
                lang,
                RuleTable {
                    phrases: compile(phrases),
                    words: compile(words),
                },
            );
        }
        Self { tables }
    }

    /// Apply the substitution passes for `target_language`. Languages
    /// without a table (notably English) pass through unchanged.
    ///
    /// Substitution is textual and non-recursive: each pass scans the text
    /// once and never re-scans its own output.
    pub fn scrub(&self, text: &str, target_language: &str) -> String {
        let Some(table) = self.tables.get(target_language) else {
            return text.to_string();
        };

        let mut out = text.to_string();
        for rule in table.phrases.iter().chain(table.words.iter()) {
            out = rule.pattern.replace_all(&out, rule.replacement).into_owned();
        }
        out
    }
}

impl Default for LanguageGuard {
    fn default() -> Self {
        Self::new()
    }
}

fn compile(specs: &'static [(&'static str, &'static str)]) -> Vec<Rule> {
    specs
        .iter()
        .map(|(pat, replacement)| Rule {
            // Patterns are fixed literals; a failure here is a programming
            // error caught by the unit tests, not a runtime condition.
            pattern: Regex::new(&format!(r"(?i)\b{}\b", regex::escape(pat)))
                .expect("static guard rule pattern"),
            replacement,
        })
        .collect()
}

type Specs = &'static [(&'static str, &'static str)];

fn rule_specs() -> [(&'static str, Specs, Specs); 4] {
    [
        (
            "es",
            &[
                ("written by", "escrito por"),
                ("published by", "publicado por"),
                ("based on", "basado en"),
                ("page count", "número de páginas"),
                ("as well as", "así como"),
            ],
            &[
                ("history", "historia"),
                ("fiction", "ficción"),
                ("science", "ciencia"),
                ("biography", "biografía"),
                ("book", "libro"),
                ("author", "autor"),
                ("authors", "autores"),
                ("publisher", "editorial"),
                ("pages", "páginas"),
                ("summary", "resumen"),
                ("chapter", "capítulo"),
                ("novel", "novela"),
                ("reader", "lector"),
            ],
        ),
        (
            "de",
            &[
                ("written by", "geschrieben von"),
                ("published by", "veröffentlicht von"),
                ("based on", "basierend auf"),
                ("page count", "Seitenzahl"),
            ],
            &[
                ("history", "Geschichte"),
                ("fiction", "Belletristik"),
                ("science", "Wissenschaft"),
                ("biography", "Biografie"),
                ("book", "Buch"),
                ("author", "Autor"),
                ("publisher", "Verlag"),
                ("pages", "Seiten"),
                ("summary", "Zusammenfassung"),
                ("chapter", "Kapitel"),
                ("novel", "Roman"),
                ("reader", "Leser"),
            ],
        ),
        (
            "pt",
            &[
                ("written by", "escrito por"),
                ("published by", "publicado por"),
                ("based on", "baseado em"),
                ("page count", "número de páginas"),
            ],
            &[
                ("history", "história"),
                ("fiction", "ficção"),
                ("science", "ciência"),
                ("biography", "biografia"),
                ("book", "livro"),
                ("author", "autor"),
                ("publisher", "editora"),
                ("pages", "páginas"),
                ("summary", "resumo"),
                ("chapter", "capítulo"),
                ("novel", "romance"),
                ("reader", "leitor"),
            ],
        ),
        (
            "it",
            &[
                ("written by", "scritto da"),
                ("published by", "pubblicato da"),
                ("based on", "basato su"),
                ("page count", "numero di pagine"),
            ],
            &[
                ("history", "storia"),
                ("fiction", "narrativa"),
                ("science", "scienza"),
                ("biography", "biografia"),
                ("book", "libro"),
                ("author", "autore"),
                ("publisher", "editore"),
                ("pages", "pagine"),
                ("summary", "riassunto"),
                ("chapter", "capitolo"),
                ("novel", "romanzo"),
                ("reader", "lettore"),
            ],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn english_passes_through() {
        let guard = LanguageGuard::new();
        let text = "A book written by an author about history.";
        assert_eq!(guard.scrub(text, "en"), text);
        assert_eq!(guard.scrub(text, "fr"), text);
    }

    #[test]
    fn spanish_known_substitutions_fire() {
        let guard = LanguageGuard::new();
        let out = guard.scrub("Una obra de History written by un autor.", "es");
        assert!(out.contains("historia"), "got: {}", out);
        assert!(out.contains("escrito por"), "got: {}", out);
        assert!(!out.contains("History"));
        assert!(!out.contains("written by"));
    }

    #[test]
    fn phrases_apply_before_words() {
        let guard = LanguageGuard::new();
        // "published by" must become "publicado por" as a unit, not
        // "publisher"-then-"by" fragments.
        let out = guard.scrub("published by Random House", "es");
        assert!(out.starts_with("publicado por"), "got: {}", out);
    }

    #[test]
    fn whole_word_only() {
        let guard = LanguageGuard::new();
        // "prehistory" must not be rewritten by the "history" rule.
        let out = guard.scrub("prehistory", "es");
        assert_eq!(out, "prehistory");
    }

    #[test]
    fn case_insensitive_match() {
        let guard = LanguageGuard::new();
        let out = guard.scrub("SCIENCE and Fiction", "it");
        assert!(out.contains("scienza"));
        assert!(out.contains("narrativa"));
    }

    #[test]
    fn german_and_portuguese_tables() {
        let guard = LanguageGuard::new();
        assert!(guard.scrub("a great book", "de").contains("Buch"));
        assert!(guard.scrub("written by someone", "pt").contains("escrito por"));
    }

    #[test]
    fn substitution_does_not_rescan_output() {
        let guard = LanguageGuard::new();
        // "historia" contains no rule word, so a second scrub is a no-op.
        let once = guard.scrub("History of history", "es");
        let twice = guard.scrub(&once, "es");
        assert_eq!(once, twice);
    }
}
