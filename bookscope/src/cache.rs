//! Small in-process ring buffer of recently generated summaries, keyed by
//! ISBN + language. Serves immediate duplicate requests without burning
//! rate allowance; oldest entries are overwritten once capacity is hit.

use std::collections::VecDeque;
use tokio::sync::Mutex;

use crate::summary::AiBookSummary;

pub struct RecentActivityCache {
    capacity: usize,
    entries: Mutex<VecDeque<(String, AiBookSummary)>>,
}

impl RecentActivityCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(VecDeque::new()),
        }
    }

    fn cache_key(isbn: &str, language: &str) -> String {
        format!("{}:{}", isbn, language)
    }

    pub async fn get(&self, isbn: &str, language: &str) -> Option<AiBookSummary> {
        let key = Self::cache_key(isbn, language);
        let entries = self.entries.lock().await;
        entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, summary)| summary.clone())
    }

    pub async fn put(&self, isbn: &str, summary: AiBookSummary) {
        let key = Self::cache_key(isbn, &summary.language);
        let mut entries = self.entries.lock().await;
        entries.retain(|(k, _)| *k != key);
        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back((key, summary));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confidence;
    use crate::summary::{ProcessingMethod, SummaryRequest};

    fn summary_for(isbn: &str) -> AiBookSummary {
        let request = SummaryRequest {
            title: "T".to_string(),
            authors: vec![],
            isbn: isbn.to_string(),
            description: String::new(),
            categories: vec![],
            publisher: String::new(),
            published_date: String::new(),
            page_count: 0,
            source_language: "en".to_string(),
            target_language: "en".to_string(),
            average_rating: None,
            ratings_count: None,
        };
        let report = confidence::score(&request, true, false);
        AiBookSummary {
            short_summary: "s".to_string(),
            detailed_summary: "d".to_string(),
            confidence_score: report.overall,
            reasoning_factors: report.reasoning_factors,
            sources_used: report.sources_used,
            source_attribution: report.attribution,
            detailed_confidence_factors: report.factors,
            language: "en".to_string(),
            generated_at: chrono::Utc::now(),
            processing_method: ProcessingMethod::FallbackTemplate,
            translation_applied: false,
        }
    }

    #[tokio::test]
    async fn evicts_oldest_when_full() {
        let cache = RecentActivityCache::new(2);
        cache.put("111", summary_for("111")).await;
        cache.put("222", summary_for("222")).await;
        cache.put("333", summary_for("333")).await;

        assert!(cache.get("111", "en").await.is_none());
        assert!(cache.get("222", "en").await.is_some());
        assert!(cache.get("333", "en").await.is_some());
    }

    #[tokio::test]
    async fn keyed_by_isbn_and_language() {
        let cache = RecentActivityCache::new(4);
        cache.put("111", summary_for("111")).await;
        assert!(cache.get("111", "en").await.is_some());
        assert!(cache.get("111", "es").await.is_none());
    }
}
