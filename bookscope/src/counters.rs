//! Windowed rate/quota counters.
//!
//! Each counter is an integer keyed by (counter key, window start). The
//! check is read-then-increment-then-compare and must stay atomic across
//! concurrent requests: two requests racing on the same window must not
//! both observe "under the cap". The SQLite implementation does the whole
//! operation in a single upsert statement; counters are never deleted,
//! old window keys simply age out.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Window key for the per-client hourly counter.
pub fn hour_window(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%dT%H").to_string()
}

/// Window key for the global monthly counter.
pub fn month_window(now: DateTime<Utc>) -> String {
    now.format("%Y-%m").to_string()
}

/// Injected counter-service interface. `check_and_increment` counts the
/// attempt (allowed or not) and reports whether it fit under `cap`.
#[async_trait::async_trait]
pub trait CounterStore: Send + Sync {
    async fn check_and_increment(&self, key: &str, window_start: &str, cap: i64) -> Result<bool>;
}

/// Counter store backed by the service's SQLite database.
pub struct SqliteCounterStore {
    pool: SqlitePool,
}

impl SqliteCounterStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl CounterStore for SqliteCounterStore {
    async fn check_and_increment(&self, key: &str, window_start: &str, cap: i64) -> Result<bool> {
        // Single statement: insert-or-increment and read back the new
        // count. SQLite serializes writers, so concurrent attempts each
        // see a distinct count.
        let count: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO rate_counters (counter_key, window_start, count)
            VALUES (?, ?, 1)
            ON CONFLICT(counter_key, window_start) DO UPDATE SET count = count + 1
            RETURNING count
            "#,
        )
        .bind(key)
        .bind(window_start)
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("failed to bump counter {} / {}", key, window_start))?;

        Ok(count <= cap)
    }
}

/// In-process counter store for tests and single-node setups.
#[derive(Default)]
pub struct MemoryCounterStore {
    counts: Mutex<HashMap<(String, String), i64>>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl CounterStore for MemoryCounterStore {
    async fn check_and_increment(&self, key: &str, window_start: &str, cap: i64) -> Result<bool> {
        let mut counts = self.counts.lock().await;
        let entry = counts
            .entry((key.to_string(), window_start.to_string()))
            .or_insert(0);
        *entry += 1;
        Ok(*entry <= cap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn window_keys() {
        let t = Utc.with_ymd_and_hms(2026, 8, 30, 14, 5, 0).unwrap();
        assert_eq!(hour_window(t), "2026-08-30T14");
        assert_eq!(month_window(t), "2026-08");
    }

    #[tokio::test]
    async fn memory_store_caps_at_limit() {
        let store = MemoryCounterStore::new();
        for _ in 0..10 {
            assert!(store
                .check_and_increment("client:a", "2026-08-30T14", 10)
                .await
                .unwrap());
        }
        // The 11th attempt in the same window is over the cap.
        assert!(!store
            .check_and_increment("client:a", "2026-08-30T14", 10)
            .await
            .unwrap());
        // A new hour window starts fresh.
        assert!(store
            .check_and_increment("client:a", "2026-08-30T15", 10)
            .await
            .unwrap());
        // Other clients are unaffected.
        assert!(store
            .check_and_increment("client:b", "2026-08-30T14", 10)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn denied_attempts_still_consume_allowance() {
        let store = MemoryCounterStore::new();
        for _ in 0..3 {
            store.check_and_increment("global", "2026-08", 2).await.unwrap();
        }
        // The denied third attempt was still counted, so the window stays
        // saturated.
        assert!(!store.check_and_increment("global", "2026-08", 2).await.unwrap());
    }
}
