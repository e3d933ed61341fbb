use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::summary::{AiBookSummary, ProcessingMethod, SummaryRequest};

/// Create the core tables if they do not exist. Idempotent; called at
/// startup so the service works against a fresh database file.
pub async fn ensure_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS summaries (
            id TEXT PRIMARY KEY,
            isbn TEXT NOT NULL,
            title TEXT NOT NULL,
            language TEXT NOT NULL,
            processing_method TEXT NOT NULL,
            confidence_score INTEGER NOT NULL,
            payload_json TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await
    .context("failed to create summaries table")?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_summaries_isbn ON summaries (isbn, language)")
        .execute(pool)
        .await
        .context("failed to create summaries index")?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS rate_counters (
            counter_key TEXT NOT NULL,
            window_start TEXT NOT NULL,
            count INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (counter_key, window_start)
        )
        "#,
    )
    .execute(pool)
    .await
    .context("failed to create rate_counters table")?;

    info!("database schema ensured");
    Ok(())
}

/// Persist a finished summary verbatim. Returns the opaque library-item id.
pub async fn store_summary(
    pool: &SqlitePool,
    request: &SummaryRequest,
    summary: &AiBookSummary,
) -> Result<String> {
    let id = Uuid::new_v4().to_string();
    let payload_json =
        serde_json::to_string(summary).context("failed to serialize summary payload")?;
    let method = match summary.processing_method {
        ProcessingMethod::OpenaiApi => "openai_api",
        ProcessingMethod::FallbackTemplate => "fallback_template",
    };

    sqlx::query(
        r#"
        INSERT INTO summaries
            (id, isbn, title, language, processing_method, confidence_score, payload_json, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&request.isbn)
    .bind(&request.title)
    .bind(&summary.language)
    .bind(method)
    .bind(summary.confidence_score as i64)
    .bind(&payload_json)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await
    .with_context(|| format!("failed to store summary for isbn {}", request.isbn))?;

    debug!("stored summary {} for isbn {}", id, request.isbn);
    Ok(id)
}

/// Load the most recently stored summary for an isbn/language pair, if one
/// was created at or after `since`. Older rows are ignored so a stored
/// summary only ever serves near-term duplicates, never replaces fresh
/// generation indefinitely.
pub async fn find_recent_by_isbn(
    pool: &SqlitePool,
    isbn: &str,
    language: &str,
    since: chrono::DateTime<Utc>,
) -> Result<Option<AiBookSummary>> {
    // created_at is stored as RFC 3339 in UTC, so string comparison
    // orders chronologically.
    let row = sqlx::query(
        "SELECT payload_json FROM summaries WHERE isbn = ? AND language = ? \
         AND created_at >= ? ORDER BY created_at DESC LIMIT 1",
    )
    .bind(isbn)
    .bind(language)
    .bind(since.to_rfc3339())
    .fetch_optional(pool)
    .await
    .context("failed to query stored summaries")?;

    match row {
        Some(row) => {
            let payload: String = row.get("payload_json");
            let summary = serde_json::from_str(&payload)
                .context("stored summary payload is not valid JSON")?;
            Ok(Some(summary))
        }
        None => Ok(None),
    }
}
