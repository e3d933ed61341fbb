/*!
common/src/lib.rs

Shared configuration types and DB helper functions for Bookscope.

This file provides:
- Config data structures (deserialized from TOML)
- An async loader supporting a default file merged with an override file
- Helpers to initialize an SQLite connection pool
*/

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;

/// Database configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the sqlite database file (e.g. "data/bookscope.db")
    pub path: String,
}

/// Remote LLM config (OpenAI-compatible chat-completions endpoint)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub api_url: Option<String>,
    /// Name of the environment variable holding the API key
    pub api_key_env: Option<String>,
    pub model: Option<String>,
    pub timeout_seconds: Option<u64>,
}

/// Rate/quota caps and invocation pacing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Per-client summary generations allowed per clock hour
    pub hourly_cap: Option<i64>,
    /// Global generations allowed per calendar month
    pub monthly_cap: Option<i64>,
    /// Minimum spacing between outbound calls, milliseconds
    pub min_spacing_ms: Option<u64>,
    /// Total attempts for a rate-limited invocation (first try included)
    pub max_attempts: Option<u32>,
    /// Base backoff delay before a retry, milliseconds
    pub base_delay_ms: Option<u64>,
}

impl LimitsConfig {
    pub fn hourly_cap(&self) -> i64 {
        self.hourly_cap.unwrap_or(10)
    }

    pub fn monthly_cap(&self) -> i64 {
        self.monthly_cap.unwrap_or(1000)
    }

    pub fn min_spacing_ms(&self) -> u64 {
        self.min_spacing_ms.unwrap_or(500)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts.unwrap_or(3)
    }

    pub fn base_delay_ms(&self) -> u64 {
        self.base_delay_ms.unwrap_or(500)
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub address: Option<String>,
    pub port: Option<u16>,
    /// Fixed allow-list of origins permitted to call the API
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

/// Top-level application configuration (deserialized from config.toml)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub llm: Option<LlmConfig>,
    #[serde(default)]
    pub limits: LimitsConfig,
    pub server: Option<ServerConfig>,
}

impl Config {
    /// Load configuration from a TOML file asynchronously.
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = tokio::fs::read_to_string(path.as_ref())
            .await
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let cfg: Config = toml::from_str(&data).context("Failed to parse TOML configuration")?;
        Ok(cfg)
    }

    /// Load configuration with an optional default file and an optional override file.
    /// If both are present, they are merged (override takes precedence).
    pub async fn load_with_defaults(
        default_path: Option<&Path>,
        override_path: Option<&Path>,
    ) -> Result<Self> {
        let mut config_value = toml::Value::Table(toml::map::Map::new());

        if let Some(path) = default_path {
            if path.exists() {
                let data = tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("Failed to read default config: {}", path.display()))?;
                let val: toml::Value =
                    toml::from_str(&data).context("Failed to parse default configuration")?;
                merge_toml(&mut config_value, val);
            }
        }

        if let Some(path) = override_path {
            if path.exists() {
                let data = tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("Failed to read override config: {}", path.display()))?;
                let val: toml::Value =
                    toml::from_str(&data).context("Failed to parse override configuration")?;
                merge_toml(&mut config_value, val);
            }
        }

        let cfg: Config = config_value
            .try_into()
            .context("Failed to parse merged configuration")?;
        Ok(cfg)
    }
}

fn merge_toml(a: &mut toml::Value, b: toml::Value) {
    match (a, b) {
        (toml::Value::Table(a_map), toml::Value::Table(b_map)) => {
            for (k, v) in b_map {
                if let Some(a_val) = a_map.get_mut(&k) {
                    merge_toml(a_val, v);
                } else {
                    a_map.insert(k, v);
                }
            }
        }
        (a_val, b_val) => *a_val = b_val,
    }
}

/// Initialize an SQLite connection pool.
///
/// Creates the parent directory if necessary, ensures the DB file exists
/// (attempting to create it if missing), and returns a configured `SqlitePool`.
/// Defaults are conservative for resource-constrained platforms:
/// - max_connections: 5
/// - WAL journal mode
pub async fn init_db_pool(path: &str) -> Result<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = Path::new(path).parent() {
        tokio::fs::create_dir_all(parent).await.with_context(|| {
            format!("Failed to create DB parent directory: {}", parent.display())
        })?;
    }

    // Try to create the DB file if it does not already exist. This gives a clearer error
    // earlier (filesystem permission or path issues) instead of only surfacing it via the
    // SQLite connection attempt.
    tokio::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .open(path)
        .await
        .with_context(|| format!("Failed to create or open DB file: {}", path))?;

    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", path))?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to connect to sqlite database at path: {}", path))?;

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::SystemTime;

    #[tokio::test]
    async fn config_from_string_and_db_pool() {
        // Minimal TOML to test parsing
        let toml = r#"
            [database]
            path = "data/test.db"

            [llm]
            api_url = "http://localhost:11434/v1/chat/completions"
            api_key_env = "BOOKSCOPE_API_KEY"
            model = "gpt-4o-mini"

            [limits]
            hourly_cap = 10
            monthly_cap = 1000
        "#;

        let cfg: Config = toml::from_str(toml).expect("parse config");
        assert_eq!(cfg.limits.hourly_cap(), 10);
        assert_eq!(cfg.limits.monthly_cap(), 1000);
        // Pacing and retry fall back to their defaults when absent
        assert_eq!(cfg.limits.min_spacing_ms(), 500);
        assert_eq!(cfg.limits.max_attempts(), 3);
        assert_eq!(
            cfg.llm.as_ref().and_then(|l| l.model.as_deref()),
            Some("gpt-4o-mini")
        );

        // Test DB pool initialization in a temporary directory under the OS temp dir
        let now = SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time")
            .as_millis();
        let dir = std::env::temp_dir().join(format!("bookscope_test_{}", now));
        let _ = fs::create_dir_all(&dir);
        let db_path = dir.join("bookscope.db");
        let db_path_str = db_path.to_string_lossy().to_string();

        let pool = init_db_pool(&db_path_str).await.expect("init pool");
        let conn = pool.acquire().await.expect("acquire conn");
        drop(conn);
    }

    #[test]
    fn merged_override_takes_precedence() {
        let mut base: toml::Value = toml::from_str(
            r#"
            [database]
            path = "data/default.db"
            [limits]
            hourly_cap = 10
        "#,
        )
        .unwrap();
        let over: toml::Value = toml::from_str(
            r#"
            [database]
            path = "data/override.db"
        "#,
        )
        .unwrap();
        merge_toml(&mut base, over);
        let cfg: Config = base.try_into().unwrap();
        assert_eq!(cfg.database.path, "data/override.db");
        assert_eq!(cfg.limits.hourly_cap(), 10);
    }
}
