use std::time::Duration;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub llm_api_key: String,
    pub llm_api_url: String,
    pub s3: Option<S3Settings>,
    pub default_email_domain: String,
    pub batch: BatchSettings,
    pub ranking: RankingSettings,
    pub port: u16,
    pub rust_log: String,
}

/// Location and credentials of the bucket holding HR exports.
#[derive(Debug, Clone)]
pub struct S3Settings {
    pub bucket: String,
    pub endpoint: Option<String>,
    pub access_key_id: String,
    pub secret_access_key: String,
}

/// Paging and polling knobs for the batch controller.
#[derive(Debug, Clone)]
pub struct BatchSettings {
    /// Page size when each page goes through the LLM extractor.
    pub ai_batch_size: usize,
    /// Page size for direct (non-AI) imports.
    pub direct_batch_size: usize,
    /// Sleep between pages; skipped after the last page.
    pub inter_batch_delay: Duration,
    pub pause_poll_interval: Duration,
    /// A paused job that stays paused for this many polls is failed.
    pub max_pause_polls: u32,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            ai_batch_size: 25,
            direct_batch_size: 100,
            inter_batch_delay: Duration::from_millis(1000),
            pause_poll_interval: Duration::from_millis(2000),
            max_pause_polls: 300,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RankingSettings {
    pub limit: usize,
    pub justify_top: usize,
}

impl Default for RankingSettings {
    fn default() -> Self {
        Self {
            limit: 20,
            justify_top: 3,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let batch_defaults = BatchSettings::default();
        let ranking_defaults = RankingSettings::default();

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            llm_api_key: require_env("LLM_API_KEY")?,
            llm_api_url: std::env::var("LLM_API_URL")
                .unwrap_or_else(|_| crate::llm_client::DEFAULT_API_URL.to_string()),
            s3: s3_from_env()?,
            default_email_domain: std::env::var("DEFAULT_EMAIL_DOMAIN")
                .unwrap_or_else(|_| "company.com".to_string()),
            batch: BatchSettings {
                ai_batch_size: parse_env("BATCH_SIZE_AI", batch_defaults.ai_batch_size)?,
                direct_batch_size: parse_env(
                    "BATCH_SIZE_DIRECT",
                    batch_defaults.direct_batch_size,
                )?,
                inter_batch_delay: Duration::from_millis(parse_env(
                    "BATCH_DELAY_MS",
                    batch_defaults.inter_batch_delay.as_millis() as u64,
                )?),
                pause_poll_interval: Duration::from_millis(parse_env(
                    "PAUSE_POLL_INTERVAL_MS",
                    batch_defaults.pause_poll_interval.as_millis() as u64,
                )?),
                max_pause_polls: parse_env("PAUSE_MAX_POLLS", batch_defaults.max_pause_polls)?,
            },
            ranking: RankingSettings {
                limit: parse_env("RANKING_LIMIT", ranking_defaults.limit)?,
                justify_top: parse_env("JUSTIFY_TOP", ranking_defaults.justify_top)?,
            },
            port: parse_env("PORT", 8080u16)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

/// S3 is optional: only jobs that read their feed from a bucket need it.
fn s3_from_env() -> Result<Option<S3Settings>> {
    let Ok(bucket) = std::env::var("S3_BUCKET") else {
        return Ok(None);
    };
    Ok(Some(S3Settings {
        bucket,
        endpoint: std::env::var("S3_ENDPOINT").ok(),
        access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
        secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
    }))
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        Err(_) => Ok(default),
    }
}
