//! Collaborator feed: resolves a job's `SourceConfig` into HR records.
//!
//! Any failure here is fatal to the job that asked for the feed.

use async_trait::async_trait;
use aws_sdk_s3::Client as S3Client;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::models::collaborator::CollaboratorRecord;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("feed unreachable: {0}")]
    Unreachable(String),

    #[error("feed could not be parsed: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("feed source not configured: {0}")]
    NotConfigured(String),
}

/// Where a batch job reads its collaborator records from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Records posted with the start request.
    Inline {
        collaborators: Vec<CollaboratorRecord>,
    },
    /// JSON array served over HTTP(S).
    Url { url: String },
    /// JSON array stored as an object in the HR export bucket.
    S3 { key: String },
}

#[async_trait]
pub trait CollaboratorSource: Send + Sync {
    async fn fetch(&self, config: &SourceConfig) -> Result<Vec<CollaboratorRecord>, FeedError>;
}

/// Production feed reader over HTTP and S3.
pub struct FeedReader {
    http: Client,
    s3: Option<(S3Client, String)>,
}

impl FeedReader {
    pub fn new(http: Client, s3: Option<(S3Client, String)>) -> Self {
        Self { http, s3 }
    }

    async fn fetch_url(&self, url: &str) -> Result<Vec<u8>, FeedError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| FeedError::Unreachable(e.to_string()))?;
        let body = response
            .bytes()
            .await
            .map_err(|e| FeedError::Unreachable(e.to_string()))?;
        Ok(body.to_vec())
    }

    async fn fetch_s3(&self, key: &str) -> Result<Vec<u8>, FeedError> {
        let (client, bucket) = self
            .s3
            .as_ref()
            .ok_or_else(|| FeedError::NotConfigured("S3_BUCKET is not set".to_string()))?;
        let object = client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| FeedError::Unreachable(format!("s3://{bucket}/{key}: {e}")))?;
        let body = object
            .body
            .collect()
            .await
            .map_err(|e| FeedError::Unreachable(format!("s3://{bucket}/{key}: {e}")))?;
        Ok(body.into_bytes().to_vec())
    }
}

#[async_trait]
impl CollaboratorSource for FeedReader {
    async fn fetch(&self, config: &SourceConfig) -> Result<Vec<CollaboratorRecord>, FeedError> {
        let records = match config {
            SourceConfig::Inline { collaborators } => collaborators.clone(),
            SourceConfig::Url { url } => parse_feed(&self.fetch_url(url).await?)?,
            SourceConfig::S3 { key } => parse_feed(&self.fetch_s3(key).await?)?,
        };
        let records = drop_anonymous(records);
        info!("collaborator feed loaded: {} records", records.len());
        Ok(records)
    }
}

pub fn parse_feed(body: &[u8]) -> Result<Vec<CollaboratorRecord>, FeedError> {
    Ok(serde_json::from_slice(body)?)
}

/// Records without a user name cannot be merged; they are skipped, not fatal.
fn drop_anonymous(records: Vec<CollaboratorRecord>) -> Vec<CollaboratorRecord> {
    let total = records.len();
    let kept: Vec<_> = records
        .into_iter()
        .map(|mut r| {
            r.user_name = r.user_name.trim().to_string();
            r
        })
        .filter(|r| !r.user_name.is_empty())
        .collect();
    if kept.len() < total {
        warn!("skipped {} feed records without user_name", total - kept.len());
    }
    kept
}
