//! Similarity service: one batched call scoring required names against the
//! tenant's skill catalog. Threshold filtering happens here, at the boundary.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::llm_client::{LlmClient, LlmError};
use crate::ranking::prompts::{SIMILARITY_PROMPT_TEMPLATE, SIMILARITY_SYSTEM};

/// Pairs below this similarity are never returned.
pub const SIMILARITY_THRESHOLD: f64 = 0.5;

#[derive(Debug, Error)]
pub enum SimilarityError {
    #[error("similarity call failed: {0}")]
    Llm(#[from] LlmError),

    #[error("cannot encode similarity request: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarMatch {
    pub existing_name: String,
    pub similarity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityRow {
    pub required_name: String,
    #[serde(default)]
    pub matches: Vec<SimilarMatch>,
}

#[async_trait]
pub trait SimilarityService: Send + Sync {
    /// Every returned match has similarity in [0.5, 1.0] and an
    /// `existing_name` taken from `existing`.
    async fn similarities(
        &self,
        required: &[String],
        existing: &[String],
    ) -> Result<Vec<SimilarityRow>, SimilarityError>;
}

pub struct LlmSimilarityService {
    llm: LlmClient,
}

impl LlmSimilarityService {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl SimilarityService for LlmSimilarityService {
    async fn similarities(
        &self,
        required: &[String],
        existing: &[String],
    ) -> Result<Vec<SimilarityRow>, SimilarityError> {
        let prompt = SIMILARITY_PROMPT_TEMPLATE
            .replace("{required}", &serde_json::to_string(required)?)
            .replace("{existing}", &serde_json::to_string(existing)?);
        let rows: Vec<SimilarityRow> = self.llm.call_json(&prompt, SIMILARITY_SYSTEM).await?;
        Ok(filter_rows(rows, existing))
    }
}

/// Clamps scores into [0, 1], drops pairs under the threshold and names the
/// catalog does not contain. A name that differs from a catalog entry only
/// by case is rewritten to the catalog spelling.
pub fn filter_rows(rows: Vec<SimilarityRow>, existing: &[String]) -> Vec<SimilarityRow> {
    let exact: HashSet<&str> = existing.iter().map(String::as_str).collect();
    let mut folded: HashMap<String, &str> = HashMap::new();
    for name in existing {
        folded.entry(name.to_lowercase()).or_insert(name.as_str());
    }
    let spelling = |name: &str| -> Option<String> {
        let name = name.trim();
        if exact.contains(name) {
            return Some(name.to_string());
        }
        folded.get(&name.to_lowercase()).map(|s| s.to_string())
    };

    rows.into_iter()
        .map(|row| SimilarityRow {
            required_name: row.required_name,
            matches: row
                .matches
                .into_iter()
                .filter(|m| m.similarity.is_finite())
                .filter_map(|m| {
                    Some(SimilarMatch {
                        existing_name: spelling(&m.existing_name)?,
                        similarity: m.similarity.clamp(0.0, 1.0),
                    })
                })
                .filter(|m| m.similarity >= SIMILARITY_THRESHOLD)
                .collect(),
        })
        .filter(|row| !row.matches.is_empty())
        .collect()
}
