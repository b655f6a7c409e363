//! Skill extraction: turns one page of collaborator records into
//! `userName → ExtractedSkill[]`.
//!
//! `LlmSkillExtractor` reads the free-text HR fields through the LLM client.
//! `DirectSkillExtractor` imports the pipe-delimited hard-skill column without
//! any AI call. Both are carried as `Arc<dyn SkillExtractor>`.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::llm_client::LlmError;
use crate::models::collaborator::CollaboratorRecord;
use crate::models::skill::{normalize_skill_name, ExtractedSkill, Proficiency};

pub mod direct;
pub mod llm;
mod prompts;

pub use direct::DirectSkillExtractor;
pub use llm::LlmSkillExtractor;

/// Upper bound on skills kept per collaborator.
pub const MAX_SKILLS_PER_USER: usize = 15;

pub type ExtractionOutput = HashMap<String, Vec<ExtractedSkill>>;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("extraction call failed: {0}")]
    Llm(#[from] LlmError),

    #[error("malformed extraction output: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait SkillExtractor: Send + Sync {
    async fn extract(
        &self,
        records: &[CollaboratorRecord],
    ) -> Result<ExtractionOutput, ExtractionError>;
}

/// Suggested proficiency band for a seniority label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProficiencyRange {
    pub min: Proficiency,
    pub max: Proficiency,
}

impl ProficiencyRange {
    fn new(min: i64, max: i64) -> Self {
        Self {
            min: Proficiency::clamped(min),
            max: Proficiency::clamped(max),
        }
    }
}

/// junior → 2-3, mid → 3-4, senior/lead/manager → 4-5, anything else → 3-4.
pub fn seniority_range(seniority: Option<&str>) -> ProficiencyRange {
    let label = seniority.unwrap_or_default().to_lowercase();
    let has = |words: &[&str]| {
        label
            .split(|c: char| !c.is_alphanumeric())
            .any(|token| words.contains(&token))
    };

    if has(&["junior", "jr", "intern", "trainee"]) {
        ProficiencyRange::new(2, 3)
    } else if has(&["senior", "sr", "lead", "principal", "staff", "manager", "head"]) {
        ProficiencyRange::new(4, 5)
    } else {
        // mid-level and unrecognised labels share a band
        ProficiencyRange::new(3, 4)
    }
}

/// Normalizes names, drops blanks and case-insensitive duplicates (first wins),
/// and caps the list at `MAX_SKILLS_PER_USER`.
pub fn sanitize_skills(skills: Vec<ExtractedSkill>) -> Vec<ExtractedSkill> {
    let mut seen = HashSet::new();
    skills
        .into_iter()
        .filter_map(|mut skill| {
            skill.name = normalize_skill_name(&skill.name);
            if skill.name.is_empty() || !seen.insert(skill.name.to_lowercase()) {
                return None;
            }
            Some(skill)
        })
        .take(MAX_SKILLS_PER_USER)
        .collect()
}
