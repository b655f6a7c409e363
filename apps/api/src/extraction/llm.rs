use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::extraction::prompts::{EXTRACTION_PROMPT_TEMPLATE, EXTRACTION_SYSTEM};
use crate::extraction::{
    sanitize_skills, seniority_range, ExtractionError, ExtractionOutput, ProficiencyRange,
    SkillExtractor,
};
use crate::llm_client::prompts::PROFICIENCY_SCALE;
use crate::llm_client::LlmClient;
use crate::models::collaborator::CollaboratorRecord;
use crate::models::skill::{ExtractedSkill, Proficiency, SkillOrigin};

/// Per-collaborator payload sent to the model. Empty fields are omitted.
#[derive(Debug, Serialize)]
struct ExtractionInput<'a> {
    user_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    seniority: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    responsibilities: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    certifications: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    education: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    language_proficiency: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    development_plan: Option<&'a str>,
    suggested_proficiency: ProficiencyRange,
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl<'a> From<&'a CollaboratorRecord> for ExtractionInput<'a> {
    fn from(record: &'a CollaboratorRecord) -> Self {
        Self {
            user_name: &record.user_name,
            seniority: non_empty(&record.seniority),
            responsibilities: non_empty(&record.responsibilities),
            certifications: non_empty(&record.certifications),
            education: non_empty(&record.education),
            language_proficiency: non_empty(&record.language_proficiency),
            development_plan: non_empty(&record.development_plan),
            suggested_proficiency: seniority_range(record.seniority.as_deref()),
        }
    }
}

/// Shape the model is asked to return. Proficiency stays untyped so that
/// strings, floats or missing values can be clamped instead of rejected.
#[derive(Debug, Deserialize)]
struct RawSkill {
    name: String,
    #[serde(default)]
    proficiency: Option<serde_json::Value>,
    origin: SkillOrigin,
}

impl From<RawSkill> for ExtractedSkill {
    fn from(raw: RawSkill) -> Self {
        ExtractedSkill {
            name: raw.name,
            proficiency: Proficiency::from_json(raw.proficiency.as_ref()),
            origin: raw.origin,
        }
    }
}

pub struct LlmSkillExtractor {
    llm: LlmClient,
}

impl LlmSkillExtractor {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl SkillExtractor for LlmSkillExtractor {
    async fn extract(
        &self,
        records: &[CollaboratorRecord],
    ) -> Result<ExtractionOutput, ExtractionError> {
        if records.is_empty() {
            return Ok(HashMap::new());
        }

        let prompt = build_prompt(records)?;
        let raw: HashMap<String, Vec<RawSkill>> =
            self.llm.call_json(&prompt, EXTRACTION_SYSTEM).await?;

        let output = into_output(records, raw);
        debug!(
            "extracted skills for {}/{} collaborators",
            output.len(),
            records.len()
        );
        Ok(output)
    }
}

fn build_prompt(records: &[CollaboratorRecord]) -> Result<String, ExtractionError> {
    let inputs: Vec<ExtractionInput<'_>> = records.iter().map(ExtractionInput::from).collect();
    let collaborators = serde_json::to_string_pretty(&inputs)
        .map_err(|e| ExtractionError::Malformed(format!("cannot encode page: {e}")))?;
    Ok(EXTRACTION_PROMPT_TEMPLATE
        .replace("{collaborators}", &collaborators)
        .replace("{proficiency_scale}", PROFICIENCY_SCALE))
}

/// Keeps only user names that were actually on the page.
fn into_output(
    records: &[CollaboratorRecord],
    mut raw: HashMap<String, Vec<RawSkill>>,
) -> ExtractionOutput {
    records
        .iter()
        .filter_map(|record| {
            let skills = raw.remove(&record.user_name)?;
            let skills = sanitize_skills(skills.into_iter().map(ExtractedSkill::from).collect());
            Some((record.user_name.clone(), skills))
        })
        .collect()
}
