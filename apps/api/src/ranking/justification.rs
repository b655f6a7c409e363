use async_trait::async_trait;

use crate::llm_client::{LlmClient, LlmError};
use crate::models::ranking::{RankedUser, RequiredSkill};
use crate::ranking::prompts::{JUSTIFICATION_PROMPT_TEMPLATE, JUSTIFICATION_SYSTEM};

/// Short natural-language reason a ranked user fits the profile.
#[async_trait]
pub trait Justifier: Send + Sync {
    async fn justify(
        &self,
        profile: &[RequiredSkill],
        user: &RankedUser,
    ) -> Result<String, LlmError>;
}

pub struct LlmJustifier {
    llm: LlmClient,
}

impl LlmJustifier {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Justifier for LlmJustifier {
    async fn justify(
        &self,
        profile: &[RequiredSkill],
        user: &RankedUser,
    ) -> Result<String, LlmError> {
        let prompt = build_prompt(profile, user);
        self.llm.call_text(&prompt, JUSTIFICATION_SYSTEM).await
    }
}

fn build_prompt(profile: &[RequiredSkill], user: &RankedUser) -> String {
    let required = profile
        .iter()
        .map(|r| format!("- {}: {}", r.name, r.required_proficiency.value()))
        .collect::<Vec<_>>()
        .join("\n");
    let matched = user
        .matched_skills
        .iter()
        .map(|m| {
            format!(
                "- {}: {}, {:.2}",
                m.skill_name,
                m.user_proficiency.value(),
                m.similarity
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    JUSTIFICATION_PROMPT_TEMPLATE
        .replace("{required}", &required)
        .replace("{full_name}", &user.full_name)
        .replace("{score}", &format!("{:.0}", user.match_score))
        .replace("{matched}", &matched)
}
