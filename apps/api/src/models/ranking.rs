use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::skill::Proficiency;

/// One line of a position's required-skill profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequiredSkill {
    pub name: String,
    pub required_proficiency: Proficiency,
}

/// A scored association between a required name and a catalog skill.
/// Only edges at or above the similarity threshold ever exist.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityEdge {
    pub required_name: String,
    pub existing_skill_id: Uuid,
    pub existing_skill_name: String,
    pub similarity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSkillMatch {
    /// Always the required skill's name, never the user's synonym.
    pub skill_name: String,
    pub required_proficiency: Proficiency,
    pub user_proficiency: Proficiency,
    pub similarity: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedUser {
    pub user_id: Uuid,
    pub user_name: String,
    pub full_name: String,
    /// 0–100, unrounded.
    pub match_score: f64,
    pub matched_skills: Vec<UserSkillMatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub justification: Option<String>,
}
