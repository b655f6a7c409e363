//! Axum route handler for talent ranking.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::ranking::{RankedUser, RequiredSkill};
use crate::models::skill::Proficiency;
use crate::state::AppState;

/// Proficiency arrives untyped; out-of-range or missing values are
/// clamped or defaulted rather than rejected.
#[derive(Debug, Deserialize)]
pub struct RequiredSkillInput {
    pub name: String,
    #[serde(default)]
    pub required_proficiency: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct RankRequest {
    pub tenant_id: Uuid,
    pub required_skills: Vec<RequiredSkillInput>,
}

#[derive(Debug, Serialize)]
pub struct RankResponse {
    pub rankings: Vec<RankedUser>,
}

/// POST /api/v1/talent/rank
pub async fn handle_rank(
    State(state): State<AppState>,
    Json(request): Json<RankRequest>,
) -> Result<Json<RankResponse>, AppError> {
    let profile = request
        .required_skills
        .into_iter()
        .map(|input| RequiredSkill {
            name: input.name,
            required_proficiency: Proficiency::from_json(input.required_proficiency.as_ref()),
        })
        .collect();

    let rankings = state.ranking.rank(request.tenant_id, profile).await?;
    Ok(Json(RankResponse { rankings }))
}
