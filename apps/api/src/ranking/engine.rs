//! Talent ranking: scores every tenant user against a required-skill profile.
//!
//! Score for one user:
//!
//! ```text
//! numerator   = Σ over matched requirements  similarity × user_proficiency × required_proficiency
//! denominator = Σ over all requirements      required_proficiency × 5
//! score       = 100 × numerator / denominator
//! ```
//!
//! Each of the user's skills can satisfy at most one requirement. Candidate
//! pairs are assigned greedily by `similarity × user_proficiency`, highest
//! first, regardless of profile order. A user owning only "Spring Boot"
//! against a "Java" + "Spring" profile therefore matches "Spring" (0.9 × 4)
//! rather than whichever requirement is listed first (0.5 × 4).

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::RankingSettings;
use crate::errors::AppError;
use crate::models::ranking::{RankedUser, RequiredSkill, SimilarityEdge, UserSkillMatch};
use crate::models::skill::{normalize_skill_name, Proficiency, Skill, TenantUser};
use crate::ranking::justification::Justifier;
use crate::ranking::similarity::{SimilarityRow, SimilarityService};
use crate::store::SkillStore;

/// Maximum proficiency on the 1–5 scale; bounds each requirement's weight.
const MAX_PROFICIENCY: f64 = Proficiency::MAX as f64;

/// Edges grouped by required-skill position in the profile.
type SimilarityIndex = Vec<Vec<SimilarityEdge>>;

/// A user's links keyed by skill id.
type UserLinks = HashMap<Uuid, Proficiency>;

#[derive(Clone)]
pub struct TalentRankingEngine {
    skills: Arc<dyn SkillStore>,
    similarity: Arc<dyn SimilarityService>,
    justifier: Arc<dyn Justifier>,
    settings: RankingSettings,
}

impl TalentRankingEngine {
    pub fn new(
        skills: Arc<dyn SkillStore>,
        similarity: Arc<dyn SimilarityService>,
        justifier: Arc<dyn Justifier>,
        settings: RankingSettings,
    ) -> Self {
        Self {
            skills,
            similarity,
            justifier,
            settings,
        }
    }

    pub async fn rank(
        &self,
        tenant_id: Uuid,
        profile: Vec<RequiredSkill>,
    ) -> Result<Vec<RankedUser>, AppError> {
        let profile = normalize_profile(profile)?;

        let catalog = self.skills.list_skills(tenant_id).await?;
        let users = self.skills.list_users(tenant_id).await?;
        if catalog.is_empty() || users.is_empty() {
            info!(%tenant_id, "Nothing to rank: empty skill catalog or user list");
            return Ok(Vec::new());
        }

        let required_names: Vec<String> = profile.iter().map(|r| r.name.clone()).collect();
        let existing_names: Vec<String> = catalog.iter().map(|s| s.name.clone()).collect();
        let rows = self
            .similarity
            .similarities(&required_names, &existing_names)
            .await
            .map_err(|e| AppError::Llm(e.to_string()))?;
        let index = build_similarity_index(&profile, &rows, &catalog);

        let mut links_by_user: HashMap<Uuid, UserLinks> = HashMap::new();
        for link in self.skills.list_links(tenant_id).await? {
            links_by_user
                .entry(link.user_id)
                .or_default()
                .insert(link.skill_id, link.proficiency);
        }

        let empty = UserLinks::new();
        let mut ranked: Vec<RankedUser> = users
            .iter()
            .filter_map(|user| {
                let links = links_by_user.get(&user.id).unwrap_or(&empty);
                score_user(user, &profile, &index, links)
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.match_score
                .partial_cmp(&a.match_score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.user_name.cmp(&b.user_name))
        });
        ranked.truncate(self.settings.limit);

        for user in ranked.iter_mut().take(self.settings.justify_top) {
            match self.justifier.justify(&profile, user).await {
                Ok(text) => user.justification = Some(text.trim().to_string()),
                Err(e) => warn!(user = %user.user_name, error = %e, "Justification failed"),
            }
        }

        info!(
            %tenant_id,
            requirements = profile.len(),
            candidates = users.len(),
            ranked = ranked.len(),
            "Ranking complete"
        );
        Ok(ranked)
    }
}

/// Trims names, drops blanks, keeps the first of case-insensitive duplicates.
fn normalize_profile(profile: Vec<RequiredSkill>) -> Result<Vec<RequiredSkill>, AppError> {
    let mut seen = HashSet::new();
    let normalized: Vec<RequiredSkill> = profile
        .into_iter()
        .filter_map(|r| {
            let name = normalize_skill_name(&r.name);
            if name.is_empty() || !seen.insert(name.to_lowercase()) {
                return None;
            }
            Some(RequiredSkill {
                name,
                required_proficiency: r.required_proficiency,
            })
        })
        .collect();

    if normalized.is_empty() {
        return Err(AppError::InvalidArgument(
            "required_skills must contain at least one named skill".to_string(),
        ));
    }
    Ok(normalized)
}

/// Resolves similarity rows against the profile and catalog. Row and
/// catalog names match exactly first, then case-insensitively. Duplicate
/// pairs keep their highest similarity.
fn build_similarity_index(
    profile: &[RequiredSkill],
    rows: &[SimilarityRow],
    catalog: &[Skill],
) -> SimilarityIndex {
    let position: HashMap<String, usize> = profile
        .iter()
        .enumerate()
        .map(|(i, r)| (r.name.to_lowercase(), i))
        .collect();
    let mut index: SimilarityIndex = vec![Vec::new(); profile.len()];
    for row in rows {
        let Some(&i) = position.get(&normalize_skill_name(&row.required_name).to_lowercase())
        else {
            continue;
        };
        for m in &row.matches {
            let Some(skill) = resolve_skill(catalog, &m.existing_name) else {
                continue;
            };
            let edges = &mut index[i];
            match edges.iter_mut().find(|e| e.existing_skill_id == skill.id) {
                Some(edge) => edge.similarity = edge.similarity.max(m.similarity),
                None => edges.push(SimilarityEdge {
                    required_name: profile[i].name.clone(),
                    existing_skill_id: skill.id,
                    existing_skill_name: skill.name.clone(),
                    similarity: m.similarity,
                }),
            }
        }
    }
    index
}

fn resolve_skill<'a>(catalog: &'a [Skill], name: &str) -> Option<&'a Skill> {
    catalog
        .iter()
        .find(|s| s.name == name)
        .or_else(|| catalog.iter().find(|s| s.name.eq_ignore_ascii_case(name)))
}

/// Returns `None` when the user satisfies no requirement at all.
fn score_user(
    user: &TenantUser,
    profile: &[RequiredSkill],
    index: &SimilarityIndex,
    links: &UserLinks,
) -> Option<RankedUser> {
    // (requirement position, edge, user proficiency)
    let mut candidates: Vec<(usize, &SimilarityEdge, Proficiency)> = index
        .iter()
        .enumerate()
        .flat_map(|(i, edges)| edges.iter().map(move |e| (i, e)))
        .filter_map(|(i, e)| links.get(&e.existing_skill_id).map(|p| (i, e, *p)))
        .collect();
    // Stable sort: ties keep profile order, then edge order.
    candidates.sort_by(|(_, a, pa), (_, b, pb)| {
        (b.similarity * pb.as_f64())
            .partial_cmp(&(a.similarity * pa.as_f64()))
            .unwrap_or(Ordering::Equal)
    });

    let mut assigned: Vec<Option<(&SimilarityEdge, Proficiency)>> = vec![None; profile.len()];
    let mut consumed: HashSet<Uuid> = HashSet::new();
    for (i, edge, proficiency) in candidates {
        if assigned[i].is_some() || consumed.contains(&edge.existing_skill_id) {
            continue;
        }
        consumed.insert(edge.existing_skill_id);
        debug!(
            user = %user.user_name,
            required = %edge.required_name,
            matched = %edge.existing_skill_name,
            similarity = edge.similarity,
            "Assigned skill match"
        );
        assigned[i] = Some((edge, proficiency));
    }

    let mut numerator = 0.0;
    let mut denominator = 0.0;
    let mut matched_skills = Vec::new();
    for (required, slot) in profile.iter().zip(&assigned) {
        let weight = required.required_proficiency.as_f64();
        denominator += weight * MAX_PROFICIENCY;
        if let Some((edge, proficiency)) = slot {
            numerator += edge.similarity * proficiency.as_f64() * weight;
            matched_skills.push(UserSkillMatch {
                skill_name: required.name.clone(),
                required_proficiency: required.required_proficiency,
                user_proficiency: *proficiency,
                similarity: edge.similarity,
            });
        }
    }

    if matched_skills.is_empty() || denominator <= 0.0 {
        return None;
    }

    Some(RankedUser {
        user_id: user.id,
        user_name: user.user_name.clone(),
        full_name: user.full_name.clone(),
        match_score: (100.0 * numerator / denominator).clamp(0.0, 100.0),
        matched_skills,
        justification: None,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::llm_client::LlmError;
    use crate::ranking::similarity::{filter_rows, SimilarMatch, SimilarityError};
    use crate::store::memory::MemoryStore;

    /// Serves canned (required, existing, similarity) triples.
    struct FixedSimilarity {
        pairs: Vec<(&'static str, &'static str, f64)>,
        calls: Mutex<usize>,
    }

    impl FixedSimilarity {
        fn new(pairs: Vec<(&'static str, &'static str, f64)>) -> Arc<Self> {
            Arc::new(Self {
                pairs,
                calls: Mutex::new(0),
            })
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl SimilarityService for FixedSimilarity {
        async fn similarities(
            &self,
            required: &[String],
            existing: &[String],
        ) -> Result<Vec<SimilarityRow>, SimilarityError> {
            *self.calls.lock().unwrap() += 1;
            let rows = required
                .iter()
                .map(|r| SimilarityRow {
                    required_name: r.clone(),
                    matches: self
                        .pairs
                        .iter()
                        .filter(|(req, _, _)| req == r)
                        .map(|(_, existing_name, similarity)| SimilarMatch {
                            existing_name: existing_name.to_string(),
                            similarity: *similarity,
                        })
                        .collect(),
                })
                .collect();
            Ok(filter_rows(rows, existing))
        }
    }

    struct EchoJustifier;

    #[async_trait]
    impl Justifier for EchoJustifier {
        async fn justify(
            &self,
            _profile: &[RequiredSkill],
            user: &RankedUser,
        ) -> Result<String, LlmError> {
            Ok(format!("{} fits", user.full_name))
        }
    }

    struct FailingJustifier;

    #[async_trait]
    impl Justifier for FailingJustifier {
        async fn justify(
            &self,
            _profile: &[RequiredSkill],
            _user: &RankedUser,
        ) -> Result<String, LlmError> {
            Err(LlmError::EmptyContent)
        }
    }

    fn required(name: &str, proficiency: i64) -> RequiredSkill {
        RequiredSkill {
            name: name.to_string(),
            required_proficiency: Proficiency::clamped(proficiency),
        }
    }

    fn engine(
        store: Arc<MemoryStore>,
        similarity: Arc<dyn SimilarityService>,
        justifier: Arc<dyn Justifier>,
    ) -> TalentRankingEngine {
        TalentRankingEngine::new(store, similarity, justifier, RankingSettings::default())
    }

    #[tokio::test]
    async fn test_exact_match_at_max_proficiency_scores_100() {
        let tenant = Uuid::new_v4();
        let store = Arc::new(MemoryStore::new());
        store.seed_link(tenant, "ana", "Python", 5);

        let ranking = engine(
            store,
            FixedSimilarity::new(vec![("Python", "Python", 1.0)]),
            Arc::new(EchoJustifier),
        )
        .rank(tenant, vec![required("Python", 4)])
        .await
        .unwrap();

        assert_eq!(ranking.len(), 1);
        assert!((ranking[0].match_score - 100.0).abs() < 1e-9);
        assert_eq!(ranking[0].matched_skills[0].skill_name, "Python");
        assert_eq!(ranking[0].justification.as_deref(), Some("ana fits"));
    }

    #[tokio::test]
    async fn test_one_user_skill_satisfies_only_its_best_requirement() {
        let tenant = Uuid::new_v4();
        let store = Arc::new(MemoryStore::new());
        store.seed_link(tenant, "bruno", "Spring Boot", 4);

        let ranking = engine(
            store,
            FixedSimilarity::new(vec![
                ("Java", "Spring Boot", 0.5),
                ("Spring", "Spring Boot", 0.9),
            ]),
            Arc::new(EchoJustifier),
        )
        .rank(tenant, vec![required("Java", 3), required("Spring", 3)])
        .await
        .unwrap();

        let user = &ranking[0];
        assert_eq!(user.matched_skills.len(), 1);
        assert_eq!(user.matched_skills[0].skill_name, "Spring");
        // 0.9 × 4 × 3 / (3×5 + 3×5)
        assert!((user.match_score - 100.0 * 10.8 / 30.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_users_without_matches_are_excluded() {
        let tenant = Uuid::new_v4();
        let store = Arc::new(MemoryStore::new());
        store.seed_link(tenant, "ana", "Python", 3);
        store.seed_link(tenant, "carla", "Excel", 5);

        let ranking = engine(
            store,
            FixedSimilarity::new(vec![("Python", "Python", 1.0)]),
            Arc::new(EchoJustifier),
        )
        .rank(tenant, vec![required("Python", 3)])
        .await
        .unwrap();

        let names: Vec<&str> = ranking.iter().map(|r| r.user_name.as_str()).collect();
        assert_eq!(names, vec!["ana"]);
    }

    #[tokio::test]
    async fn test_ranking_is_sorted_bounded_and_truncated() {
        let tenant = Uuid::new_v4();
        let store = Arc::new(MemoryStore::new());
        store.seed_link(tenant, "low", "Rust", 1);
        store.seed_link(tenant, "mid", "Rust", 3);
        store.seed_link(tenant, "high", "Rust", 5);
        store.seed_link(tenant, "high", "Go", 5);

        let engine = TalentRankingEngine::new(
            store,
            FixedSimilarity::new(vec![("Rust", "Rust", 0.95), ("Go", "Go", 1.0)]),
            Arc::new(EchoJustifier),
            RankingSettings {
                limit: 2,
                justify_top: 1,
            },
        );
        let ranking = engine
            .rank(tenant, vec![required("Rust", 5), required("Go", 2)])
            .await
            .unwrap();

        assert_eq!(ranking.len(), 2);
        assert_eq!(ranking[0].user_name, "high");
        assert_eq!(ranking[1].user_name, "mid");
        assert!(ranking[0].match_score >= ranking[1].match_score);
        for user in &ranking {
            assert!((0.0..=100.0).contains(&user.match_score));
        }
        assert!(ranking[0].justification.is_some());
        assert!(ranking[1].justification.is_none());
    }

    #[tokio::test]
    async fn test_matched_catalog_skills_are_never_reused() {
        let tenant = Uuid::new_v4();
        let store = Arc::new(MemoryStore::new());
        store.seed_link(tenant, "dani", "SQL", 4);
        store.seed_link(tenant, "dani", "PostgreSQL", 3);

        let ranking = engine(
            store,
            FixedSimilarity::new(vec![
                ("PostgreSQL", "PostgreSQL", 1.0),
                ("PostgreSQL", "SQL", 0.7),
                ("MySQL", "SQL", 0.6),
                ("MySQL", "PostgreSQL", 0.6),
                ("Oracle", "SQL", 0.55),
            ]),
            Arc::new(EchoJustifier),
        )
        .rank(
            tenant,
            vec![required("PostgreSQL", 3), required("MySQL", 3), required("Oracle", 3)],
        )
        .await
        .unwrap();

        let user = &ranking[0];
        // Two catalog skills can cover at most two of the three requirements.
        assert_eq!(user.matched_skills.len(), 2);
        let names: HashSet<&str> = user.matched_skills.iter().map(|m| m.skill_name.as_str()).collect();
        assert_eq!(names.len(), 2);
    }

    #[tokio::test]
    async fn test_justification_failure_keeps_ranking() {
        let tenant = Uuid::new_v4();
        let store = Arc::new(MemoryStore::new());
        store.seed_link(tenant, "ana", "Python", 4);

        let ranking = engine(
            store,
            FixedSimilarity::new(vec![("Python", "Python", 1.0)]),
            Arc::new(FailingJustifier),
        )
        .rank(tenant, vec![required("Python", 4)])
        .await
        .unwrap();

        assert_eq!(ranking.len(), 1);
        assert!(ranking[0].justification.is_none());
    }

    #[tokio::test]
    async fn test_empty_profile_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let result = engine(
            store,
            FixedSimilarity::new(vec![]),
            Arc::new(EchoJustifier),
        )
        .rank(Uuid::new_v4(), vec![required("   ", 3)])
        .await;

        assert!(matches!(result, Err(AppError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_empty_catalog_skips_similarity_call() {
        let similarity = FixedSimilarity::new(vec![("Python", "Python", 1.0)]);
        let ranking = engine(
            Arc::new(MemoryStore::new()),
            similarity.clone(),
            Arc::new(EchoJustifier),
        )
        .rank(Uuid::new_v4(), vec![required("Python", 3)])
        .await
        .unwrap();

        assert!(ranking.is_empty());
        assert_eq!(similarity.calls(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_requirements_collapse_to_first() {
        let tenant = Uuid::new_v4();
        let store = Arc::new(MemoryStore::new());
        store.seed_link(tenant, "ana", "Python", 5);

        let ranking = engine(
            store,
            FixedSimilarity::new(vec![("Python", "Python", 1.0)]),
            Arc::new(EchoJustifier),
        )
        .rank(tenant, vec![required("Python", 4), required("python", 1)])
        .await
        .unwrap();

        assert_eq!(ranking[0].matched_skills.len(), 1);
        assert_eq!(ranking[0].matched_skills[0].required_proficiency.value(), 4);
        assert!((ranking[0].match_score - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_index_resolves_names_case_insensitively() {
        let tenant = Uuid::new_v4();
        let skill = Skill {
            id: Uuid::new_v4(),
            tenant_id: tenant,
            name: "TypeScript".to_string(),
            validated: true,
            created_at: chrono::Utc::now(),
        };
        let rows = vec![SimilarityRow {
            required_name: "typescript".to_string(),
            matches: vec![SimilarMatch {
                existing_name: "typescript".to_string(),
                similarity: 0.9,
            }],
        }];

        let index = build_similarity_index(&[required("TypeScript", 3)], &rows, &[skill.clone()]);
        assert_eq!(index[0].len(), 1);
        assert_eq!(index[0][0].existing_skill_id, skill.id);
        assert_eq!(index[0][0].required_name, "TypeScript");
    }
}
