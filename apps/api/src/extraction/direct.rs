use async_trait::async_trait;

use crate::extraction::{
    sanitize_skills, seniority_range, ExtractionError, ExtractionOutput, SkillExtractor,
};
use crate::models::collaborator::CollaboratorRecord;
use crate::models::skill::{ExtractedSkill, SkillOrigin};

/// Non-AI import of the pipe-delimited hard-skill column. Every skill gets the
/// lower bound of the collaborator's seniority band.
pub struct DirectSkillExtractor;

#[async_trait]
impl SkillExtractor for DirectSkillExtractor {
    async fn extract(
        &self,
        records: &[CollaboratorRecord],
    ) -> Result<ExtractionOutput, ExtractionError> {
        Ok(records
            .iter()
            .map(|record| {
                let proficiency = seniority_range(record.seniority.as_deref()).min;
                let skills = record
                    .hard_skill_list()
                    .into_iter()
                    .map(|name| ExtractedSkill {
                        name,
                        proficiency,
                        origin: SkillOrigin::Experience,
                    })
                    .collect();
                (record.user_name.clone(), sanitize_skills(skills))
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_direct_import_uses_seniority_floor() {
        let records = vec![
            CollaboratorRecord {
                user_name: "carla".to_string(),
                seniority: Some("Junior".to_string()),
                hard_skills: Some("Python | Pandas".to_string()),
                ..Default::default()
            },
            CollaboratorRecord {
                user_name: "diego".to_string(),
                seniority: Some("Senior".to_string()),
                hard_skills: Some("Kubernetes".to_string()),
                ..Default::default()
            },
        ];

        let out = DirectSkillExtractor.extract(&records).await.unwrap();
        assert_eq!(out["carla"].len(), 2);
        assert!(out["carla"].iter().all(|s| s.proficiency.value() == 2));
        assert_eq!(out["diego"][0].name, "Kubernetes");
        assert_eq!(out["diego"][0].proficiency.value(), 4);
        assert_eq!(out["diego"][0].origin, SkillOrigin::Experience);
    }

    #[tokio::test]
    async fn test_direct_import_without_hard_skills_yields_empty_list() {
        let records = vec![CollaboratorRecord {
            user_name: "eva".to_string(),
            ..Default::default()
        }];
        let out = DirectSkillExtractor.extract(&records).await.unwrap();
        assert!(out["eva"].is_empty());
    }
}
