use serde::{Deserialize, Serialize};

/// One row of the HR export. Read-only input to a batch run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CollaboratorRecord {
    pub employee_id: Option<String>,
    pub user_name: String,
    pub full_name: Option<String>,
    pub responsibilities: Option<String>,
    pub certifications: Option<String>,
    pub education: Option<String>,
    pub language_proficiency: Option<String>,
    pub development_plan: Option<String>,
    pub feedback: Option<String>,
    /// Pipe-delimited list, e.g. `"Rust | SQL | Kubernetes"`.
    pub hard_skills: Option<String>,
    pub seniority: Option<String>,
}

impl CollaboratorRecord {
    /// Display name used when the user row has to be synthesized.
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.user_name)
    }

    /// Splits the pipe-delimited hard-skill string, dropping blanks.
    pub fn hard_skill_list(&self) -> Vec<String> {
        self.hard_skills
            .as_deref()
            .map(|raw| {
                raw.split('|')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hard_skill_list_splits_and_trims() {
        let record = CollaboratorRecord {
            user_name: "ana.silva".to_string(),
            hard_skills: Some(" Rust |SQL|| Kubernetes ".to_string()),
            ..Default::default()
        };
        assert_eq!(record.hard_skill_list(), vec!["Rust", "SQL", "Kubernetes"]);
    }

    #[test]
    fn test_display_name_falls_back_to_user_name() {
        let record = CollaboratorRecord {
            user_name: "ana.silva".to_string(),
            full_name: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(record.display_name(), "ana.silva");
    }

    #[test]
    fn test_record_deserializes_with_missing_fields() {
        let record: CollaboratorRecord =
            serde_json::from_str(r#"{"user_name": "joao", "seniority": "Senior"}"#).unwrap();
        assert_eq!(record.user_name, "joao");
        assert_eq!(record.seniority.as_deref(), Some("Senior"));
        assert!(record.responsibilities.is_none());
    }
}
