use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Skill level, 1 (basic) to 5 (expert). Always within range once constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(try_from = "i64", into = "i16")]
#[sqlx(transparent)]
pub struct Proficiency(i16);

impl Proficiency {
    pub const MIN: i16 = 1;
    pub const MAX: i16 = 5;
    pub const DEFAULT: Proficiency = Proficiency(3);

    /// Clamps any integer into [1, 5].
    pub fn clamped(value: i64) -> Self {
        Proficiency(value.clamp(Self::MIN as i64, Self::MAX as i64) as i16)
    }

    /// Lenient conversion for untyped input: numbers are rounded and clamped,
    /// numeric strings are parsed, anything else is the default.
    pub fn from_json(value: Option<&serde_json::Value>) -> Self {
        let numeric = match value {
            Some(serde_json::Value::Number(n)) => n.as_f64(),
            Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        match numeric {
            Some(n) if n.is_finite() => Self::clamped(n.round() as i64),
            _ => Self::DEFAULT,
        }
    }

    pub fn value(self) -> i16 {
        self.0
    }

    pub fn as_f64(self) -> f64 {
        self.0 as f64
    }
}

impl Default for Proficiency {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<i64> for Proficiency {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if (Self::MIN as i64..=Self::MAX as i64).contains(&value) {
            Ok(Proficiency(value as i16))
        } else {
            Err(format!("proficiency must be between 1 and 5, got {value}"))
        }
    }
}

impl From<Proficiency> for i16 {
    fn from(p: Proficiency) -> Self {
        p.0
    }
}

/// Where an extracted skill was found in the collaborator record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillOrigin {
    Responsibilities,
    Certifications,
    Education,
    Experience,
    Position,
    Inferred,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedSkill {
    pub name: String,
    pub proficiency: Proficiency,
    pub origin: SkillOrigin,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Skill {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub validated: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TenantUser {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub user_name: String,
    pub full_name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTenantUser {
    pub tenant_id: Uuid,
    pub user_name: String,
    pub full_name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserSkillLink {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub skill_id: Uuid,
    pub proficiency: Proficiency,
    pub created_at: DateTime<Utc>,
}

/// Canonical stored form of a skill name: trimmed, inner whitespace collapsed.
/// Case is preserved; lookups on the stored name are case-sensitive.
pub fn normalize_skill_name(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}
