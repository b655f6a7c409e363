//! Result merger: turns one page of extraction output into store writes.
//!
//! Every write is check-then-insert: users, skills and links are created only
//! when absent, and an existing link's proficiency is never overwritten.
//! Re-running a page is therefore safe and produces no new rows.

use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::extraction::ExtractionOutput;
use crate::models::collaborator::CollaboratorRecord;
use crate::models::job::ProgressDelta;
use crate::models::skill::{normalize_skill_name, ExtractedSkill, NewTenantUser, TenantUser};
use crate::store::{SkillStore, StoreError};

/// Failure messages kept per page for the job log.
const MAX_REPORTED_FAILURES: usize = 5;

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("store write failed: {0}")]
    Store(#[from] StoreError),

    #[error("malformed skill name '{0}'")]
    MalformedName(String),
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub skills_extracted: i32,
    pub skills_created: i32,
    pub users_created: i32,
    pub links_created: i32,
    pub errors: i32,
    /// First few failure messages, for operator visibility.
    pub failures: Vec<String>,
}

impl MergeOutcome {
    fn record_failure(&mut self, context: String, err: MergeError) {
        warn!("merge failure ({context}): {err}");
        self.errors += 1;
        if self.failures.len() < MAX_REPORTED_FAILURES {
            self.failures.push(format!("{context}: {err}"));
        }
    }

    pub fn progress(&self, processed_collaborators: usize) -> ProgressDelta {
        ProgressDelta {
            processed_collaborators: processed_collaborators as i32,
            skills_extracted: self.skills_extracted,
            skills_created: self.skills_created,
            users_created: self.users_created,
            errors: self.errors,
        }
    }
}

pub struct ResultMerger<'a> {
    store: &'a dyn SkillStore,
    tenant_id: Uuid,
    email_domain: &'a str,
}

impl<'a> ResultMerger<'a> {
    pub fn new(store: &'a dyn SkillStore, tenant_id: Uuid, email_domain: &'a str) -> Self {
        Self {
            store,
            tenant_id,
            email_domain,
        }
    }

    /// Merges one page. Per-record and per-skill failures are counted and
    /// skipped; nothing here aborts the page.
    pub async fn merge_page(
        &self,
        records: &[CollaboratorRecord],
        extracted: &ExtractionOutput,
    ) -> MergeOutcome {
        let mut outcome = MergeOutcome::default();

        for record in records {
            let Some(skills) = extracted.get(&record.user_name).filter(|s| !s.is_empty()) else {
                continue;
            };

            let user = match self.upsert_user(record, &mut outcome).await {
                Ok(user) => user,
                Err(e) => {
                    outcome.record_failure(format!("user {}", record.user_name), e);
                    continue;
                }
            };

            for skill in skills {
                outcome.skills_extracted += 1;
                if let Err(e) = self.merge_skill(&user, skill, &mut outcome).await {
                    outcome.record_failure(
                        format!("user {} / skill {}", record.user_name, skill.name),
                        e,
                    );
                }
            }
        }

        outcome
    }

    async fn upsert_user(
        &self,
        record: &CollaboratorRecord,
        outcome: &mut MergeOutcome,
    ) -> Result<TenantUser, MergeError> {
        if let Some(user) = self.store.find_user(self.tenant_id, &record.user_name).await? {
            return Ok(user);
        }

        let user = self
            .store
            .insert_user(NewTenantUser {
                tenant_id: self.tenant_id,
                user_name: record.user_name.clone(),
                full_name: record.display_name().to_string(),
                email: format!("{}@{}", record.user_name, self.email_domain),
            })
            .await?;
        outcome.users_created += 1;
        Ok(user)
    }

    async fn merge_skill(
        &self,
        user: &TenantUser,
        extracted: &ExtractedSkill,
        outcome: &mut MergeOutcome,
    ) -> Result<(), MergeError> {
        let name = normalize_skill_name(&extracted.name);
        if name.is_empty() {
            return Err(MergeError::MalformedName(extracted.name.clone()));
        }

        let skill = match self.store.find_skill(self.tenant_id, &name).await? {
            Some(skill) => skill,
            None => {
                let skill = self.store.insert_skill(self.tenant_id, &name).await?;
                outcome.skills_created += 1;
                skill
            }
        };

        // First write wins: an existing link keeps its proficiency.
        if self
            .store
            .find_link(self.tenant_id, user.id, skill.id)
            .await?
            .is_none()
        {
            self.store
                .insert_link(self.tenant_id, user.id, skill.id, extracted.proficiency)
                .await?;
            outcome.links_created += 1;
        }

        Ok(())
    }
}
