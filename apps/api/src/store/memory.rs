//! In-memory `SkillStore` + `JobStore` with the same uniqueness rules as the
//! Postgres schema.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::models::job::{BatchJob, JobLogEntry, JobStatus, ProgressDelta};
use crate::models::skill::{NewTenantUser, Proficiency, Skill, TenantUser, UserSkillLink};
use crate::store::{JobStore, SkillStore, StoreError};

#[derive(Default)]
struct Tables {
    skills: Vec<Skill>,
    users: Vec<TenantUser>,
    links: Vec<UserSkillLink>,
    jobs: Vec<BatchJob>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_tables<T>(&self, f: impl FnOnce(&mut Tables) -> T) -> T {
        let mut tables = self.tables.lock().unwrap_or_else(|p| p.into_inner());
        f(&mut tables)
    }

    pub fn job_count(&self, tenant_id: Uuid) -> usize {
        self.with_tables(|t| t.jobs.iter().filter(|j| j.tenant_id == tenant_id).count())
    }

    pub fn link_count(&self, tenant_id: Uuid) -> usize {
        self.with_tables(|t| t.links.iter().filter(|l| l.tenant_id == tenant_id).count())
    }

    /// Test helper: seeds a validated skill, user and link in one call.
    pub fn seed_link(
        &self,
        tenant_id: Uuid,
        user_name: &str,
        skill_name: &str,
        proficiency: i64,
    ) -> (Uuid, Uuid) {
        self.with_tables(|t| {
            let user_id = match t
                .users
                .iter()
                .find(|u| u.tenant_id == tenant_id && u.user_name == user_name)
            {
                Some(u) => u.id,
                None => {
                    let user = TenantUser {
                        id: Uuid::new_v4(),
                        tenant_id,
                        user_name: user_name.to_string(),
                        full_name: user_name.to_string(),
                        email: format!("{user_name}@example.com"),
                        created_at: Utc::now(),
                    };
                    let id = user.id;
                    t.users.push(user);
                    id
                }
            };
            let skill_id = match t
                .skills
                .iter()
                .find(|s| s.tenant_id == tenant_id && s.name == skill_name)
            {
                Some(s) => s.id,
                None => {
                    let skill = Skill {
                        id: Uuid::new_v4(),
                        tenant_id,
                        name: skill_name.to_string(),
                        validated: true,
                        created_at: Utc::now(),
                    };
                    let id = skill.id;
                    t.skills.push(skill);
                    id
                }
            };
            t.links.push(UserSkillLink {
                id: Uuid::new_v4(),
                tenant_id,
                user_id,
                skill_id,
                proficiency: Proficiency::clamped(proficiency),
                created_at: Utc::now(),
            });
            (user_id, skill_id)
        })
    }

    fn mutate_job(
        &self,
        job_id: Uuid,
        mutate: impl FnOnce(&mut BatchJob) -> bool,
    ) -> Result<bool, StoreError> {
        self.with_tables(|t| {
            let job = t
                .jobs
                .iter_mut()
                .find(|j| j.id == job_id)
                .ok_or_else(|| StoreError::NotFound(format!("batch job {job_id}")))?;
            Ok(mutate(job))
        })
    }
}

#[async_trait]
impl SkillStore for MemoryStore {
    async fn find_user(
        &self,
        tenant_id: Uuid,
        user_name: &str,
    ) -> Result<Option<TenantUser>, StoreError> {
        Ok(self.with_tables(|t| {
            t.users
                .iter()
                .find(|u| u.tenant_id == tenant_id && u.user_name == user_name)
                .cloned()
        }))
    }

    async fn insert_user(&self, user: NewTenantUser) -> Result<TenantUser, StoreError> {
        self.with_tables(|t| {
            if t
                .users
                .iter()
                .any(|u| u.tenant_id == user.tenant_id && u.user_name == user.user_name)
            {
                return Err(StoreError::Conflict(format!(
                    "user '{}' already exists",
                    user.user_name
                )));
            }
            let row = TenantUser {
                id: Uuid::new_v4(),
                tenant_id: user.tenant_id,
                user_name: user.user_name,
                full_name: user.full_name,
                email: user.email,
                created_at: Utc::now(),
            };
            t.users.push(row.clone());
            Ok(row)
        })
    }

    async fn find_skill(&self, tenant_id: Uuid, name: &str) -> Result<Option<Skill>, StoreError> {
        Ok(self.with_tables(|t| {
            t.skills
                .iter()
                .find(|s| s.tenant_id == tenant_id && s.name == name)
                .cloned()
        }))
    }

    async fn insert_skill(&self, tenant_id: Uuid, name: &str) -> Result<Skill, StoreError> {
        self.with_tables(|t| {
            if t
                .skills
                .iter()
                .any(|s| s.tenant_id == tenant_id && s.name == name)
            {
                return Err(StoreError::Conflict(format!("skill '{name}' already exists")));
            }
            let skill = Skill {
                id: Uuid::new_v4(),
                tenant_id,
                name: name.to_string(),
                validated: false,
                created_at: Utc::now(),
            };
            t.skills.push(skill.clone());
            Ok(skill)
        })
    }

    async fn find_link(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        skill_id: Uuid,
    ) -> Result<Option<UserSkillLink>, StoreError> {
        Ok(self.with_tables(|t| {
            t.links
                .iter()
                .find(|l| l.tenant_id == tenant_id && l.user_id == user_id && l.skill_id == skill_id)
                .cloned()
        }))
    }

    async fn insert_link(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        skill_id: Uuid,
        proficiency: Proficiency,
    ) -> Result<UserSkillLink, StoreError> {
        self.with_tables(|t| {
            if t
                .links
                .iter()
                .any(|l| l.tenant_id == tenant_id && l.user_id == user_id && l.skill_id == skill_id)
            {
                return Err(StoreError::Conflict("user skill link already exists".to_string()));
            }
            let link = UserSkillLink {
                id: Uuid::new_v4(),
                tenant_id,
                user_id,
                skill_id,
                proficiency,
                created_at: Utc::now(),
            };
            t.links.push(link.clone());
            Ok(link)
        })
    }

    async fn list_skills(&self, tenant_id: Uuid) -> Result<Vec<Skill>, StoreError> {
        Ok(self.with_tables(|t| {
            t.skills
                .iter()
                .filter(|s| s.tenant_id == tenant_id)
                .cloned()
                .collect()
        }))
    }

    async fn list_users(&self, tenant_id: Uuid) -> Result<Vec<TenantUser>, StoreError> {
        Ok(self.with_tables(|t| {
            t.users
                .iter()
                .filter(|u| u.tenant_id == tenant_id)
                .cloned()
                .collect()
        }))
    }

    async fn list_links(&self, tenant_id: Uuid) -> Result<Vec<UserSkillLink>, StoreError> {
        Ok(self.with_tables(|t| {
            t.links
                .iter()
                .filter(|l| l.tenant_id == tenant_id)
                .cloned()
                .collect()
        }))
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn find_active_job(&self, tenant_id: Uuid) -> Result<Option<BatchJob>, StoreError> {
        Ok(self.with_tables(|t| {
            t.jobs
                .iter()
                .filter(|j| j.tenant_id == tenant_id && !j.status.is_terminal())
                .max_by_key(|j| j.started_at)
                .cloned()
        }))
    }

    async fn create_job(&self, job: &BatchJob) -> Result<(), StoreError> {
        self.with_tables(|t| {
            if t
                .jobs
                .iter()
                .any(|j| j.tenant_id == job.tenant_id && !j.status.is_terminal())
            {
                return Err(StoreError::Conflict(format!(
                    "tenant {} already has an active batch job",
                    job.tenant_id
                )));
            }
            t.jobs.push(job.clone());
            Ok(())
        })
    }

    async fn get_job(&self, job_id: Uuid) -> Result<Option<BatchJob>, StoreError> {
        Ok(self.with_tables(|t| t.jobs.iter().find(|j| j.id == job_id).cloned()))
    }

    async fn latest_job(&self, tenant_id: Uuid) -> Result<Option<BatchJob>, StoreError> {
        // `max_by_key` keeps the last maximum, so later pushes win ties.
        Ok(self.with_tables(|t| {
            t.jobs
                .iter()
                .filter(|j| j.tenant_id == tenant_id)
                .max_by_key(|j| j.started_at)
                .cloned()
        }))
    }

    async fn transition(
        &self,
        job_id: Uuid,
        from: &[JobStatus],
        to: JobStatus,
        log: Option<JobLogEntry>,
    ) -> Result<bool, StoreError> {
        self.mutate_job(job_id, |job| {
            if !from.contains(&job.status) {
                return false;
            }
            job.set_status(to);
            if let Some(entry) = log {
                job.push_log(entry);
            }
            true
        })
    }

    async fn begin_run(
        &self,
        job_id: Uuid,
        total_collaborators: i32,
        total_batches: i32,
        log: JobLogEntry,
    ) -> Result<bool, StoreError> {
        self.mutate_job(job_id, |job| {
            if job.status != JobStatus::Pending {
                return false;
            }
            job.total_collaborators = total_collaborators;
            job.total_batches = total_batches;
            job.set_status(JobStatus::Running);
            job.push_log(log);
            true
        })
    }

    async fn set_current_batch(&self, job_id: Uuid, index: i32) -> Result<(), StoreError> {
        self.mutate_job(job_id, |job| {
            job.current_batch_index = index;
            true
        })?;
        Ok(())
    }

    async fn record_progress(
        &self,
        job_id: Uuid,
        delta: &ProgressDelta,
        log: Option<JobLogEntry>,
    ) -> Result<(), StoreError> {
        self.mutate_job(job_id, |job| {
            job.apply_progress(delta);
            if let Some(entry) = log {
                job.push_log(entry);
            }
            true
        })?;
        Ok(())
    }
}
