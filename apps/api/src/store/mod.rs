//! Persistence boundary. Everything the batch pipeline and the ranking engine
//! read or write goes through `SkillStore` / `JobStore`.
//!
//! Production uses `PgStore`; tests use the in-memory `MemoryStore`.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::job::{BatchJob, JobLogEntry, JobStatus, ProgressDelta};
use crate::models::skill::{NewTenantUser, Proficiency, Skill, TenantUser, UserSkillLink};

#[cfg(test)]
pub mod memory;
pub mod postgres;

pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("postgres error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("failed to map row: {0}")]
    Mapping(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Tenant-scoped skills, users and user↔skill links.
#[async_trait]
pub trait SkillStore: Send + Sync {
    async fn find_user(
        &self,
        tenant_id: Uuid,
        user_name: &str,
    ) -> Result<Option<TenantUser>, StoreError>;

    async fn insert_user(&self, user: NewTenantUser) -> Result<TenantUser, StoreError>;

    /// Exact, case-sensitive lookup on the stored name.
    async fn find_skill(&self, tenant_id: Uuid, name: &str) -> Result<Option<Skill>, StoreError>;

    /// Inserts an unvalidated skill.
    async fn insert_skill(&self, tenant_id: Uuid, name: &str) -> Result<Skill, StoreError>;

    async fn find_link(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        skill_id: Uuid,
    ) -> Result<Option<UserSkillLink>, StoreError>;

    async fn insert_link(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        skill_id: Uuid,
        proficiency: Proficiency,
    ) -> Result<UserSkillLink, StoreError>;

    async fn list_skills(&self, tenant_id: Uuid) -> Result<Vec<Skill>, StoreError>;

    async fn list_users(&self, tenant_id: Uuid) -> Result<Vec<TenantUser>, StoreError>;

    async fn list_links(&self, tenant_id: Uuid) -> Result<Vec<UserSkillLink>, StoreError>;
}

/// Batch job records. Every mutation reads the current persisted row and
/// writes it back, so control signals written by other requests are honoured.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn find_active_job(&self, tenant_id: Uuid) -> Result<Option<BatchJob>, StoreError>;

    /// Fails with `StoreError::Conflict` if the tenant already has an active job.
    async fn create_job(&self, job: &BatchJob) -> Result<(), StoreError>;

    async fn get_job(&self, job_id: Uuid) -> Result<Option<BatchJob>, StoreError>;

    async fn latest_job(&self, tenant_id: Uuid) -> Result<Option<BatchJob>, StoreError>;

    /// Moves the job to `to` only if its current status is one of `from`.
    /// Returns whether the transition happened.
    async fn transition(
        &self,
        job_id: Uuid,
        from: &[JobStatus],
        to: JobStatus,
        log: Option<JobLogEntry>,
    ) -> Result<bool, StoreError>;

    /// `pending → running`, recording the feed size and page count.
    async fn begin_run(
        &self,
        job_id: Uuid,
        total_collaborators: i32,
        total_batches: i32,
        log: JobLogEntry,
    ) -> Result<bool, StoreError>;

    async fn set_current_batch(&self, job_id: Uuid, index: i32) -> Result<(), StoreError>;

    async fn record_progress(
        &self,
        job_id: Uuid,
        delta: &ProgressDelta,
        log: Option<JobLogEntry>,
    ) -> Result<(), StoreError>;

    async fn append_log(&self, job_id: Uuid, log: JobLogEntry) -> Result<(), StoreError> {
        self.record_progress(job_id, &ProgressDelta::default(), Some(log))
            .await
    }
}
