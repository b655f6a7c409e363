use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tracing::debug;
use uuid::Uuid;

use crate::models::job::{BatchJob, ExtractionMode, JobLogEntry, JobStatus, ProgressDelta};
use crate::models::skill::{NewTenantUser, Proficiency, Skill, TenantUser, UserSkillLink};
use crate::store::{JobStore, SkillStore, StoreError};

/// sqlx-backed store over the `skills`, `tenant_users`, `user_skills` and
/// `batch_jobs` tables.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct BatchJobRow {
    id: Uuid,
    tenant_id: Uuid,
    status: String,
    mode: String,
    total_collaborators: i32,
    total_batches: i32,
    current_batch_index: i32,
    processed_collaborators: i32,
    skills_extracted: i32,
    skills_created: i32,
    users_created: i32,
    errors: i32,
    logs: Json<Vec<JobLogEntry>>,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<BatchJobRow> for BatchJob {
    type Error = StoreError;

    fn try_from(row: BatchJobRow) -> Result<Self, Self::Error> {
        let status = JobStatus::parse(&row.status)
            .ok_or_else(|| StoreError::Mapping(format!("unknown job status '{}'", row.status)))?;
        let mode = ExtractionMode::parse(&row.mode)
            .ok_or_else(|| StoreError::Mapping(format!("unknown extraction mode '{}'", row.mode)))?;
        Ok(BatchJob {
            id: row.id,
            tenant_id: row.tenant_id,
            status,
            mode,
            total_collaborators: row.total_collaborators,
            total_batches: row.total_batches,
            current_batch_index: row.current_batch_index,
            processed_collaborators: row.processed_collaborators,
            skills_extracted: row.skills_extracted,
            skills_created: row.skills_created,
            users_created: row.users_created,
            errors: row.errors,
            logs: row.logs.0,
            started_at: row.started_at,
            completed_at: row.completed_at,
        })
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn active_statuses() -> Vec<String> {
    JobStatus::ACTIVE
        .iter()
        .map(|s| s.as_str().to_string())
        .collect()
}

#[async_trait]
impl SkillStore for PgStore {
    async fn find_user(
        &self,
        tenant_id: Uuid,
        user_name: &str,
    ) -> Result<Option<TenantUser>, StoreError> {
        let user = sqlx::query_as::<_, TenantUser>(
            "SELECT * FROM tenant_users WHERE tenant_id = $1 AND user_name = $2",
        )
        .bind(tenant_id)
        .bind(user_name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn insert_user(&self, user: NewTenantUser) -> Result<TenantUser, StoreError> {
        let row = sqlx::query_as::<_, TenantUser>(
            r#"
            INSERT INTO tenant_users (id, tenant_id, user_name, full_name, email)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user.tenant_id)
        .bind(&user.user_name)
        .bind(&user.full_name)
        .bind(&user.email)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_skill(&self, tenant_id: Uuid, name: &str) -> Result<Option<Skill>, StoreError> {
        let skill =
            sqlx::query_as::<_, Skill>("SELECT * FROM skills WHERE tenant_id = $1 AND name = $2")
                .bind(tenant_id)
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;
        Ok(skill)
    }

    async fn insert_skill(&self, tenant_id: Uuid, name: &str) -> Result<Skill, StoreError> {
        let skill = sqlx::query_as::<_, Skill>(
            r#"
            INSERT INTO skills (id, tenant_id, name, validated)
            VALUES ($1, $2, $3, FALSE)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(tenant_id)
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(skill)
    }

    async fn find_link(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        skill_id: Uuid,
    ) -> Result<Option<UserSkillLink>, StoreError> {
        let link = sqlx::query_as::<_, UserSkillLink>(
            "SELECT * FROM user_skills WHERE tenant_id = $1 AND user_id = $2 AND skill_id = $3",
        )
        .bind(tenant_id)
        .bind(user_id)
        .bind(skill_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(link)
    }

    async fn insert_link(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        skill_id: Uuid,
        proficiency: Proficiency,
    ) -> Result<UserSkillLink, StoreError> {
        let link = sqlx::query_as::<_, UserSkillLink>(
            r#"
            INSERT INTO user_skills (id, tenant_id, user_id, skill_id, proficiency)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(tenant_id)
        .bind(user_id)
        .bind(skill_id)
        .bind(proficiency)
        .fetch_one(&self.pool)
        .await?;
        Ok(link)
    }

    async fn list_skills(&self, tenant_id: Uuid) -> Result<Vec<Skill>, StoreError> {
        let skills =
            sqlx::query_as::<_, Skill>("SELECT * FROM skills WHERE tenant_id = $1 ORDER BY name")
                .bind(tenant_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(skills)
    }

    async fn list_users(&self, tenant_id: Uuid) -> Result<Vec<TenantUser>, StoreError> {
        let users = sqlx::query_as::<_, TenantUser>(
            "SELECT * FROM tenant_users WHERE tenant_id = $1 ORDER BY user_name",
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn list_links(&self, tenant_id: Uuid) -> Result<Vec<UserSkillLink>, StoreError> {
        let links =
            sqlx::query_as::<_, UserSkillLink>("SELECT * FROM user_skills WHERE tenant_id = $1")
                .bind(tenant_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(links)
    }
}

impl PgStore {
    /// Read-modify-write of one job row under `SELECT … FOR UPDATE`.
    /// `mutate` returns false to leave the row untouched.
    async fn mutate_job<F>(&self, job_id: Uuid, mutate: F) -> Result<bool, StoreError>
    where
        F: FnOnce(&mut BatchJob) -> bool + Send,
    {
        let mut tx = self.pool.begin().await?;

        let row: Option<BatchJobRow> =
            sqlx::query_as("SELECT * FROM batch_jobs WHERE id = $1 FOR UPDATE")
                .bind(job_id)
                .fetch_optional(&mut *tx)
                .await?;
        let mut job: BatchJob = row
            .ok_or_else(|| StoreError::NotFound(format!("batch job {job_id}")))?
            .try_into()?;

        if !mutate(&mut job) {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            r#"
            UPDATE batch_jobs SET
                status = $2,
                total_collaborators = $3,
                total_batches = $4,
                current_batch_index = $5,
                processed_collaborators = $6,
                skills_extracted = $7,
                skills_created = $8,
                users_created = $9,
                errors = $10,
                logs = $11,
                completed_at = $12
            WHERE id = $1
            "#,
        )
        .bind(job.id)
        .bind(job.status.as_str())
        .bind(job.total_collaborators)
        .bind(job.total_batches)
        .bind(job.current_batch_index)
        .bind(job.processed_collaborators)
        .bind(job.skills_extracted)
        .bind(job.skills_created)
        .bind(job.users_created)
        .bind(job.errors)
        .bind(Json(&job.logs))
        .bind(job.completed_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        debug!("batch job {job_id} updated (status={})", job.status.as_str());
        Ok(true)
    }
}

#[async_trait]
impl JobStore for PgStore {
    async fn find_active_job(&self, tenant_id: Uuid) -> Result<Option<BatchJob>, StoreError> {
        let row: Option<BatchJobRow> = sqlx::query_as(
            r#"
            SELECT * FROM batch_jobs
            WHERE tenant_id = $1 AND status = ANY($2)
            ORDER BY started_at DESC
            LIMIT 1
            "#,
        )
        .bind(tenant_id)
        .bind(active_statuses())
        .fetch_optional(&self.pool)
        .await?;
        row.map(BatchJob::try_from).transpose()
    }

    async fn create_job(&self, job: &BatchJob) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO batch_jobs (id, tenant_id, status, mode, logs, started_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(job.id)
        .bind(job.tenant_id)
        .bind(job.status.as_str())
        .bind(job.mode.as_str())
        .bind(Json(&job.logs))
        .bind(job.started_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            // The partial unique index on active jobs closes the check-then-insert race.
            Err(e) if is_unique_violation(&e) => Err(StoreError::Conflict(format!(
                "tenant {} already has an active batch job",
                job.tenant_id
            ))),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_job(&self, job_id: Uuid) -> Result<Option<BatchJob>, StoreError> {
        let row: Option<BatchJobRow> = sqlx::query_as("SELECT * FROM batch_jobs WHERE id = $1")
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(BatchJob::try_from).transpose()
    }

    async fn latest_job(&self, tenant_id: Uuid) -> Result<Option<BatchJob>, StoreError> {
        let row: Option<BatchJobRow> = sqlx::query_as(
            "SELECT * FROM batch_jobs WHERE tenant_id = $1 ORDER BY started_at DESC LIMIT 1",
        )
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(BatchJob::try_from).transpose()
    }

    async fn transition(
        &self,
        job_id: Uuid,
        from: &[JobStatus],
        to: JobStatus,
        log: Option<JobLogEntry>,
    ) -> Result<bool, StoreError> {
        let from = from.to_vec();
        self.mutate_job(job_id, move |job| {
            if !from.contains(&job.status) {
                return false;
            }
            job.set_status(to);
            if let Some(entry) = log {
                job.push_log(entry);
            }
            true
        })
        .await
    }

    async fn begin_run(
        &self,
        job_id: Uuid,
        total_collaborators: i32,
        total_batches: i32,
        log: JobLogEntry,
    ) -> Result<bool, StoreError> {
        self.mutate_job(job_id, move |job| {
            if job.status != JobStatus::Pending {
                return false;
            }
            job.total_collaborators = total_collaborators;
            job.total_batches = total_batches;
            job.set_status(JobStatus::Running);
            job.push_log(log);
            true
        })
        .await
    }

    async fn set_current_batch(&self, job_id: Uuid, index: i32) -> Result<(), StoreError> {
        sqlx::query("UPDATE batch_jobs SET current_batch_index = $2 WHERE id = $1")
            .bind(job_id)
            .bind(index)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn record_progress(
        &self,
        job_id: Uuid,
        delta: &ProgressDelta,
        log: Option<JobLogEntry>,
    ) -> Result<(), StoreError> {
        let delta = *delta;
        self.mutate_job(job_id, move |job| {
            job.apply_progress(&delta);
            if let Some(entry) = log {
                job.push_log(entry);
            }
            true
        })
        .await?;
        Ok(())
    }
}
