//! Batch job controller: one long-lived background task per job.
//!
//! Flow: fetch feed → paginate → for each page: checkpoint (pause/cancel) →
//!       extract → cancel check → merge → record progress → inter-page delay.
//!
//! Control operations (`pause`, `resume`, `cancel`) only write the job row.
//! The loop observes them by re-reading the row at its checkpoints, so they
//! work from any request, not just the one that started the job.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::batch::merger::ResultMerger;
use crate::config::BatchSettings;
use crate::errors::AppError;
use crate::extraction::SkillExtractor;
use crate::models::collaborator::CollaboratorRecord;
use crate::models::job::{BatchJob, ExtractionMode, JobLogEntry, JobStatus, ProgressDelta};
use crate::source::{CollaboratorSource, FeedError, SourceConfig};
use crate::store::{JobStore, SkillStore, StoreError};

/// Errors that end a run with status `error`. Page-level extraction and merge
/// failures are logged and counted instead.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("collaborator feed failed: {0}")]
    Feed(#[from] FeedError),

    #[error("job stayed paused for {polls} polls and timed out")]
    Timeout { polls: u32 },

    #[error("job store failed: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct StartJobRequest {
    pub tenant_id: Uuid,
    pub source: SourceConfig,
    #[serde(default)]
    pub mode: ExtractionMode,
    /// Domain for synthesized emails; defaults to `DEFAULT_EMAIL_DOMAIN`.
    pub email_domain: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StartJobResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
}

/// The two extractor backends, picked per job by `ExtractionMode`.
#[derive(Clone)]
pub struct Extractors {
    pub ai: Arc<dyn SkillExtractor>,
    pub direct: Arc<dyn SkillExtractor>,
}

impl Extractors {
    fn for_mode(&self, mode: ExtractionMode) -> &dyn SkillExtractor {
        match mode {
            ExtractionMode::Ai => self.ai.as_ref(),
            ExtractionMode::Direct => self.direct.as_ref(),
        }
    }
}

#[derive(Clone)]
pub struct BatchController {
    skills: Arc<dyn SkillStore>,
    jobs: Arc<dyn JobStore>,
    source: Arc<dyn CollaboratorSource>,
    extractors: Extractors,
    settings: BatchSettings,
    default_email_domain: String,
}

/// Everything the background task needs, owned.
struct JobRun {
    job_id: Uuid,
    tenant_id: Uuid,
    mode: ExtractionMode,
    source: SourceConfig,
    email_domain: String,
}

enum Checkpoint {
    Continue,
    Stop(JobStatus),
}

impl BatchController {
    pub fn new(
        skills: Arc<dyn SkillStore>,
        jobs: Arc<dyn JobStore>,
        source: Arc<dyn CollaboratorSource>,
        extractors: Extractors,
        settings: BatchSettings,
        default_email_domain: String,
    ) -> Self {
        Self {
            skills,
            jobs,
            source,
            extractors,
            settings,
            default_email_domain,
        }
    }

    /// Creates a `pending` job and detaches its processing loop.
    pub async fn start(&self, request: StartJobRequest) -> Result<BatchJob, AppError> {
        let email_domain = request
            .email_domain
            .map(|d| d.trim().trim_start_matches('@').to_string())
            .unwrap_or_else(|| self.default_email_domain.clone());
        if email_domain.is_empty() {
            return Err(AppError::InvalidArgument(
                "email_domain cannot be empty".to_string(),
            ));
        }

        if let Some(active) = self.jobs.find_active_job(request.tenant_id).await? {
            return Err(AppError::Conflict(format!(
                "batch job {} is already {} for tenant {}",
                active.id,
                active.status.as_str(),
                request.tenant_id
            )));
        }

        let mut job = BatchJob::new(request.tenant_id, request.mode);
        job.push_log(JobLogEntry::info(format!(
            "Job created ({} extraction)",
            request.mode.as_str()
        )));
        self.jobs.create_job(&job).await?;
        info!(
            "Batch job {} created for tenant {} ({} mode)",
            job.id,
            job.tenant_id,
            job.mode.as_str()
        );

        let run = JobRun {
            job_id: job.id,
            tenant_id: job.tenant_id,
            mode: job.mode,
            source: request.source,
            email_domain,
        };
        let controller = self.clone();
        tokio::spawn(async move { controller.run(run).await });

        Ok(job)
    }

    pub async fn pause(&self, job_id: Uuid) -> Result<(), AppError> {
        self.signal(
            job_id,
            &[JobStatus::Running],
            JobStatus::Paused,
            "Pause requested",
        )
        .await
    }

    pub async fn resume(&self, job_id: Uuid) -> Result<(), AppError> {
        self.signal(
            job_id,
            &[JobStatus::Paused],
            JobStatus::Running,
            "Resumed",
        )
        .await
    }

    pub async fn cancel(&self, job_id: Uuid) -> Result<(), AppError> {
        self.signal(
            job_id,
            &JobStatus::ACTIVE,
            JobStatus::Cancelled,
            "Cancellation requested",
        )
        .await
    }

    /// Latest job for the tenant, whatever its status.
    pub async fn status(&self, tenant_id: Uuid) -> Result<BatchJob, AppError> {
        self.jobs
            .latest_job(tenant_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No batch job for tenant {tenant_id}")))
    }

    async fn signal(
        &self,
        job_id: Uuid,
        from: &[JobStatus],
        to: JobStatus,
        message: &str,
    ) -> Result<(), AppError> {
        let log = JobLogEntry::warning(message);
        if self.jobs.transition(job_id, from, to, Some(log)).await? {
            info!("Batch job {job_id} → {}", to.as_str());
            return Ok(());
        }
        let job = self
            .jobs
            .get_job(job_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Batch job {job_id} not found")))?;
        Err(AppError::Conflict(format!(
            "cannot move batch job {job_id} from {} to {}",
            job.status.as_str(),
            to.as_str()
        )))
    }

    async fn run(&self, run: JobRun) {
        let job_id = run.job_id;
        let Err(err) = self.execute(&run).await else {
            return;
        };

        error!("Batch job {job_id} failed: {err}");
        let log = JobLogEntry::error(format!("Job failed: {err}"));
        if let Err(e) = self
            .jobs
            .transition(job_id, &JobStatus::ACTIVE, JobStatus::Error, Some(log))
            .await
        {
            error!("Batch job {job_id}: could not record failure: {e}");
        }
    }

    async fn execute(&self, run: &JobRun) -> Result<(), BatchError> {
        let records = self.source.fetch(&run.source).await?;
        let pages: Vec<&[CollaboratorRecord]> = records.chunks(self.page_size(run.mode)).collect();
        let total_batches = pages.len();

        let started = self
            .jobs
            .begin_run(
                run.job_id,
                records.len() as i32,
                total_batches as i32,
                JobLogEntry::info(format!(
                    "Loaded {} collaborators in {} batches",
                    records.len(),
                    total_batches
                )),
            )
            .await?;
        if !started {
            info!("Batch job {} left pending state before it ran", run.job_id);
            return Ok(());
        }

        let extractor = self.extractors.for_mode(run.mode);
        let merger = ResultMerger::new(self.skills.as_ref(), run.tenant_id, &run.email_domain);

        for (index, page) in pages.iter().enumerate() {
            let batch_number = index + 1;

            if let Checkpoint::Stop(status) = self.checkpoint(run.job_id).await? {
                self.log_stop(run.job_id, status, index, total_batches).await?;
                return Ok(());
            }
            self.jobs
                .set_current_batch(run.job_id, batch_number as i32)
                .await?;

            let extracted = extractor.extract(page).await;

            // A page that has not written anything yet can still be abandoned.
            let status = self.current_status(run.job_id).await?;
            if status == JobStatus::Cancelled || status == JobStatus::Error {
                self.log_stop(run.job_id, status, index, total_batches).await?;
                return Ok(());
            }

            let (delta, log) = match extracted {
                Ok(output) => {
                    let outcome = merger.merge_page(page, &output).await;
                    let mut message = format!(
                        "Batch {batch_number}/{total_batches}: {} collaborators, {} skills extracted, {} new skills, {} new users",
                        page.len(),
                        outcome.skills_extracted,
                        outcome.skills_created,
                        outcome.users_created
                    );
                    let log = if outcome.errors == 0 {
                        JobLogEntry::success(message)
                    } else {
                        message.push_str(&format!(
                            ", {} errors ({})",
                            outcome.errors,
                            outcome.failures.join("; ")
                        ));
                        JobLogEntry::warning(message)
                    };
                    (outcome.progress(page.len()), log)
                }
                Err(e) => {
                    warn!(
                        "Batch job {} page {batch_number}/{total_batches}: extraction failed: {e}",
                        run.job_id
                    );
                    let delta = ProgressDelta {
                        processed_collaborators: page.len() as i32,
                        errors: 1,
                        ..Default::default()
                    };
                    let log = JobLogEntry::warning(format!(
                        "Batch {batch_number}/{total_batches}: extraction failed: {e}"
                    ));
                    (delta, log)
                }
            };

            self.jobs
                .record_progress(run.job_id, &delta, Some(log))
                .await?;
            info!(
                "Batch job {} page {batch_number}/{total_batches} done",
                run.job_id
            );

            if batch_number < total_batches {
                tokio::time::sleep(self.settings.inter_batch_delay).await;
            }
        }

        // A pause that lands after the last page has nothing left to hold.
        let completed = self
            .jobs
            .transition(
                run.job_id,
                &[JobStatus::Running, JobStatus::Paused],
                JobStatus::Completed,
                Some(JobLogEntry::success(format!(
                    "Completed {total_batches} batches"
                ))),
            )
            .await?;
        if completed {
            info!("Batch job {} completed", run.job_id);
        }
        Ok(())
    }

    fn page_size(&self, mode: ExtractionMode) -> usize {
        let size = match mode {
            ExtractionMode::Ai => self.settings.ai_batch_size,
            ExtractionMode::Direct => self.settings.direct_batch_size,
        };
        size.max(1)
    }

    async fn current_status(&self, job_id: Uuid) -> Result<JobStatus, BatchError> {
        let job = self
            .jobs
            .get_job(job_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("batch job {job_id}")))?;
        Ok(job.status)
    }

    /// Blocks while the job is paused, polling its persisted status.
    async fn checkpoint(&self, job_id: Uuid) -> Result<Checkpoint, BatchError> {
        let mut polls = 0u32;
        loop {
            match self.current_status(job_id).await? {
                JobStatus::Running => return Ok(Checkpoint::Continue),
                JobStatus::Paused => {
                    if polls >= self.settings.max_pause_polls {
                        return Err(BatchError::Timeout { polls });
                    }
                    if polls == 0 {
                        info!("Batch job {job_id} paused, waiting for resume");
                    }
                    polls += 1;
                    tokio::time::sleep(self.settings.pause_poll_interval).await;
                }
                other => return Ok(Checkpoint::Stop(other)),
            }
        }
    }

    async fn log_stop(
        &self,
        job_id: Uuid,
        status: JobStatus,
        done: usize,
        total: usize,
    ) -> Result<(), BatchError> {
        info!(
            "Batch job {job_id} stopped ({}) after {done}/{total} batches",
            status.as_str()
        );
        self.jobs
            .append_log(
                job_id,
                JobLogEntry::warning(format!(
                    "Stopped ({}) after {done} of {total} batches",
                    status.as_str()
                )),
            )
            .await?;
        Ok(())
    }
}
