//! Rebuild job queue over the `impact_jobs` table.
//!
//! The database is the arbiter of the single-running-job invariant: job
//! acquisition is one `UPDATE … WHERE status='pending' RETURNING *`
//! statement, so exactly one of any number of racing threads wins. No
//! in-memory lock is authoritative.

use std::sync::Arc;

use rusqlite::{params, Connection};
use tracing::{error, info};
use uuid::Uuid;

use ariadne_core::models::{Job, JobMode, JobStatus};
use ariadne_core::{AriadneError, AriadneResult};

use crate::sqe;
use crate::store::GraphStore;

pub struct JobQueue {
    store: Arc<GraphStore>,
}

const JOB_COLUMNS: &str =
    "job_id, mode, status, progress, total_files, processed_files, target_paths,
     started_at, completed_at, error_message, created_at";

fn map_job_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Job> {
    let mode: String = row.get(1)?;
    let status: String = row.get(2)?;
    let target_paths: Option<String> = row.get(6)?;
    Ok(Job {
        job_id: row.get(0)?,
        mode: JobMode::parse(&mode).unwrap_or(JobMode::Full),
        status: JobStatus::parse(&status).unwrap_or(JobStatus::Pending),
        progress: row.get(3)?,
        total_files: row.get(4)?,
        processed_files: row.get(5)?,
        target_paths: target_paths.and_then(|s| serde_json::from_str(&s).ok()),
        started_at: row.get(7)?,
        completed_at: row.get(8)?,
        error_message: row.get(9)?,
        created_at: row.get(10)?,
    })
}

impl JobQueue {
    pub fn new(store: Arc<GraphStore>) -> Self {
        Self { store }
    }

    /// Create a new pending job and return it.
    pub fn create_job(
        &self,
        mode: JobMode,
        target_paths: Option<Vec<String>>,
    ) -> AriadneResult<Job> {
        let job_id = Uuid::new_v4().to_string();
        let paths_json = match &target_paths {
            Some(paths) => Some(serde_json::to_string(paths)?),
            None => None,
        };

        self.store.with_writer(|conn| {
            conn.execute(
                "INSERT INTO impact_jobs
                 (job_id, mode, status, progress, total_files, processed_files, target_paths)
                 VALUES (?1, ?2, 'pending', 0, 0, 0, ?3)",
                params![job_id, mode.as_str(), paths_json],
            )
            .map_err(sqe)?;
            Ok(())
        })?;

        info!(job_id = %job_id, mode = mode.as_str(), "Created rebuild job");

        self.get_job(&job_id)?.ok_or_else(|| AriadneError::NotFound {
            kind: "job",
            id: job_id,
        })
    }

    /// Get a job by id.
    pub fn get_job(&self, job_id: &str) -> AriadneResult<Option<Job>> {
        let job = self.store.with_reader(|conn| {
            let result = conn.query_row(
                &format!("SELECT {JOB_COLUMNS} FROM impact_jobs WHERE job_id = ?1"),
                params![job_id],
                map_job_row,
            );
            match result {
                Ok(job) => Ok(Some(job)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(sqe(e)),
            }
        })?;
        Ok(job)
    }

    /// Oldest pending job, if any.
    pub fn get_pending_job(&self) -> AriadneResult<Option<Job>> {
        let job = self.store.with_reader(|conn| {
            let result = conn.query_row(
                &format!(
                    "SELECT {JOB_COLUMNS} FROM impact_jobs
                     WHERE status = 'pending' ORDER BY created_at ASC LIMIT 1"
                ),
                [],
                map_job_row,
            );
            match result {
                Ok(job) => Ok(Some(job)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(sqe(e)),
            }
        })?;
        Ok(job)
    }

    /// The running job, if any. At most one exists at any instant.
    pub fn get_running_job(&self) -> AriadneResult<Option<Job>> {
        let job = self.store.with_reader(|conn| {
            let result = conn.query_row(
                &format!("SELECT {JOB_COLUMNS} FROM impact_jobs WHERE status = 'running' LIMIT 1"),
                [],
                map_job_row,
            );
            match result {
                Ok(job) => Ok(Some(job)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(sqe(e)),
            }
        })?;
        Ok(job)
    }

    /// List jobs, newest first, optional status filter.
    pub fn list_jobs(&self, status: Option<JobStatus>, limit: i64) -> AriadneResult<Vec<Job>> {
        let jobs = self.store.with_reader(|conn| match status {
            Some(status) => {
                let mut stmt = conn
                    .prepare_cached(&format!(
                        "SELECT {JOB_COLUMNS} FROM impact_jobs
                         WHERE status = ?1 ORDER BY created_at DESC LIMIT ?2"
                    ))
                    .map_err(sqe)?;
                let rows = stmt
                    .query_map(params![status.as_str(), limit], map_job_row)
                    .map_err(sqe)?;
                crate::queries::collect_rows(rows)
            }
            None => {
                let mut stmt = conn
                    .prepare_cached(&format!(
                        "SELECT {JOB_COLUMNS} FROM impact_jobs ORDER BY created_at DESC LIMIT ?1"
                    ))
                    .map_err(sqe)?;
                let rows = stmt.query_map(params![limit], map_job_row).map_err(sqe)?;
                crate::queries::collect_rows(rows)
            }
        })?;
        Ok(jobs)
    }

    /// Atomically acquire a pending job. The single UPDATE…RETURNING guard
    /// replaces any read-then-write check: a thread that gets a row back has
    /// exclusively won the job; everyone else gets `Conflict` (or `NotFound`
    /// if the id never existed).
    pub fn acquire_job(&self, job_id: &str) -> AriadneResult<Job> {
        let acquired = self.store.with_writer(|conn| {
            let result = conn.query_row(
                &format!(
                    "UPDATE impact_jobs
                     SET status = 'running', started_at = CURRENT_TIMESTAMP
                     WHERE job_id = ?1 AND status = 'pending'
                     RETURNING {JOB_COLUMNS}"
                ),
                params![job_id],
                map_job_row,
            );
            match result {
                Ok(job) => Ok(Some(job)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(sqe(e)),
            }
        })?;

        match acquired {
            Some(job) => Ok(job),
            None => match self.get_job(job_id)? {
                Some(existing) => Err(AriadneError::Conflict(format!(
                    "job {job_id} not available (status={}, already acquired)",
                    existing.status.as_str()
                ))),
                None => Err(AriadneError::NotFound {
                    kind: "job",
                    id: job_id.to_string(),
                }),
            },
        }
    }

    /// Acquire `job_id`, run `body` with the acquired job, and close the job
    /// out: complete with progress 100 on success, failed with the error
    /// message otherwise. The original error propagates.
    pub fn run_job<T>(
        &self,
        job_id: &str,
        body: impl FnOnce(&Job) -> AriadneResult<T>,
    ) -> AriadneResult<T> {
        let job = self.acquire_job(job_id)?;

        match body(&job) {
            Ok(value) => {
                self.mark_complete(job_id)?;
                Ok(value)
            }
            Err(e) => {
                error!(job_id = %job_id, error = %e, "Job failed");
                self.mark_failed(job_id, &e.to_string())?;
                Err(e)
            }
        }
    }

    /// Update progress counters of a running job.
    pub fn update_progress(
        &self,
        job_id: &str,
        progress: i64,
        total_files: Option<i64>,
        processed_files: Option<i64>,
    ) -> AriadneResult<bool> {
        let updated = self.store.with_writer(|conn| {
            update_progress_inner(conn, job_id, progress, total_files, processed_files)
        })?;
        Ok(updated)
    }

    fn mark_complete(&self, job_id: &str) -> AriadneResult<()> {
        self.store.with_writer(|conn| {
            conn.execute(
                "UPDATE impact_jobs
                 SET status = 'complete', progress = 100, completed_at = CURRENT_TIMESTAMP
                 WHERE job_id = ?1 AND status = 'running'",
                params![job_id],
            )
            .map_err(sqe)?;
            Ok(())
        })?;
        Ok(())
    }

    fn mark_failed(&self, job_id: &str, message: &str) -> AriadneResult<()> {
        self.store.with_writer(|conn| {
            conn.execute(
                "UPDATE impact_jobs
                 SET status = 'failed', error_message = ?2, completed_at = CURRENT_TIMESTAMP
                 WHERE job_id = ?1 AND status = 'running'",
                params![job_id, message],
            )
            .map_err(sqe)?;
            Ok(())
        })?;
        Ok(())
    }
}

fn update_progress_inner(
    conn: &Connection,
    job_id: &str,
    progress: i64,
    total_files: Option<i64>,
    processed_files: Option<i64>,
) -> Result<bool, ariadne_core::StorageError> {
    let n = conn
        .execute(
            "UPDATE impact_jobs
             SET progress = ?2,
                 total_files = COALESCE(?3, total_files),
                 processed_files = COALESCE(?4, processed_files)
             WHERE job_id = ?1 AND status = 'running'",
            params![job_id, progress, total_files, processed_files],
        )
        .map_err(sqe)?;
    Ok(n > 0)
}
