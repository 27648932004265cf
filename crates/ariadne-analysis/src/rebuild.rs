//! Rebuild orchestration: job-arbitrated full (shadow + swap) and
//! incremental (clean + re-extract + stale-mark) rebuilds.
//!
//! The job queue is the only concurrency guard — acquiring the job row is
//! what serializes rebuilds, not any in-memory lock.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use ariadne_core::models::{Job, JobMode};
use ariadne_core::{AriadneError, AriadneResult};
use ariadne_storage::shadow::RebuildStats;
use ariadne_storage::{DualWriteCoordinator, GraphStore, JobQueue, ShadowRebuilder};

use crate::extractor::{AsmClient, Extractor};

pub struct RebuildService {
    store: Arc<GraphStore>,
    jobs: JobQueue,
    coordinator: DualWriteCoordinator,
    project_root: PathBuf,
    asm_service_url: String,
}

impl RebuildService {
    pub fn new(store: Arc<GraphStore>, project_root: PathBuf, asm_service_url: String) -> Self {
        Self {
            jobs: JobQueue::new(Arc::clone(&store)),
            coordinator: DualWriteCoordinator::new(Arc::clone(&store)),
            store,
            project_root,
            asm_service_url,
        }
    }

    pub fn jobs(&self) -> &JobQueue {
        &self.jobs
    }

    /// Create a pending job for a rebuild request. Refused while another
    /// job is already running.
    pub fn request_rebuild(
        &self,
        mode: JobMode,
        target_paths: Option<Vec<String>>,
    ) -> AriadneResult<Job> {
        if let Some(running) = self.jobs.get_running_job()? {
            return Err(AriadneError::Conflict(format!(
                "rebuild already running: job {}",
                running.job_id
            )));
        }
        self.jobs.create_job(mode, target_paths)
    }

    /// Acquire and execute a job. The winner of the atomic acquire does the
    /// work; losers get `Conflict`.
    pub fn execute_job(&self, job_id: &str) -> AriadneResult<RebuildStats> {
        self.jobs.run_job(job_id, |job| match job.mode {
            JobMode::Full => self.rebuild_full(),
            JobMode::Incremental => {
                let paths = job.target_paths.clone().unwrap_or_default();
                self.rebuild_incremental(&paths)
            }
        })
    }

    /// Full rebuild: extract everything into a shadow database, verify,
    /// swap. The live database is untouched on any failure.
    pub fn rebuild_full(&self) -> AriadneResult<RebuildStats> {
        let db_path = self.store.path().ok_or_else(|| {
            AriadneError::InvalidArgument(
                "full rebuild requires a file-backed store".to_string(),
            )
        })?;

        let rebuilder = ShadowRebuilder::new(db_path);
        let project_root = self.project_root.clone();
        let asm_service_url = self.asm_service_url.clone();

        rebuilder.rebuild_full(&self.store, move |shadow_store| {
            let client = AsmClient::new(&asm_service_url)?;
            let extractor = Extractor::new(Arc::clone(shadow_store), client);
            let result = extractor.extract_project(&project_root, None)?;
            if !result.success {
                return Err(AriadneError::RebuildFailed(result.errors.join("; ")));
            }
            Ok(())
        })
    }

    /// Incremental rebuild over specific source files: drop their symbols
    /// (cascade triggers clean dependents), re-extract the project (module
    /// hashes skip unchanged modules), and invalidate affected summaries.
    pub fn rebuild_incremental(&self, target_paths: &[String]) -> AriadneResult<RebuildStats> {
        let started = std::time::Instant::now();

        let mut stale_marked = 0;
        for path in target_paths {
            stale_marked += self.coordinator.mark_summaries_stale_by_file(path)?;
            self.store.clean_by_file(path)?;
        }

        let client = AsmClient::new(&self.asm_service_url)?;
        let extractor = Extractor::new(Arc::clone(&self.store), client);
        let result = extractor.extract_project(&self.project_root, None)?;
        if !result.success {
            return Err(AriadneError::RebuildFailed(result.errors.join("; ")));
        }

        info!(
            files = target_paths.len(),
            stale_marked,
            symbols = result.total_symbols,
            "Incremental rebuild complete"
        );

        Ok(RebuildStats {
            symbols_indexed: result.total_symbols as i64,
            edges_created: result.total_edges as i64,
            entries_detected: result.total_entries as i64,
            deps_analyzed: result.total_deps as i64,
            duration_seconds: started.elapsed().as_secs_f64(),
            backup_path: None,
        })
    }

    /// Startup hook: complete an interrupted swap before serving reads.
    pub fn recover_on_startup(db_path: &std::path::Path) -> AriadneResult<Option<PathBuf>> {
        ariadne_storage::shadow::recover_incomplete_swap(db_path)
    }
}
