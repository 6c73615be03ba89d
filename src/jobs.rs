//! Background job runner.
//!
//! Long operations (import, analysis, organizing, deletion) run on a small
//! rayon pool. Callers get a [`JobId`] back immediately and either poll
//! [`JobRunner::status`] or block in [`JobRunner::wait`].

use anyhow::Result;
use log::{debug, error, info};
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct JobId(u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Import,
    Analyze,
    Organize,
    Delete,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobKind::Import => "import",
            JobKind::Analyze => "analyze",
            JobKind::Organize => "organize",
            JobKind::Delete => "delete",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Completed(String),
    Failed(String),
}

impl JobStatus {
    pub fn is_finished(&self) -> bool {
        !matches!(self, JobStatus::Pending)
    }
}

#[derive(Debug, Clone)]
struct JobRecord {
    kind: JobKind,
    owner: String,
    status: JobStatus,
}

#[derive(Default)]
struct JobTable {
    jobs: Mutex<HashMap<JobId, JobRecord>>,
    finished: Condvar,
}

impl JobTable {
    // A panicking job is caught before it touches the table, so a poisoned
    // lock still holds consistent data.
    fn lock(&self) -> MutexGuard<'_, HashMap<JobId, JobRecord>> {
        self.jobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn finish(&self, id: JobId, status: JobStatus) {
        let mut jobs = self.lock();
        if let Some(record) = jobs.get_mut(&id) {
            record.status = status;
        }
        drop(jobs);
        self.finished.notify_all();
    }
}

/// Runs jobs on a fixed-size thread pool and tracks their outcome.
pub struct JobRunner {
    pool: ThreadPool,
    table: Arc<JobTable>,
    next_id: AtomicU64,
}

impl JobRunner {
    /// # Errors
    ///
    /// Fails if the thread pool cannot be started.
    pub fn new(threads: usize) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|i| format!("genrify-worker-{i}"))
            .build()?;
        Ok(Self {
            pool,
            table: Arc::new(JobTable::default()),
            next_id: AtomicU64::new(1),
        })
    }

    /// Queue `task` and return its id without waiting.
    ///
    /// `Ok(message)` completes the job with that message; an error or a
    /// panic fails it with the rendered reason.
    pub fn submit<F>(&self, kind: JobKind, owner: &str, task: F) -> JobId
    where
        F: FnOnce() -> Result<String> + Send + 'static,
    {
        let id = JobId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.table.lock().insert(
            id,
            JobRecord {
                kind,
                owner: owner.to_string(),
                status: JobStatus::Pending,
            },
        );
        info!("Queued {kind} {id} for {owner}");

        let table = Arc::clone(&self.table);
        self.pool.spawn(move || {
            let status = match panic::catch_unwind(AssertUnwindSafe(task)) {
                Ok(Ok(message)) => {
                    debug!("{kind} {id} completed");
                    JobStatus::Completed(message)
                }
                Ok(Err(err)) => {
                    error!("{kind} {id} failed: {err:#}");
                    JobStatus::Failed(format!("{err:#}"))
                }
                Err(payload) => {
                    let reason = panic_message(payload.as_ref());
                    error!("{kind} {id} panicked: {reason}");
                    JobStatus::Failed(format!("job panicked: {reason}"))
                }
            };
            table.finish(id, status);
        });
        id
    }

    /// Current status, or `None` for an id this runner never issued.
    pub fn status(&self, id: JobId) -> Option<JobStatus> {
        self.table.lock().get(&id).map(|record| record.status.clone())
    }

    /// Block until the job leaves `Pending`.
    pub fn wait(&self, id: JobId) -> Option<JobStatus> {
        let mut jobs = self.table.lock();
        loop {
            match jobs.get(&id) {
                None => return None,
                Some(record) if record.status.is_finished() => return Some(record.status.clone()),
                Some(_) => {
                    jobs = self
                        .table
                        .finished
                        .wait(jobs)
                        .unwrap_or_else(|poisoned| poisoned.into_inner());
                }
            }
        }
    }

    /// Drop a finished job's record. Pending jobs are kept; returns whether
    /// anything was removed.
    pub fn forget(&self, id: JobId) -> bool {
        let mut jobs = self.table.lock();
        match jobs.get(&id) {
            Some(record) if record.status.is_finished() => {
                debug!("Forgetting {} {id} of {}", record.kind, record.owner);
                jobs.remove(&id);
                true
            }
            _ => false,
        }
    }

    /// Number of records currently held, finished or not.
    pub fn len(&self) -> usize {
        self.table.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
