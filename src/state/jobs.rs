use std::{fmt, time::Instant};

use dashmap::{DashMap, mapref::entry::Entry};
use serde::Serialize;
use utoipa::ToSchema;

/// Scheduled operations exposed to the external trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Close every finished season.
    CloseSeasons,
    /// Open the next season of every tiered league.
    OpenSeasons,
    /// Record today's zone of every member of every active season.
    TakeSnapshots,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobKind::CloseSeasons => "close_seasons",
            JobKind::OpenSeasons => "open_seasons",
            JobKind::TakeSnapshots => "take_snapshots",
        };
        f.write_str(name)
    }
}

/// In-process registry of running jobs; an overlapping trigger of the same job is refused.
#[derive(Default)]
pub struct JobRegistry {
    running: DashMap<JobKind, Instant>,
}

/// Marks jobs as running until dropped.
pub struct JobGuard<'a> {
    registry: &'a JobRegistry,
    jobs: Vec<JobKind>,
}

impl JobRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark every job in `jobs` as running, or none of them if one already is.
    /// Returns the job that blocked the request on failure.
    pub fn begin(&self, jobs: &[JobKind]) -> Result<JobGuard<'_>, JobKind> {
        let mut guard = JobGuard {
            registry: self,
            jobs: Vec::with_capacity(jobs.len()),
        };
        for job in jobs {
            match self.running.entry(*job) {
                Entry::Occupied(_) => return Err(*job),
                Entry::Vacant(slot) => {
                    slot.insert(Instant::now());
                    guard.jobs.push(*job);
                }
            }
        }
        Ok(guard)
    }

    /// Jobs currently running in this process.
    pub fn running(&self) -> Vec<JobKind> {
        self.running.iter().map(|entry| *entry.key()).collect()
    }
}

impl Drop for JobGuard<'_> {
    fn drop(&mut self) {
        for job in &self.jobs {
            self.registry.running.remove(job);
        }
    }
}
