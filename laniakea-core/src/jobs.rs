// SPDX-License-Identifier: LGPL-3.0-or-later

//! # Job, Worker and event domain types
//!
//! These records back the job queue that *Isotope* and *Ariadne* (both out
//! of scope here) enqueue work into, and that workers poll for dispatch.
//! The store-backed operations on top of them (`AddJob`, lookups by trigger,
//! `UpdateWorkerPing`, ...) live in the `laniakea` binary crate's `jobs`
//! module.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A job's place in its lifecycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    /// Status could not be determined.
    Unknown,
    /// Enqueued, not yet claimed by a worker.
    Waiting,
    /// Waiting on another job to finish first.
    Depwait,
    /// Assigned to a worker, not yet running.
    Scheduled,
    /// A worker is actively executing this job.
    Running,
    /// Finished, successfully or not; see [Job::result].
    Done,
    /// Cancelled before completion.
    Terminated,
    /// Waiting so long it is flagged for operator attention.
    Starving,
}

/// What kind of work a [Job] performs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobKind {
    /// Build an OS image from an [ImageBuildRecipe].
    OsImageBuild,
    /// Build a source package for one architecture.
    PackageBuild,
}

/// Outcome of a finished (or provisionally finished) [Job].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobResult {
    /// No result recorded yet.
    Unknown,
    /// Finished successfully.
    Success,
    /// Finished unsuccessfully.
    Failure,
    /// Reported success, pending confirmation (e.g. by a separate QA step).
    MaybeSuccess,
    /// Reported failure, pending confirmation.
    MaybeFailure,
    /// Succeeded, but a follow-up action is still pending.
    SuccessPending,
    /// Failed, but a follow-up action is still pending.
    FailurePending,
    /// Failed because a job it depended on failed.
    FailureDependency,
}

/// A unit of build work dispatched to a [Worker].
///
/// `uuid` is assigned at random: unlike [crate::package::SourcePackage] or
/// [crate::package::BinaryPackage], a job is not content-addressed, since
/// the same trigger can legitimately produce many distinct job attempts
/// over time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Identifier of this job.
    pub uuid: Uuid,
    /// Current lifecycle status.
    pub status: JobStatus,
    /// Name of the module that owns this job (e.g. `"synchrotron"`).
    pub module: String,
    /// What kind of work this job performs.
    pub kind: JobKind,
    /// Content-addressed identifier of the entity that caused this job to
    /// be enqueued, e.g. a [crate::package::SourcePackage::source_uuid] or
    /// an [ImageBuildRecipe::uuid].
    pub trigger: Uuid,
    /// Version of the triggering package, if applicable.
    pub version: Option<String>,
    /// Target architecture, or `"any"` when the job is architecture-independent.
    pub architecture: String,
    /// When the job was enqueued.
    pub created_time: DateTime<Utc>,
    /// When a worker claimed the job.
    pub assigned_time: Option<DateTime<Utc>>,
    /// When the job reached a terminal status.
    pub finished_time: Option<DateTime<Utc>>,
    /// Scheduling priority; higher values are dispatched first.
    pub priority: i32,
    /// The worker currently assigned to this job, if any.
    pub worker_id: Option<Uuid>,
    /// Outcome of the job, once known.
    pub result: JobResult,
    /// A short excerpt of the job's latest log output, for quick display.
    pub latest_log_excerpt: Option<String>,
    /// Opaque, module-defined payload (e.g. the package/suite to build).
    pub data: Value,
}

impl Job {
    /// Create a new job in [JobStatus::Waiting], with a fresh random
    /// identifier and `createdTime = now()`.
    pub fn new(module: impl Into<String>, kind: JobKind, trigger: Uuid, data: Value) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            status: JobStatus::Waiting,
            module: module.into(),
            kind,
            trigger,
            version: None,
            architecture: "any".to_string(),
            created_time: Utc::now(),
            assigned_time: None,
            finished_time: None,
            priority: 0,
            worker_id: None,
            result: JobResult::Unknown,
            latest_log_excerpt: None,
            data,
        }
    }

    /// Whether the job has reached a terminal status.
    pub fn is_done(&self) -> bool {
        matches!(self.status, JobStatus::Done | JobStatus::Terminated)
    }
}

/// A job-runner's liveness state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerStatus {
    /// Liveness could not be determined.
    Unknown,
    /// Currently running a job.
    Active,
    /// Pinging, but not currently running a job.
    Idle,
    /// No ping received recently.
    Missing,
    /// Considered permanently gone.
    Dead,
}

/// A registered job runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Worker {
    /// Identifier of this worker.
    pub uuid: Uuid,
    /// Hostname or other human-identifiable name for the machine.
    pub machine_name: String,
    /// Operator responsible for this worker.
    pub owner: String,
    /// When the worker was first registered.
    pub created_time: DateTime<Utc>,
    /// Module names this worker can accept jobs for.
    pub accepts: Vec<String>,
    /// Current liveness state.
    pub status: WorkerStatus,
    /// Whether the worker is currently allowed to receive new jobs.
    pub enabled: bool,
    /// Timestamp of the worker's last ping.
    pub last_ping: Option<DateTime<Utc>>,
    /// Most recent job this worker was assigned, if any.
    pub last_job: Option<Uuid>,
}

impl Worker {
    /// Record a liveness ping from this worker, updating `lastPing`.
    pub fn ping(&mut self) {
        self.last_ping = Some(Utc::now());
    }
}

/// Severity of an [EventEntry].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    /// Informational, no action required.
    Info,
    /// Worth noting, does not block the run.
    Warning,
    /// A run-level failure occurred.
    Error,
    /// A failure severe enough to need immediate operator attention.
    Critical,
}

/// A durable, queryable counterpart to a log line, for the event feed a UI
/// reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEntry {
    /// Identifier of this event.
    pub uuid: Uuid,
    /// Severity of the event.
    pub kind: EventKind,
    /// Name of the module that emitted the event.
    pub module: String,
    /// When the event occurred.
    pub time: DateTime<Utc>,
    /// Short summary, suitable for a list view.
    pub title: String,
    /// Full event text.
    pub text: String,
}

impl EventEntry {
    /// Construct a new event with a fresh random identifier and `time = now()`.
    pub fn new(
        kind: EventKind,
        module: impl Into<String>,
        title: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            kind,
            module: module.into(),
            time: Utc::now(),
            title: title.into(),
            text: text.into(),
        }
    }
}

/// The kind of OS image an [ImageBuildRecipe] produces.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ImageKind {
    /// An ISO image.
    Iso,
    /// A raw disk image.
    Img,
}

/// A configured recipe for building an OS image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageBuildRecipe {
    /// Identifier of this recipe.
    pub uuid: Uuid,
    /// Kind of image this recipe builds.
    pub kind: ImageKind,
    /// Unique, normalized name: `lower(distribution-suite-flavor)`.
    pub name: String,
    /// Distribution the image is built for.
    pub distribution: String,
    /// Suite the image is built from.
    pub suite: String,
    /// Flavor (variant) of the image, e.g. `"minimal"`.
    pub flavor: String,
    /// Architectures this recipe is built for.
    pub architectures: Vec<String>,
    /// Git URL of the image-building recipe repository.
    pub git_url: String,
    /// Where finished images should be moved to once built.
    pub result_move_to: String,
}

impl ImageBuildRecipe {
    /// Compute the normalized, unique recipe name from its components.
    pub fn normalized_name(distribution: &str, suite: &str, flavor: &str) -> String {
        format!("{distribution}-{suite}-{flavor}").to_lowercase()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_job_starts_waiting() {
        let job = Job::new("synchrotron", JobKind::PackageBuild, Uuid::new_v4(), json!({}));
        assert_eq!(job.status, JobStatus::Waiting);
        assert_eq!(job.architecture, "any");
        assert!(job.assigned_time.is_none());
        assert!(!job.is_done());
    }

    #[test]
    fn done_statuses_are_terminal() {
        let mut job = Job::new("synchrotron", JobKind::PackageBuild, Uuid::new_v4(), json!({}));
        job.status = JobStatus::Done;
        assert!(job.is_done());
        job.status = JobStatus::Terminated;
        assert!(job.is_done());
        job.status = JobStatus::Running;
        assert!(!job.is_done());
    }

    #[test]
    fn worker_ping_sets_timestamp() {
        let mut worker = Worker {
            uuid: Uuid::new_v4(),
            machine_name: "builder-01".to_string(),
            owner: "ops".to_string(),
            created_time: Utc::now(),
            accepts: vec!["synchrotron".to_string()],
            status: WorkerStatus::Idle,
            enabled: true,
            last_ping: None,
            last_job: None,
        };
        worker.ping();
        assert!(worker.last_ping.is_some());
    }

    #[test]
    fn recipe_name_is_normalized() {
        assert_eq!(
            ImageBuildRecipe::normalized_name("Tanglu", "Staging", "Minimal"),
            "tanglu-staging-minimal"
        );
    }
}
