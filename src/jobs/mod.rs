// SPDX-License-Identifier: GPL-3.0-or-later

//! # Job/worker store operations
//!
//! Thin queries over the `jobs`/`workers` tables. Enum columns are stored
//! as their `SCREAMING_SNAKE_CASE` serde text rather than a native Postgres
//! enum, so adding a variant never requires an `ALTER TYPE` migration.

use anyhow::Result;
use chrono::Utc;
use laniakea_core::jobs::{Job, JobKind, JobResult, JobStatus, Worker};
use sqlx::Row;
use uuid::Uuid;

use crate::store::{enum_from_sql, enum_to_sql, Store};

fn row_to_job(row: &sqlx::postgres::PgRow) -> Result<Job> {
    Ok(Job {
        uuid: row.try_get("uuid")?,
        status: enum_from_sql(row.try_get::<String, _>("status")?.as_str())?,
        module: row.try_get("module")?,
        kind: enum_from_sql(row.try_get::<String, _>("kind")?.as_str())?,
        trigger: row.try_get("trigger")?,
        version: row.try_get("version")?,
        architecture: row.try_get("architecture")?,
        created_time: row.try_get("created_time")?,
        assigned_time: row.try_get("assigned_time")?,
        finished_time: row.try_get("finished_time")?,
        priority: row.try_get("priority")?,
        worker_id: row.try_get("worker_id")?,
        result: enum_from_sql(row.try_get::<String, _>("result")?.as_str())?,
        latest_log_excerpt: row.try_get("latest_log_excerpt")?,
        data: row.try_get("data")?,
    })
}

/// Enqueue a new job, assigning it a random uuid and `status = WAITING`.
pub(crate) async fn add_job(store: &Store, module: &str, kind: JobKind, trigger: Uuid, data: serde_json::Value) -> Result<Job> {
    let job = Job::new(module, kind, trigger, data);
    sqlx::query(
        "INSERT INTO jobs (uuid, status, module, kind, trigger, version, architecture, created_time,
                            assigned_time, finished_time, priority, worker_id, result, latest_log_excerpt, data)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
    )
    .bind(job.uuid)
    .bind(enum_to_sql(&job.status))
    .bind(&job.module)
    .bind(enum_to_sql(&job.kind))
    .bind(job.trigger)
    .bind(&job.version)
    .bind(&job.architecture)
    .bind(job.created_time)
    .bind(job.assigned_time)
    .bind(job.finished_time)
    .bind(job.priority)
    .bind(job.worker_id)
    .bind(enum_to_sql(&job.result))
    .bind(&job.latest_log_excerpt)
    .bind(&job.data)
    .execute(&store.pool)
    .await?;
    Ok(job)
}

/// Upsert a job by uuid.
pub(crate) async fn update_job(store: &Store, job: &Job) -> Result<()> {
    sqlx::query(
        "INSERT INTO jobs (uuid, status, module, kind, trigger, version, architecture, created_time,
                            assigned_time, finished_time, priority, worker_id, result, latest_log_excerpt, data)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
         ON CONFLICT (uuid) DO UPDATE SET
            status = EXCLUDED.status, version = EXCLUDED.version, architecture = EXCLUDED.architecture,
            assigned_time = EXCLUDED.assigned_time, finished_time = EXCLUDED.finished_time,
            priority = EXCLUDED.priority, worker_id = EXCLUDED.worker_id, result = EXCLUDED.result,
            latest_log_excerpt = EXCLUDED.latest_log_excerpt, data = EXCLUDED.data",
    )
    .bind(job.uuid)
    .bind(enum_to_sql(&job.status))
    .bind(&job.module)
    .bind(enum_to_sql(&job.kind))
    .bind(job.trigger)
    .bind(&job.version)
    .bind(&job.architecture)
    .bind(job.created_time)
    .bind(job.assigned_time)
    .bind(job.finished_time)
    .bind(job.priority)
    .bind(job.worker_id)
    .bind(enum_to_sql(&job.result))
    .bind(&job.latest_log_excerpt)
    .bind(&job.data)
    .execute(&store.pool)
    .await?;
    Ok(())
}

/// Look up a job by its uuid.
pub(crate) async fn job_by_uuid(store: &Store, uuid: Uuid) -> Result<Option<Job>> {
    let row = sqlx::query("SELECT * FROM jobs WHERE uuid = $1").bind(uuid).fetch_optional(&store.pool).await?;
    row.as_ref().map(row_to_job).transpose()
}

/// Jobs triggered by `trigger`, ordered by priority then recency.
pub(crate) async fn jobs_by_trigger(store: &Store, trigger: Uuid) -> Result<Vec<Job>> {
    let rows = sqlx::query("SELECT * FROM jobs WHERE trigger = $1 ORDER BY priority DESC, created_time DESC")
        .bind(trigger)
        .fetch_all(&store.pool)
        .await?;
    rows.iter().map(row_to_job).collect()
}

/// The job (if any) for an exact (trigger, version, architecture) tuple.
pub(crate) async fn job_by_trigger_version_arch(
    store: &Store,
    trigger: Uuid,
    version: &str,
    architecture: &str,
) -> Result<Option<Job>> {
    let row = sqlx::query("SELECT * FROM jobs WHERE trigger = $1 AND version = $2 AND architecture = $3")
        .bind(trigger)
        .bind(version)
        .bind(architecture)
        .fetch_optional(&store.pool)
        .await?;
    row.as_ref().map(row_to_job).transpose()
}

/// All jobs not yet in a terminal status, optionally restricted to one module.
pub(crate) async fn pending_jobs(store: &Store, module: Option<&str>) -> Result<Vec<Job>> {
    let rows = match module {
        Some(module) => {
            sqlx::query("SELECT * FROM jobs WHERE status != 'DONE' AND status != 'TERMINATED' AND module = $1 ORDER BY priority DESC, created_time")
                .bind(module)
                .fetch_all(&store.pool)
                .await?
        }
        None => {
            sqlx::query("SELECT * FROM jobs WHERE status != 'DONE' AND status != 'TERMINATED' ORDER BY priority DESC, created_time")
                .fetch_all(&store.pool)
                .await?
        }
    };
    rows.iter().map(row_to_job).collect()
}

/// Count of pending jobs, optionally restricted to one module.
pub(crate) async fn pending_job_count(store: &Store, module: Option<&str>) -> Result<i64> {
    let count: i64 = match module {
        Some(module) => {
            sqlx::query_scalar("SELECT count(*) FROM jobs WHERE status != 'DONE' AND status != 'TERMINATED' AND module = $1")
                .bind(module)
                .fetch_one(&store.pool)
                .await?
        }
        None => {
            sqlx::query_scalar("SELECT count(*) FROM jobs WHERE status != 'DONE' AND status != 'TERMINATED'")
                .fetch_one(&store.pool)
                .await?
        }
    };
    Ok(count)
}

/// Record a job's final (or provisional) result.
pub(crate) async fn set_job_result(store: &Store, uuid: Uuid, result: JobResult) -> Result<()> {
    sqlx::query("UPDATE jobs SET result = $2 WHERE uuid = $1")
        .bind(uuid)
        .bind(enum_to_sql(&result))
        .execute(&store.pool)
        .await?;
    Ok(())
}

/// Transition a job's status, stamping `finished_time` when it becomes terminal.
pub(crate) async fn set_job_status(store: &Store, uuid: Uuid, status: JobStatus) -> Result<()> {
    let finished = matches!(status, JobStatus::Done | JobStatus::Terminated).then(Utc::now);
    sqlx::query("UPDATE jobs SET status = $2, finished_time = COALESCE($3, finished_time) WHERE uuid = $1")
        .bind(uuid)
        .bind(enum_to_sql(&status))
        .bind(finished)
        .execute(&store.pool)
        .await?;
    Ok(())
}

/// Update a job's latest log excerpt.
pub(crate) async fn set_job_log_excerpt(store: &Store, uuid: Uuid, excerpt: &str) -> Result<()> {
    sqlx::query("UPDATE jobs SET latest_log_excerpt = $2 WHERE uuid = $1")
        .bind(uuid)
        .bind(excerpt)
        .execute(&store.pool)
        .await?;
    Ok(())
}

/// Remove a job permanently.
pub(crate) async fn delete_job(store: &Store, uuid: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM jobs WHERE uuid = $1").bind(uuid).execute(&store.pool).await?;
    Ok(())
}

fn row_to_worker(row: &sqlx::postgres::PgRow) -> Result<Worker> {
    Ok(Worker {
        uuid: row.try_get("uuid")?,
        machine_name: row.try_get("machine_name")?,
        owner: row.try_get("owner")?,
        created_time: row.try_get("created_time")?,
        accepts: row.try_get("accepts")?,
        status: enum_from_sql(row.try_get::<String, _>("status")?.as_str())?,
        enabled: row.try_get("enabled")?,
        last_ping: row.try_get("last_ping")?,
        last_job: row.try_get("last_job")?,
    })
}

/// Upsert a worker by uuid.
pub(crate) async fn upsert_worker(store: &Store, worker: &Worker) -> Result<()> {
    sqlx::query(
        "INSERT INTO workers (uuid, machine_name, owner, created_time, accepts, status, enabled, last_ping, last_job)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
         ON CONFLICT (uuid) DO UPDATE SET
            machine_name = EXCLUDED.machine_name, owner = EXCLUDED.owner, accepts = EXCLUDED.accepts,
            status = EXCLUDED.status, enabled = EXCLUDED.enabled, last_ping = EXCLUDED.last_ping,
            last_job = EXCLUDED.last_job",
    )
    .bind(worker.uuid)
    .bind(&worker.machine_name)
    .bind(&worker.owner)
    .bind(worker.created_time)
    .bind(&worker.accepts)
    .bind(enum_to_sql(&worker.status))
    .bind(worker.enabled)
    .bind(worker.last_ping)
    .bind(worker.last_job)
    .execute(&store.pool)
    .await?;
    Ok(())
}

/// Record a liveness ping from `worker_id`, setting `last_ping = now()`.
pub(crate) async fn update_worker_ping(store: &Store, worker_id: Uuid) -> Result<()> {
    sqlx::query("UPDATE workers SET last_ping = $2 WHERE uuid = $1")
        .bind(worker_id)
        .bind(Utc::now())
        .execute(&store.pool)
        .await?;
    Ok(())
}

/// Look up a worker by its uuid.
pub(crate) async fn worker_by_uuid(store: &Store, uuid: Uuid) -> Result<Option<Worker>> {
    let row = sqlx::query("SELECT * FROM workers WHERE uuid = $1").bind(uuid).fetch_optional(&store.pool).await?;
    row.as_ref().map(row_to_worker).transpose()
}
