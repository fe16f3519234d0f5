// SPDX-License-Identifier: GPL-3.0-or-later

//! Persistence for [`SynchrotronIssue`] records, plus the `config`/
//! `synchrotron_blacklist` rows that configure the engine itself.

use std::collections::HashSet;

use anyhow::{Context, Result};
use laniakea_core::{
    config::ModuleConfig,
    synchrotron::{SynchrotronConfig, SynchrotronIssue},
};
use sqlx::Row;

use crate::store::{enum_to_sql, Store};

/// Load this deployment's sync configuration: the `config` row for module
/// `"synchrotron"`, key `"source"`.
pub(crate) async fn load_config(store: &Store) -> Result<SynchrotronConfig> {
    let row = sqlx::query("SELECT value FROM config WHERE module = 'synchrotron' AND key = 'source'")
        .fetch_optional(&store.pool)
        .await?
        .context("no synchrotron source configuration found in the config table")?;
    let value: serde_json::Value = row.try_get("value")?;
    ModuleConfig::new("synchrotron", "source", value)
        .typed_value()
        .context("malformed synchrotron source configuration")
}

/// Load the distro tag used to recognize locally modified revisions: the
/// `config` row for module `"synchrotron"`, key `"distro_tag"`.
pub(crate) async fn load_distro_tag(store: &Store) -> Result<String> {
    let row = sqlx::query("SELECT value FROM config WHERE module = 'synchrotron' AND key = 'distro_tag'")
        .fetch_optional(&store.pool)
        .await?
        .context("no synchrotron distro tag found in the config table")?;
    let value: serde_json::Value = row.try_get("value")?;
    ModuleConfig::new("synchrotron", "distro_tag", value)
        .typed_value()
        .context("malformed synchrotron distro tag")
}

/// Load the full set of blacklisted package names.
pub(crate) async fn load_blacklist(store: &Store) -> Result<HashSet<String>> {
    let rows = sqlx::query("SELECT package_name FROM synchrotron_blacklist").fetch_all(&store.pool).await?;
    rows.iter().map(|row| row.try_get::<String, _>("package_name").map_err(Into::into)).collect()
}

/// Record an issue raised while syncing or auto-syncing a suite.
pub(crate) async fn record_issue(store: &Store, issue: &SynchrotronIssue) -> Result<()> {
    sqlx::query(
        "INSERT INTO synchrotron_issue (uuid, date, kind, package_name, source_suite, target_suite,
                                         source_version, target_version, details)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
         ON CONFLICT (uuid) DO NOTHING",
    )
    .bind(issue.uuid)
    .bind(issue.date)
    .bind(enum_to_sql(&issue.kind))
    .bind(&issue.package_name)
    .bind(&issue.source_suite)
    .bind(&issue.target_suite)
    .bind(&issue.source_version)
    .bind(&issue.target_version)
    .bind(&issue.details)
    .execute(&store.pool)
    .await?;
    Ok(())
}
