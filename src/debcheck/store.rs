// SPDX-License-Identifier: GPL-3.0-or-later

//! Persistence for [`DebcheckIssue`] records.
//!
//! A check run replaces the previous results for its (suite, kind[, arch])
//! scope rather than accumulating stale entries: callers delete before they
//! insert, using [`partition_by_kind`](crate::debcheck::partition_by_kind) to
//! get separate source/binary batches for that deletion.

use anyhow::Result;
use laniakea_core::debcheck::{DebcheckIssue, PackageKind};

use crate::store::{enum_to_sql, Store};

/// Remove all previously recorded issues of `kind` for `suite_name`.
pub(crate) async fn delete_issues(store: &Store, suite_name: &str, kind: PackageKind) -> Result<()> {
    sqlx::query("DELETE FROM debcheck_issues WHERE suite_name = $1 AND package_kind = $2")
        .bind(suite_name)
        .bind(enum_to_sql(&kind))
        .execute(&store.pool)
        .await?;
    Ok(())
}

/// Insert a freshly computed batch of issues.
pub(crate) async fn insert_issues(store: &Store, issues: &[DebcheckIssue]) -> Result<()> {
    for issue in issues {
        let data = serde_json::json!({ "missing": issue.missing, "conflicts": issue.conflicts });
        sqlx::query(
            "INSERT INTO debcheck_issues (uuid, date, package_kind, suite_name, architecture,
                                           package_name, package_version, data)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             ON CONFLICT (uuid) DO NOTHING",
        )
        .bind(issue.uuid)
        .bind(issue.date)
        .bind(enum_to_sql(&issue.package_kind))
        .bind(&issue.suite_name)
        .bind(&issue.architecture)
        .bind(&issue.package_name)
        .bind(&issue.package_version)
        .bind(data)
        .execute(&store.pool)
        .await?;
    }
    Ok(())
}

/// Replace the stored issues of `kind` for `suite_name` with `issues`.
pub(crate) async fn replace_issues(store: &Store, suite_name: &str, kind: PackageKind, issues: &[DebcheckIssue]) -> Result<()> {
    delete_issues(store, suite_name, kind).await?;
    insert_issues(store, issues).await
}
