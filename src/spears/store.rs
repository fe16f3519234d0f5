// SPDX-License-Identifier: GPL-3.0-or-later

//! Persistence for [`SpearsExcuse`] records.

use anyhow::Result;
use laniakea_core::excuses::SpearsExcuse;

use crate::store::Store;

/// Replace the stored excuses for `migration_id` with a freshly run batch.
pub(crate) async fn replace_excuses(store: &Store, migration_id: &str, excuses: &[SpearsExcuse]) -> Result<()> {
    sqlx::query("DELETE FROM spears_excuses WHERE migration_id = $1")
        .bind(migration_id)
        .execute(&store.pool)
        .await?;

    for excuse in excuses {
        let data = serde_json::to_value(excuse)?;
        sqlx::query(
            "INSERT INTO spears_excuses (migration_id, source_package, new_version, target_suite, is_candidate, data)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (migration_id, source_package, new_version) DO UPDATE SET
                target_suite = EXCLUDED.target_suite, is_candidate = EXCLUDED.is_candidate, data = EXCLUDED.data",
        )
        .bind(&excuse.migration_id)
        .bind(&excuse.source_package)
        .bind(&excuse.new_version)
        .bind(&excuse.target_suite)
        .bind(excuse.is_candidate)
        .bind(data)
        .execute(&store.pool)
        .await?;
    }
    Ok(())
}
