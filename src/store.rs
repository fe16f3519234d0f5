// SPDX-License-Identifier: GPL-3.0-or-later

//! # Persistent store
//!
//! A thin wrapper around a Postgres connection pool. Table layout follows
//! the documented schema: `jobs`/`workers`/`events`/`isotope_recipes`,
//! `spears_excuses`, `synchrotron_blacklist`/`synchrotron_issue`,
//! `debcheck_issues`, `config`, plus the archive mirror tables
//! (`archive_repository`, `archive_suite`, `archive_component`,
//! `archive_architecture`, `archive_src_package`, `archive_bin_package`) and
//! their join tables. Only the accessors the engines in this crate actually
//! use are implemented; the remaining tables are reachable with the same
//! pool for future modules.

use anyhow::{Context, Result};
use laniakea_core::config::DatabaseConfig;
use sqlx::postgres::{PgPool, PgPoolOptions};

/// A handle onto the archive's relational store.
#[derive(Clone)]
pub(crate) struct Store {
    pub(crate) pool: PgPool,
}

impl Store {
    /// Open a connection pool from the bootstrap database configuration.
    pub(crate) async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let mut url = format!(
            "postgres://{}:{}@{}:{}/{}",
            config.user, config.password, config.host, config.port, config.db
        );
        if let Some(extra) = &config.extra {
            url.push('?');
            url.push_str(extra);
        }

        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(&url)
            .await
            .context("failed to connect to the database")?;

        Ok(Self { pool })
    }

    /// Run the embedded schema migrations.
    pub(crate) async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("failed to run database migrations")?;
        Ok(())
    }
}

/// Serialize a serde-enum value to the bare string its `SCREAMING_SNAKE_CASE`
/// serde representation produces, for storage in a plain `TEXT` column.
pub(crate) fn enum_to_sql<T: serde::Serialize>(value: &T) -> String {
    match serde_json::to_value(value).expect("enum serialization is infallible") {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Parse a `TEXT` column back into a serde enum, via the same
/// string-wrapped-in-quotes roundtrip `enum_to_sql` produces.
pub(crate) fn enum_from_sql<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T> {
    let quoted = serde_json::Value::String(raw.to_string());
    serde_json::from_value(quoted).with_context(|| format!("invalid stored enum value '{raw}'"))
}
