// SPDX-License-Identifier: LGPL-3.0-or-later

//! # Configuration domain types
//!
//! [BaseConfig] mirrors the on-disk bootstrap file (`base-config.json`);
//! [ModuleConfig] models a row of the `config` table, which is the
//! authoritative source for per-module tunables once the database is up.
//! Resolving a `BaseConfig` path and reading per-module values out of the
//! store happens in the `laniakea` binary crate.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Archive location, as either a local mirror path or a remote URL (or both).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Local filesystem path to a mirror of the archive, if any.
    #[serde(default)]
    pub path: Option<String>,
    /// Remote URL of the archive, if any.
    #[serde(default)]
    pub url: Option<String>,
}

/// Database connection parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database host.
    pub host: String,
    /// Database port.
    pub port: u16,
    /// Database name.
    pub db: String,
    /// Database user.
    pub user: String,
    /// Database password.
    pub password: String,
    /// Extra connection options, passed through verbatim.
    #[serde(default)]
    pub extra: Option<String>,
}

/// Synchrotron-specific bootstrap settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynchrotronBaseConfig {
    /// Directory of `*.gpg` keyrings for source repositories.
    pub source_keyring_dir: String,
}

/// Top-level shape of `base-config.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseConfig {
    /// Directory used for transient downloads and intermediate files.
    pub cache_location: String,
    /// Root directory of the module workspaces (synchrotron, spears, ...).
    pub workspace: String,
    /// This archive's own location.
    pub archive: ArchiveConfig,
    /// Database connection parameters.
    pub database: DatabaseConfig,
    /// Synchrotron bootstrap settings.
    pub synchrotron: SynchrotronBaseConfig,
    /// Directory of `*.gpg` keyrings trusted for verifying this archive's
    /// own `InRelease` files.
    pub trusted_gpg_keyring_dir: String,
    /// Wire address of the lighthouse coordination endpoint.
    pub lighthouse_endpoint: String,
}

/// One row of the `config` table: `(module, key) -> JSONB value`.
///
/// Per-module tunables (e.g. a [crate::synchrotron::SynchrotronConfig] or a
/// [crate::spears::SpearsConfigEntry]) are read and written through rows of
/// this shape rather than through `base-config.json`, which only bootstraps
/// the database connection and workspace paths.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModuleConfig {
    /// Name of the module this row belongs to, e.g. `"synchrotron"`.
    pub module: String,
    /// Key within the module's namespace, e.g. `"blacklist"`.
    pub key: String,
    /// The configured value.
    pub value: Value,
}

impl ModuleConfig {
    /// Construct a new row.
    pub fn new(module: impl Into<String>, key: impl Into<String>, value: Value) -> Self {
        Self {
            module: module.into(),
            key: key.into(),
            value,
        }
    }

    /// Deserialize this row's value into a typed value, e.g. a
    /// [crate::synchrotron::SynchrotronConfig].
    pub fn typed_value<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.value.clone())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn base_config_roundtrips_through_json() {
        let raw = r#"{
            "CacheLocation": "/var/tmp/laniakea",
            "Workspace": "/srv/laniakea/workspace",
            "Archive": { "path": "/srv/mirror", "url": null },
            "Database": { "host": "localhost", "port": 5432, "db": "laniakea", "user": "lk", "password": "secret", "extra": null },
            "Synchrotron": { "SourceKeyringDir": "/etc/laniakea/keyrings" },
            "TrustedGpgKeyringDir": "/etc/laniakea/trusted-gpg",
            "LighthouseEndpoint": "tcp://127.0.0.1:5570"
        }"#;
        let config: BaseConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.cache_location, "/var/tmp/laniakea");
        assert_eq!(config.archive.path.as_deref(), Some("/srv/mirror"));
        assert_eq!(config.database.port, 5432);
    }

    #[test]
    fn module_config_typed_value_deserializes() {
        let row = ModuleConfig::new(
            "synchrotron",
            "blacklist_entry",
            json!({ "packageName": "foo", "reason": "embargoed" }),
        );
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Entry {
            package_name: String,
            reason: String,
        }
        let entry: Entry = row.typed_value().unwrap();
        assert_eq!(entry.package_name, "foo");
        assert_eq!(entry.reason, "embargoed");
    }
}
