// SPDX-License-Identifier: LGPL-3.0-or-later

//! # Synchrotron domain types
//!
//! Configuration and issue records for the source-to-target package
//! synchronization engine. The engine logic itself (binary-binding, cruft
//! detection) lives in the `laniakea` binary crate's `synchrotron` module,
//! which builds on these types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A package name excluded from automatic synchronization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncBlacklistEntry {
    /// Name of the blacklisted package, unique across the blacklist.
    pub package_name: String,
    /// Date the entry was added.
    pub date: DateTime<Utc>,
    /// Reason for blacklisting.
    pub reason: String,
    /// Operator who added the entry, if known.
    pub user: Option<String>,
}

/// The upstream archive a [SynchrotronConfig] syncs from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSource {
    /// Base URL (or local path) of the source repository.
    pub repo_url: String,
    /// Name of the suite to sync from when none is given explicitly.
    pub default_suite: String,
    /// All suites available from this source repository.
    pub suites: Vec<String>,
}

/// Configuration for syncing one target suite against one upstream source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynchrotronConfig {
    /// Name identifying this sync configuration, e.g. "debian".
    pub source_name: String,
    /// The upstream source this configuration pulls from.
    pub source: SyncSource,
    /// Whether automatic syncing is enabled for this source.
    pub sync_enabled: bool,
    /// Whether binary packages are synced along with source packages.
    pub sync_binaries: bool,
    /// Keyring paths used to verify the source repository's `InRelease`.
    pub source_keyrings: Vec<String>,
}

/// The kind of situation a [SynchrotronIssue] records.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SynchrotronIssueKind {
    /// No issue; reserved for completeness, never persisted.
    None,
    /// Target's local modifications must be merged by a human before syncing.
    MergeRequired,
    /// Package may be cruft; kept out of caution (distro-tagged revision).
    MaybeCruft,
    /// The sync of this package failed.
    SyncFailed,
    /// Removing this (cruft) package failed.
    RemovalFailed,
}

/// A problem or notable outcome surfaced by a synchronization run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynchrotronIssue {
    /// Identifier of this issue.
    pub uuid: Uuid,
    /// When the issue was recorded.
    pub date: DateTime<Utc>,
    /// What kind of issue this is.
    pub kind: SynchrotronIssueKind,
    /// Package the issue concerns.
    pub package_name: String,
    /// Suite the package was being synced from.
    pub source_suite: String,
    /// Suite the package was being synced into.
    pub target_suite: String,
    /// Version in the source suite, if relevant.
    pub source_version: Option<String>,
    /// Version in the target suite, if relevant.
    pub target_version: Option<String>,
    /// Free-form details (e.g. a dak error message).
    pub details: String,
}

impl SynchrotronIssue {
    /// Construct a new issue with a fresh random identifier.
    pub fn new(
        kind: SynchrotronIssueKind,
        package_name: impl Into<String>,
        source_suite: impl Into<String>,
        target_suite: impl Into<String>,
    ) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            date: Utc::now(),
            kind,
            package_name: package_name.into(),
            source_suite: source_suite.into(),
            target_suite: target_suite.into(),
            source_version: None,
            target_version: None,
            details: String::new(),
        }
    }
}

/// Whether a target version is considered "locally modified" by containing
/// the configured distro tag in its Debian revision.
pub fn is_locally_modified(debian_revision: &str, distro_tag: &str) -> bool {
    !distro_tag.is_empty() && debian_revision.contains(distro_tag)
}

/// Whether a target version's revision marks it as "new in this distro"
/// (prefixed with `0<distroTag>`) and therefore exempt from cruft removal.
pub fn is_new_in_distro(debian_revision: &str, distro_tag: &str) -> bool {
    !distro_tag.is_empty() && debian_revision.starts_with(&format!("0{distro_tag}"))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn locally_modified_detects_distro_tag() {
        assert!(is_locally_modified("1tanglu1", "tanglu"));
        assert!(!is_locally_modified("1", "tanglu"));
        assert!(!is_locally_modified("1tanglu1", ""));
    }

    #[test]
    fn new_in_distro_requires_leading_zero_tag() {
        assert!(is_new_in_distro("0tanglu1", "tanglu"));
        assert!(!is_new_in_distro("1tanglu1", "tanglu"));
    }

    #[test]
    fn issue_constructor_fills_identity() {
        let issue = SynchrotronIssue::new(
            SynchrotronIssueKind::MergeRequired,
            "zathura",
            "unstable",
            "staging",
        );
        assert_eq!(issue.package_name, "zathura");
        assert_eq!(issue.kind, SynchrotronIssueKind::MergeRequired);
    }
}
