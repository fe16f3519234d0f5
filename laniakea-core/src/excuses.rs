// SPDX-License-Identifier: LGPL-3.0-or-later

//! # Migration excuses
//!
//! `britney`'s own `excuses.yaml` format (ingested here as [Excuses] /
//! [ExcusesItem], largely unchanged from upstream britney's schema) is the
//! low-level wire format; [SpearsExcuse] is the archive-side record the
//! Spears engine actually stores, built from an [ExcusesItem] plus the
//! migration's identity and an optional log excerpt sourced from britney's
//! `output.txt`.

use std::{collections::HashMap, fmt, io};

use chrono::{DateTime, TimeZone, Utc};
use serde::de;
use serde::Deserialize;

use crate::architectures::{default_release_architectures, Architecture};

fn deserialize_datetime<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    struct DateTimeVisitor;

    impl<'de> de::Visitor<'de> for DateTimeVisitor {
        type Value = DateTime<Utc>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            write!(
                formatter,
                "a date and time formatted as %Y-%m-%d %H:%M:%S%:f"
            )
        }

        fn visit_str<E>(self, s: &str) -> std::result::Result<Self::Value, E>
        where
            E: de::Error,
        {
            match Utc.datetime_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
                Ok(dt) => Ok(dt),
                Err(_) => Err(de::Error::invalid_value(de::Unexpected::Str(s), &self)),
            }
        }
    }

    deserializer.deserialize_str(DateTimeVisitor)
}

/// Top-level contents of britney's `excuses.yaml`.
#[derive(Debug, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Excuses {
    /// Time britney generated this report.
    #[serde(deserialize_with = "deserialize_datetime")]
    pub generated_date: DateTime<Utc>,
    /// One entry per source package britney considered.
    pub sources: Vec<ExcusesItem>,
}

/// A policy's verdict
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub enum Verdict {
    /// Policy passed
    #[serde(rename = "PASS")]
    Pass,
    /// Policy passed due to a hint
    #[serde(rename = "PASS_HINTED")]
    PassHinted,
    /// Rejected due to a block hint or because the upload requires explicit approval (e.g.,
    /// uploads to proposed-updates or testing-proposed-updates)
    #[serde(rename = "REJECTED_NEEDS_APPROVAL")]
    RejectedNeedsApproval,
    /// Rejected due to a permanent issue
    #[serde(rename = "REJECTED_PERMANENTLY")]
    RejectedPermanently,
    /// Rejected due to a transient issue
    #[serde(rename = "REJECTED_TEMPORARILY")]
    RejectedTemporarily,
    /// Rejected, but not able to determine if the issue is transient
    #[serde(rename = "REJECTED_CANNOT_DETERMINE_IF_PERMANENT")]
    RejectedCannotDetermineIfPermanent,
}

impl Verdict {
    fn is_blocking(&self) -> bool {
        !matches!(self, Verdict::Pass | Verdict::PassHinted)
    }
}

/// Age policy info
#[derive(Debug, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AgeInfo {
    /// Minimum age (in days) required before this package may migrate.
    pub age_requirement: u32,
    /// Current age (in days) of this package in the source suite.
    pub current_age: u32,
    /// Verdict of the age policy.
    pub verdict: Verdict,
}

/// Catch-all policy info for policies this crate does not model in detail.
#[derive(Debug, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UnspecifiedPolicyInfo {
    /// Verdict of the policy.
    pub verdict: Verdict,
}

/// Built-on-buildd policy info
#[derive(Debug, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BuiltOnBuildd {
    /// Per-architecture signer, if the binary was signed by a buildd key.
    pub signed_by: HashMap<Architecture, Option<String>>,
    /// Verdict of the policy.
    pub verdict: Verdict,
}

/// Collected policy infos for one source package.
#[derive(Debug, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PolicyInfo {
    /// Age policy, if evaluated.
    pub age: Option<AgeInfo>,
    /// Built-on-buildd policy, if evaluated.
    pub builtonbuildd: Option<BuiltOnBuildd>,
    /// Every other named policy (autopkgtest, block, rc-bugs, piuparts, ...).
    #[serde(flatten)]
    pub extras: HashMap<String, UnspecifiedPolicyInfo>,
}

/// List of architectures a source package is still missing builds on.
#[derive(Debug, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MissingBuilds {
    /// Architectures still missing a build.
    pub on_architectures: Vec<Architecture>,
}

/// A single binary left behind in the target suite by an otherwise
/// migrated source package.
#[derive(Debug, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OldBinary {
    /// Version of the orphaned binary set.
    pub package_version: String,
    /// Binary package names at that version.
    pub binaries: Vec<String>,
}

/// A source package's excuse, as britney emits it.
#[derive(Debug, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ExcusesItem {
    /// Whether britney considered this package a migration candidate at all.
    pub is_candidate: bool,
    /// Version in the source suite.
    pub new_version: String,
    /// Version in the target suite.
    pub old_version: String,
    /// Internal britney item identifier, e.g. `zathura/amd64`.
    pub item_name: String,
    /// Source package name.
    pub source: String,
    /// Set when another package's non-migration is blocking this one.
    pub invalidated_by_other_package: Option<bool>,
    /// Archive component, if known.
    pub component: Option<String>,
    /// Missing builds, if any.
    pub missing_builds: Option<MissingBuilds>,
    /// Per-policy verdicts.
    #[serde(rename = "policy_info")]
    pub policy_info: Option<PolicyInfo>,
    /// Binaries left behind at an older version, if any.
    #[serde(default)]
    pub old_binaries: HashMap<String, Vec<String>>,
}

/// Result type
pub type Result<T> = serde_yaml::Result<T>;

/// Read excuses from a reader
pub fn from_reader(reader: impl io::Read) -> Result<Excuses> {
    serde_yaml::from_reader(reader)
}

/// Read excuses from a string
pub fn from_str(data: &str) -> Result<Excuses> {
    serde_yaml::from_str(data)
}

/// Age-policy summary attached to a [SpearsExcuse].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpearsAge {
    /// Days the package has been sitting in the source suite.
    pub current_age: u32,
    /// Minimum age required before migration, in days.
    pub required_age: u32,
}

/// Missing-build summary attached to a [SpearsExcuse].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpearsMissingBuilds {
    /// Primary (release) architectures still missing a build.
    pub primary_archs: Vec<String>,
    /// Secondary (non-release) architectures still missing a build.
    pub secondary_archs: Vec<String>,
}

/// Why a package did or did not migrate, as understood by Spears.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpearsReason {
    /// Item names this excuse is blocked by.
    pub blocked_by: Vec<String>,
    /// Item names this excuse must migrate after.
    pub migrate_after: Vec<String>,
    /// A manual block hint, if one is in effect.
    pub manual_block: Option<String>,
    /// Any other non-passing policy verdicts, by policy name.
    pub other: Vec<String>,
    /// Excerpt of britney's `output.txt` log for this item, if found.
    pub log_excerpt: Option<String>,
}

/// A single, previously-left-behind binary set reported by britney.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpearsOldBinary {
    /// Version these binaries were built at.
    pub package_version: String,
    /// Names of the orphaned binaries.
    pub binaries: Vec<String>,
}

/// The archive-side record of one package's migration attempt, stamped with
/// the migration it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpearsExcuse {
    /// `sort(sourceSuites).join("+") + "-to-" + targetSuite`.
    pub migration_id: String,
    /// Time britney generated the report this excuse came from.
    pub date: DateTime<Utc>,
    /// Source suite this excuse was attributed to (best-effort for
    /// multi-source migrations, via the caller's source-suite map).
    pub source_suite: Option<String>,
    /// Target suite of the migration.
    pub target_suite: String,
    /// Whether britney considered this package a migration candidate.
    pub is_candidate: bool,
    /// Source package name.
    pub source_package: String,
    /// Maintainer of the source package, if resolvable from the archive model.
    pub maintainer: Option<String>,
    /// Age-policy summary.
    pub age: SpearsAge,
    /// New (source suite) version.
    pub new_version: String,
    /// Old (target suite) version.
    pub old_version: String,
    /// Missing-build summary.
    pub missing_builds: SpearsMissingBuilds,
    /// Binaries left behind at an older version.
    pub old_binaries: Vec<SpearsOldBinary>,
    /// Reason for the current verdict.
    pub reason: SpearsReason,
}

impl ExcusesItem {
    /// Build a [SpearsExcuse] from this raw britney item.
    ///
    /// `log_excerpt` should be the slice of `output.txt` pertaining to
    /// `item_name`, if the caller has extracted one.
    pub fn into_spears_excuse(
        self,
        migration_id: String,
        target_suite: String,
        generated_date: DateTime<Utc>,
        log_excerpt: Option<String>,
    ) -> SpearsExcuse {
        let age = self
            .policy_info
            .as_ref()
            .and_then(|p| p.age.as_ref())
            .map(|a| SpearsAge {
                current_age: a.current_age,
                required_age: a.age_requirement,
            })
            .unwrap_or_default();

        let missing_builds = self
            .missing_builds
            .as_ref()
            .map(|mb| {
                let release_archs = default_release_architectures();
                let (primary, secondary): (Vec<_>, Vec<_>) = mb
                    .on_architectures
                    .iter()
                    .map(|a| a.as_str().to_string())
                    .partition(|name| release_archs.iter().any(|a| a.as_str() == name));
                SpearsMissingBuilds {
                    primary_archs: primary,
                    secondary_archs: secondary,
                }
            })
            .unwrap_or_default();

        let mut other = Vec::new();
        if let Some(policy_info) = &self.policy_info {
            for (name, info) in &policy_info.extras {
                if info.verdict.is_blocking() {
                    other.push(name.clone());
                }
            }
        }
        other.sort();

        let manual_block = self
            .policy_info
            .as_ref()
            .and_then(|p| p.extras.get("block"))
            .filter(|info| info.verdict.is_blocking())
            .map(|_| "block".to_string());

        let blocked_by = if self.invalidated_by_other_package == Some(true) {
            vec![self.item_name.clone()]
        } else {
            Vec::new()
        };

        let old_binaries = self
            .old_binaries
            .into_iter()
            .map(|(package_version, binaries)| SpearsOldBinary {
                package_version,
                binaries,
            })
            .collect();

        SpearsExcuse {
            migration_id,
            date: generated_date,
            source_suite: None,
            target_suite,
            is_candidate: self.is_candidate,
            source_package: self.source,
            maintainer: None,
            age,
            new_version: self.new_version,
            old_version: self.old_version,
            missing_builds,
            old_binaries,
            reason: SpearsReason {
                blocked_by,
                migrate_after: Vec::new(),
                manual_block,
                other,
                log_excerpt,
            },
        }
    }
}

impl Excuses {
    /// Convert every item into a [SpearsExcuse] stamped with `migration_id`/`target_suite`.
    pub fn into_spears_excuses(
        self,
        migration_id: &str,
        target_suite: &str,
        output_txt: &str,
    ) -> Vec<SpearsExcuse> {
        self.sources
            .into_iter()
            .map(|item| {
                let excerpt = extract_log_excerpt(output_txt, &item.item_name);
                item.into_spears_excuse(
                    migration_id.to_string(),
                    target_suite.to_string(),
                    self.generated_date,
                    excerpt,
                )
            })
            .collect()
    }
}

/// Pull the paragraph of britney's `output.txt` mentioning `item_name`, if any.
///
/// britney's plain-text log groups lines loosely by item; this performs a
/// best-effort substring scan rather than parsing its (undocumented) report
/// grammar.
fn extract_log_excerpt(output_txt: &str, item_name: &str) -> Option<String> {
    let lines: Vec<&str> = output_txt
        .lines()
        .filter(|line| line.contains(item_name))
        .collect();
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

/// Derive `migrationId = sort(sourceSuites).join("+") + "-to-" + targetSuite`.
pub fn migration_id(source_suites: &[String], target_suite: &str) -> String {
    let mut sorted = source_suites.to_vec();
    sorted.sort();
    format!("{}-to-{}", sorted.join("+"), target_suite)
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample() -> Excuses {
        let data = r#"
generated-date: "2024-01-15 10:30:00.000000"
sources:
  - item-name: zathura/amd64
    source: zathura
    new-version: "0.4.3-2"
    old-version: "0.4.3-1"
    is-candidate: true
    invalidated-by-other-package: false
"#;
        from_str(data).unwrap()
    }

    #[test]
    fn parses_excuses_yaml() {
        let excuses = sample();
        assert_eq!(excuses.sources.len(), 1);
        assert_eq!(excuses.sources[0].source, "zathura");
    }

    #[test]
    fn migration_id_sorts_source_suites() {
        assert_eq!(
            migration_id(&["testing".to_string(), "unstable".to_string()], "stable"),
            "testing+unstable-to-stable"
        );
    }

    #[test]
    fn converts_item_to_spears_excuse() {
        let excuses = sample();
        let result = excuses.into_spears_excuses("unstable-to-testing", "testing", "");
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].source_package, "zathura");
        assert_eq!(result[0].migration_id, "unstable-to-testing");
        assert!(result[0].reason.blocked_by.is_empty());
    }

    #[test]
    fn log_excerpt_is_extracted_by_item_name() {
        let output = "zathura/amd64: some diagnostic\nother/amd64: unrelated\n";
        let excerpt = extract_log_excerpt(output, "zathura/amd64");
        assert_eq!(excerpt, Some("zathura/amd64: some diagnostic".to_string()));
    }
}
