// SPDX-License-Identifier: LGPL-3.0-or-later

//! # Debcheck domain types and dose-tool YAML ingestion
//!
//! [dose-debcheck](https://www.mancoosi.org/software/) and
//! `dose-builddebcheck` both emit the same YAML `report:` shape; this module
//! parses that shape into the archive's own [DebcheckIssue] records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Whether a [DebcheckIssue] concerns a source or binary package.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PackageKind {
    /// A source package (build-dependency check).
    Source,
    /// A binary package (installability check).
    Binary,
}

/// One package's unsatisfied dependency, as found by dose.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackageIssue {
    /// Whether this is a source or binary package entry.
    pub package_kind: PackageKind,
    /// Name of the package.
    pub package_name: String,
    /// Version of the package.
    pub package_version: String,
    /// Architecture the check ran for.
    pub architecture: String,
    /// The `Depends`-style field dose evaluated.
    pub depends: Option<String>,
    /// The specific dependency clause dose could not satisfy.
    pub unsat_dependency: Option<String>,
    /// The specific conflict clause dose found, if this entry is part of a conflict.
    pub unsat_conflict: Option<String>,
}

/// A pair of packages in conflict, each with its dependency chain to the
/// conflicting clause.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackageConflict {
    /// First package in the conflict.
    pub pkg1: PackageIssue,
    /// Second package in the conflict.
    pub pkg2: PackageIssue,
    /// Dependency chain from `pkg1` to the conflicting clause.
    pub depchain1: Vec<PackageIssue>,
    /// Dependency chain from `pkg2` to the conflicting clause.
    pub depchain2: Vec<PackageIssue>,
}

/// One package's installability/build-dependency failure for a suite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebcheckIssue {
    /// Identifier of this issue.
    pub uuid: Uuid,
    /// When the check was run.
    pub date: DateTime<Utc>,
    /// Whether this concerns a source or binary package.
    pub package_kind: PackageKind,
    /// Suite the check ran against.
    pub suite_name: String,
    /// Name of the affected package.
    pub package_name: String,
    /// Version of the affected package.
    pub package_version: String,
    /// Architecture the check ran for.
    pub architecture: String,
    /// Unsatisfied dependencies.
    pub missing: Vec<PackageIssue>,
    /// Conflicts preventing installability.
    pub conflicts: Vec<PackageConflict>,
}

/// Errors converting a dose YAML report into [DebcheckIssue] records.
#[derive(Debug, Error)]
pub enum DebcheckError {
    /// The YAML document itself did not parse.
    #[error("invalid dose report: {0}")]
    InvalidYaml(#[from] serde_yaml::Error),
    /// A `report:` entry had a `reason` kind this parser does not understand.
    #[error("unrecognized dose reason kind: {0}")]
    UnknownReason(String),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct DoseReport {
    #[serde(default)]
    report: Vec<DoseEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct DoseEntry {
    package: String,
    version: String,
    architecture: String,
    #[serde(rename = "type", default)]
    package_type: String,
    #[serde(default)]
    reasons: Vec<DoseReason>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct DoseReason {
    missing: Option<DoseMissing>,
    conflict: Option<DoseConflict>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct DoseMissing {
    pkg: DosePkgRef,
    #[serde(default)]
    unsat_dependency: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct DoseConflict {
    pkg1: DosePkgRef,
    pkg2: DosePkgRef,
    #[serde(default)]
    unsat_conflict: Option<String>,
    #[serde(default)]
    depchain1: Vec<DoseDepchainEntry>,
    #[serde(default)]
    depchain2: Vec<DoseDepchainEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct DoseDepchainEntry {
    depchain: Vec<DosePkgRef>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct DosePkgRef {
    package: String,
    version: String,
    #[serde(default)]
    architecture: Option<String>,
    #[serde(default)]
    depends: Option<String>,
}

fn package_kind_of(package_type: &str) -> PackageKind {
    if package_type == "src" {
        PackageKind::Source
    } else {
        PackageKind::Binary
    }
}

fn pkg_ref_to_issue(kind: PackageKind, default_arch: &str, r: &DosePkgRef) -> PackageIssue {
    PackageIssue {
        package_kind: kind,
        package_name: r.package.clone(),
        package_version: r.version.clone(),
        architecture: r.architecture.clone().unwrap_or_else(|| default_arch.to_string()),
        depends: r.depends.clone(),
        unsat_dependency: None,
        unsat_conflict: None,
    }
}

/// Parse a dose `report:` YAML document into [DebcheckIssue] records for
/// `suite_name`. When `arch_filter` is `"all"`, entries for other
/// architectures are skipped (and vice versa) to match the spec's rule that
/// `all`-architecture packages are only processed on an explicit `all` pass.
pub fn parse_dose_report(
    yaml: &str,
    suite_name: &str,
    arch_filter: &str,
) -> Result<Vec<DebcheckIssue>, DebcheckError> {
    let report: DoseReport = serde_yaml::from_str(yaml)?;
    let mut issues = Vec::new();

    for entry in report.report {
        if entry.architecture == "all" && arch_filter != "all" {
            continue;
        }
        if entry.architecture != "all" && arch_filter == "all" {
            continue;
        }

        let kind = package_kind_of(&entry.package_type);
        let mut missing = Vec::new();
        let mut conflicts = Vec::new();

        for reason in &entry.reasons {
            match (&reason.missing, &reason.conflict) {
                (Some(m), None) => {
                    let mut issue = pkg_ref_to_issue(kind, &entry.architecture, &m.pkg);
                    issue.unsat_dependency = m.unsat_dependency.clone();
                    missing.push(issue);
                }
                (None, Some(c)) => {
                    let pkg1 = pkg_ref_to_issue(kind, &entry.architecture, &c.pkg1);
                    let mut pkg2 = pkg_ref_to_issue(kind, &entry.architecture, &c.pkg2);
                    pkg2.unsat_conflict = c.unsat_conflict.clone();

                    let depchain1 = c
                        .depchain1
                        .iter()
                        .flat_map(|d| d.depchain.iter())
                        .map(|r| pkg_ref_to_issue(kind, &entry.architecture, r))
                        .collect();
                    let depchain2 = c
                        .depchain2
                        .iter()
                        .flat_map(|d| d.depchain.iter())
                        .map(|r| pkg_ref_to_issue(kind, &entry.architecture, r))
                        .collect();

                    conflicts.push(PackageConflict {
                        pkg1,
                        pkg2,
                        depchain1,
                        depchain2,
                    });
                }
                _ => return Err(DebcheckError::UnknownReason(entry.package.clone())),
            }
        }

        issues.push(DebcheckIssue {
            uuid: Uuid::new_v4(),
            date: Utc::now(),
            package_kind: kind,
            suite_name: suite_name.to_string(),
            package_name: entry.package.clone(),
            package_version: entry.version.clone(),
            architecture: entry.architecture.clone(),
            missing,
            conflicts,
        });
    }

    Ok(issues)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_missing_dependency() {
        let yaml = r#"
report:
  - package: zathura
    version: "0.4.3-1"
    architecture: amd64
    type: bin
    reasons:
      - missing:
          pkg:
            package: zathura
            version: "0.4.3-1"
          unsat-dependency: "libmupdf-dev (>= 1.18)"
"#;
        let issues = parse_dose_report(yaml, "unstable", "amd64").unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].missing.len(), 1);
        assert_eq!(
            issues[0].missing[0].unsat_dependency.as_deref(),
            Some("libmupdf-dev (>= 1.18)")
        );
    }

    #[test]
    fn parses_conflict_with_depchains() {
        let yaml = r#"
report:
  - package: foo
    version: "1.0"
    architecture: amd64
    type: bin
    reasons:
      - conflict:
          pkg1:
            package: foo
            version: "1.0"
          pkg2:
            package: bar
            version: "2.0"
          unsat-conflict: "baz (<< 3.0)"
          depchain1:
            - depchain:
                - package: foo
                  version: "1.0"
                - package: baz
                  version: "1.0"
"#;
        let issues = parse_dose_report(yaml, "unstable", "amd64").unwrap();
        assert_eq!(issues[0].conflicts.len(), 1);
        assert_eq!(issues[0].conflicts[0].depchain1.len(), 2);
        assert_eq!(
            issues[0].conflicts[0].pkg2.unsat_conflict.as_deref(),
            Some("baz (<< 3.0)")
        );
    }

    #[test]
    fn skips_all_arch_unless_requested() {
        let yaml = r#"
report:
  - package: foo
    version: "1.0"
    architecture: all
    type: bin
    reasons: []
"#;
        assert!(parse_dose_report(yaml, "unstable", "amd64").unwrap().is_empty());
        assert_eq!(parse_dose_report(yaml, "unstable", "all").unwrap().len(), 1);
    }
}
