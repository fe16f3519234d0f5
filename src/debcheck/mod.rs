// SPDX-License-Identifier: GPL-3.0-or-later

//! # Debcheck engine
//!
//! Runs `dose-builddebcheck`/`dose-debcheck` against a suite's indices and
//! turns the YAML report into [DebcheckIssue] records.

use anyhow::Result;
use laniakea_core::{
    archive::Suite,
    debcheck::{parse_dose_report, DebcheckIssue, PackageKind},
};
use log::debug;

use crate::tools::dose;

pub(crate) mod store;

/// The foreground/background index files one architecture's dose run needs.
struct IndexFileList {
    foreground: Vec<String>,
    background: Vec<String>,
}

fn index_path(root: &str, suite: &str, component: &str, arch: &str, source: bool) -> String {
    if source {
        format!("{root}/dists/{suite}/{component}/source/Sources.xz")
    } else {
        format!("{root}/dists/{suite}/{component}/binary-{arch}/Packages.xz")
    }
}

/// Gather the foreground/background indices for one (suite, arch) dose run.
///
/// `source_packages`: use the suite's own `Sources.xz` as the foreground
/// index (build-dependency check) instead of its `Packages.xz`.
fn full_index_file_list(
    archive_root: &str,
    suite: &Suite,
    parent: Option<&Suite>,
    arch: &str,
    bin_arch: &str,
    source_packages: bool,
) -> IndexFileList {
    let mut foreground = Vec::new();
    let mut background = Vec::new();

    for component in &suite.components {
        if source_packages {
            foreground.push(index_path(archive_root, &suite.name, &component.name, arch, true));
        } else {
            foreground.push(index_path(archive_root, &suite.name, &component.name, arch, false));
        }

        background.push(index_path(archive_root, &suite.name, &component.name, arch, false));
        if arch == "all" {
            background.push(index_path(archive_root, &suite.name, &component.name, bin_arch, false));
        }

        if let Some(parent) = parent {
            background.push(index_path(archive_root, &parent.name, &component.name, arch, false));
            if arch == "all" {
                background.push(index_path(archive_root, &parent.name, &component.name, bin_arch, false));
            }
        }
    }

    IndexFileList { foreground, background }
}

/// `"amd64"` if the suite supports it, else its first non-`all` architecture.
fn default_native_architecture(suite: &Suite) -> String {
    if suite.architectures.iter().any(|a| a.as_str() == "amd64") {
        "amd64".to_string()
    } else {
        suite
            .primary_architecture()
            .map(|a| a.as_str().to_string())
            .unwrap_or_else(|| "amd64".to_string())
    }
}

/// Run build-dependency checks for every architecture of `suite` (plus `all`).
pub(crate) async fn get_build_dep_check_issues(
    archive_root: &str,
    suite: &Suite,
    parent: Option<&Suite>,
) -> Result<Vec<DebcheckIssue>> {
    let native = default_native_architecture(suite);
    let bin_arch = native.clone();
    let mut issues = Vec::new();

    for arch in suite.architectures_with_all() {
        let arch = arch.as_str();
        let list = full_index_file_list(archive_root, suite, parent, arch, &bin_arch, true);
        if list.foreground.is_empty() {
            continue;
        }
        let yaml = dose::run_builddebcheck(&native, &list.background, &list.foreground).await?;
        let parsed = parse_dose_report(&yaml, &suite.name, arch)?;
        issues.extend(parsed);
    }

    debug!("build-dep check for {}: {} issue(s)", suite.name, issues.len());
    Ok(issues)
}

/// Run installability checks for every architecture of `suite` (including `all`).
pub(crate) async fn get_dep_check_issues(
    archive_root: &str,
    suite: &Suite,
    parent: Option<&Suite>,
) -> Result<Vec<DebcheckIssue>> {
    let native = default_native_architecture(suite);
    let bin_arch = native.clone();
    let mut issues = Vec::new();

    for arch in suite.architectures_with_all() {
        let arch = arch.as_str();
        let list = full_index_file_list(archive_root, suite, parent, arch, &bin_arch, false);
        let yaml = dose::run_debcheck(&list.background, &list.foreground).await?;
        let parsed = parse_dose_report(&yaml, &suite.name, arch)?;
        issues.extend(parsed);
    }

    debug!("dep check for {}: {} issue(s)", suite.name, issues.len());
    Ok(issues)
}

/// Partition a freshly-generated issue set so callers can delete
/// `(suite, kind[, arch])` before inserting the replacement, per the
/// ordering guarantee that deletion precedes insertion.
pub(crate) fn partition_by_kind(issues: Vec<DebcheckIssue>) -> (Vec<DebcheckIssue>, Vec<DebcheckIssue>) {
    issues.into_iter().partition(|issue| issue.package_kind == PackageKind::Source)
}

#[cfg(test)]
mod test {
    use super::*;
    use laniakea_core::{archive::Component, architectures::Architecture};

    fn suite(name: &str, archs: &[&str]) -> Suite {
        Suite {
            name: name.to_string(),
            repo: "main".to_string(),
            architectures: archs.iter().map(|a| Architecture::new(a).unwrap()).collect(),
            components: vec![Component::new("main")],
            base_suite_name: None,
        }
    }

    #[test]
    fn default_native_prefers_amd64() {
        assert_eq!(default_native_architecture(&suite("unstable", &["amd64", "arm64"])), "amd64");
        assert_eq!(default_native_architecture(&suite("unstable", &["arm64", "riscv64"])), "arm64");
    }

    #[test]
    fn index_list_includes_bin_arch_only_for_all() {
        let s = suite("unstable", &["amd64"]);
        let list = full_index_file_list("/archive", &s, None, "amd64", "amd64", false);
        assert_eq!(list.background.len(), 1);
        let list_all = full_index_file_list("/archive", &s, None, "all", "amd64", false);
        assert_eq!(list_all.background.len(), 2);
    }

    #[test]
    fn index_list_appends_parent_background() {
        let s = suite("unstable", &["amd64"]);
        let parent = suite("stable", &["amd64"]);
        let list = full_index_file_list("/archive", &s, Some(&parent), "amd64", "amd64", false);
        assert_eq!(list.background.len(), 2);
    }
}
