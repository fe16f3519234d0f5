// SPDX-License-Identifier: GPL-3.0-or-later

//! # Synchrotron engine
//!
//! Reconciles a target suite's contents with a source suite's, subject to
//! the blacklist and `distroTag` policy in [laniakea_core::synchrotron].

use std::collections::{HashMap, HashSet};

use anyhow::Result;
use laniakea_core::{
    package::{BinaryPackage, SourcePackage},
    synchrotron::{is_locally_modified, is_new_in_distro, SynchrotronIssue, SynchrotronIssueKind},
    version::PackageVersion,
};
use log::{debug, info, trace, warn};

use crate::{repository::newest_per_name, tools::dak};

pub(crate) mod store;

/// Decide what should happen to one source package during an `AutoSync`
/// pass, given its would-be target version (if any) and the policy tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SyncDecision {
    /// Import `source` into the target: it is not present, or the target
    /// is strictly behind.
    Import,
    /// Target is already at or ahead of source; nothing to do.
    UpToDate,
    /// Target's revision carries the distro tag; needs a human merge.
    MergeRequired,
}

/// Decide the [SyncDecision] for a candidate source package against the
/// newest known target version (`None` if absent from the target).
pub(crate) fn decide_sync(
    source_version: &PackageVersion,
    target_version: Option<&PackageVersion>,
    distro_tag: &str,
) -> SyncDecision {
    let Some(target_version) = target_version else {
        return SyncDecision::Import;
    };

    if target_version >= source_version {
        return SyncDecision::UpToDate;
    }

    if is_locally_modified(&target_version.to_string(), distro_tag) {
        return SyncDecision::MergeRequired;
    }

    SyncDecision::Import
}

/// Whether a target-only source package is cruft: absent upstream, not
/// native, not new-in-distro, and not carrying the distro tag elsewhere.
pub(crate) fn is_cruft_candidate(revision: &str, distro_tag: &str, is_native: bool) -> bool {
    if is_native {
        return false;
    }
    if is_new_in_distro(revision, distro_tag) {
        return false;
    }
    !is_locally_modified(revision, distro_tag)
}

/// Engine driving one synchronization run for a single target suite.
pub(crate) struct Synchrotron {
    source_name: String,
    target_suite: String,
    distro_tag: String,
    blacklist: HashSet<String>,
}

impl Synchrotron {
    /// Construct an engine for syncing into `target_suite`.
    pub(crate) fn new(
        source_name: impl Into<String>,
        target_suite: impl Into<String>,
        distro_tag: impl Into<String>,
        blacklist: HashSet<String>,
    ) -> Self {
        Self {
            source_name: source_name.into(),
            target_suite: target_suite.into(),
            distro_tag: distro_tag.into(),
            blacklist,
        }
    }

    /// Synchronize `names` from `component`, importing each via `dak`
    /// unless blacklisted, already up to date, or locally modified (unless
    /// `force`, which also threads `ignoreTargetChanges=true` into the
    /// binary-binding step it triggers).
    #[allow(clippy::too_many_arguments)]
    pub(crate) async fn sync_packages(
        &self,
        component: &str,
        architectures: &[String],
        sources: &[SourcePackage],
        targets: &HashMap<String, PackageVersion>,
        source_binaries: &HashMap<String, Vec<BinaryPackage>>,
        target_binaries: &HashMap<String, Vec<BinaryPackage>>,
        names: &[String],
        force: bool,
    ) -> Result<bool> {
        let mut synced: Vec<&SourcePackage> = Vec::new();

        for name in names {
            if self.blacklist.contains(name) {
                info!("Can not sync {name}: blacklisted");
                continue;
            }

            let Some(source) = sources.iter().find(|p| p.name.as_ref() == name) else {
                trace!("{name}: not found in source {}", self.source_name);
                continue;
            };

            let target_version = targets.get(name);
            match decide_sync(&source.version, target_version, &self.distro_tag) {
                SyncDecision::UpToDate if !force => {
                    trace!("{name}: target is up to date, skipping");
                    continue;
                }
                SyncDecision::UpToDate => {
                    warn!("{name}: target version already at or ahead of source, forcing anyway");
                }
                SyncDecision::MergeRequired if !force => {
                    warn!("{name}: has modifications, skipping");
                    continue;
                }
                SyncDecision::MergeRequired | SyncDecision::Import => {}
            }

            let files: Vec<String> = source.files.iter().map(|f| f.filename.clone()).collect();
            if !dak::import_package_files(&self.target_suite, &files).await? {
                return Ok(false);
            }
            synced.push(source);
        }

        if !synced.is_empty()
            && !self
                .import_binaries_for_sources(architectures, &synced, source_binaries, target_binaries, force)
                .await?
        {
            return Ok(false);
        }

        Ok(true)
    }

    /// Reconcile every package in `component`: import what is missing or
    /// outdated, flag local modifications, and (if `remove_cruft`) remove
    /// packages no longer present upstream.
    #[allow(clippy::too_many_arguments)]
    pub(crate) async fn auto_sync(
        &self,
        component: &str,
        architectures: &[String],
        sources: &[SourcePackage],
        targets: &HashMap<String, (PackageVersion, bool)>,
        source_binaries: &HashMap<String, Vec<BinaryPackage>>,
        target_binaries: &HashMap<String, Vec<BinaryPackage>>,
        remove_cruft: bool,
    ) -> Result<(bool, Vec<SynchrotronIssue>)> {
        let mut issues = Vec::new();
        let mut imported = HashSet::new();

        for source in sources {
            let name = source.name.to_string();
            if self.blacklist.contains(&name) {
                continue;
            }

            let target_version = targets.get(&name).map(|(v, _)| v);
            match decide_sync(&source.version, target_version, &self.distro_tag) {
                SyncDecision::UpToDate => continue,
                SyncDecision::MergeRequired => {
                    let (target_version, _) = targets.get(&name).expect("target version present");
                    let mut issue = SynchrotronIssue::new(
                        SynchrotronIssueKind::MergeRequired,
                        name.clone(),
                        self.source_name.clone(),
                        self.target_suite.clone(),
                    );
                    issue.source_version = Some(source.version.to_string());
                    issue.target_version = Some(target_version.to_string());
                    issues.push(issue);
                    continue;
                }
                SyncDecision::Import => {
                    let files: Vec<String> = source.files.iter().map(|f| f.filename.clone()).collect();
                    if !dak::import_package_files(&self.target_suite, &files).await? {
                        return Ok((false, issues));
                    }
                    imported.insert(name.clone());
                }
            }
        }

        // "active" = just-imported sources, plus sources whose target
        // counterpart is unmodified (not carrying the distro tag) and so is
        // still eligible to have its binaries re-bound (e.g. after a binNMU).
        let active: Vec<&SourcePackage> = sources
            .iter()
            .filter(|source| {
                let name = source.name.to_string();
                if imported.contains(&name) {
                    return true;
                }
                match targets.get(&name) {
                    Some((version, _)) => !is_locally_modified(&version.to_string(), &self.distro_tag),
                    None => false,
                }
            })
            .collect();

        if !active.is_empty()
            && !self
                .import_binaries_for_sources(architectures, &active, source_binaries, target_binaries, false)
                .await?
        {
            return Ok((false, issues));
        }

        if remove_cruft {
            let source_names: HashSet<&str> = sources.iter().map(|p| p.name.as_ref()).collect();
            for (name, (version, is_native)) in targets {
                if source_names.contains(name.as_str()) || imported.contains(name) {
                    continue;
                }
                let revision = version.to_string();
                if *is_native {
                    continue;
                }
                if is_new_in_distro(&revision, &self.distro_tag) {
                    continue;
                }
                if is_locally_modified(&revision, &self.distro_tag) {
                    let mut issue = SynchrotronIssue::new(
                        SynchrotronIssueKind::MaybeCruft,
                        name.clone(),
                        self.source_name.clone(),
                        self.target_suite.clone(),
                    );
                    issue.target_version = Some(revision);
                    issues.push(issue);
                    continue;
                }

                if dak::package_is_removable(name, &self.target_suite).await? {
                    if !dak::remove_package(name, &self.target_suite, "cruft removal").await? {
                        let mut issue = SynchrotronIssue::new(
                            SynchrotronIssueKind::RemovalFailed,
                            name.clone(),
                            self.source_name.clone(),
                            self.target_suite.clone(),
                        );
                        issue.details = "dak rm failed".to_string();
                        issues.push(issue);
                    }
                } else {
                    let mut issue = SynchrotronIssue::new(
                        SynchrotronIssueKind::RemovalFailed,
                        name.clone(),
                        self.source_name.clone(),
                        self.target_suite.clone(),
                    );
                    issue.details = "can not be removed without breaking other packages".to_string();
                    issues.push(issue);
                }
            }
        }

        debug!("synchrotron: {} issue(s) for component {component}", issues.len());
        Ok((true, issues))
    }

    /// `ImportBinariesForSources`: for each architecture, bind the binaries
    /// `active_sources` declare into the target, per the binNMU/existing/
    /// distro-tag rules. Any `dak import` failure aborts the whole call.
    async fn import_binaries_for_sources(
        &self,
        architectures: &[String],
        active_sources: &[&SourcePackage],
        source_binaries: &HashMap<String, Vec<BinaryPackage>>,
        target_binaries: &HashMap<String, Vec<BinaryPackage>>,
        ignore_target_changes: bool,
    ) -> Result<bool> {
        for arch in architectures {
            let source_map = binary_map_for_arch(source_binaries, arch);
            let target_map = binary_map_for_arch(target_binaries, arch);
            let mut files = Vec::new();

            for source in active_sources {
                for declared in &source.binaries {
                    let name = declared.name.as_ref();

                    let Some(bin) = source_map.get(name) else {
                        if !target_map.contains_key(name) {
                            warn!("{}: no packages synced for binary {name}", source.name);
                        }
                        continue;
                    };

                    if bin.source_name.as_ref() != source.name.as_ref() {
                        continue;
                    }
                    let bin_source_version = bin.source_version.as_ref().unwrap_or(&bin.version);
                    if bin_source_version != &declared.version {
                        continue;
                    }

                    if let Some(existing) = target_map.get(name) {
                        if existing.version >= bin.version {
                            let revision = PackageVersion::debian_revision_str(&existing.version.to_string(), false);
                            if is_binnmu_revision(&revision) {
                                info!("{name}: rebuild upload found in target, skipping");
                            } else {
                                trace!("{name}: already present in target, skipping");
                            }
                            continue;
                        }

                        let revision = existing.version.to_string();
                        if is_locally_modified(&revision, &self.distro_tag) && !ignore_target_changes {
                            warn!("{name}: target has local modifications, skipping binary import");
                            continue;
                        }
                    }

                    files.push(bin.file.filename.clone());
                }
            }

            if !files.is_empty() && !dak::import_package_files(&self.target_suite, &files).await? {
                return Ok(false);
            }
        }

        Ok(true)
    }
}

/// Whether a Debian revision is a binNMU rebuild, of the form `XbY`: some
/// prefix (possibly ending in the conventional `+`) followed by `b` and a
/// purely numeric suffix.
fn is_binnmu_revision(revision: &str) -> bool {
    let Some(pos) = revision.rfind('b') else {
        return false;
    };
    let (prefix, rest) = revision.split_at(pos);
    let suffix = &rest[1..];
    if suffix.is_empty() || !suffix.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    prefix.ends_with('+') || prefix.chars().next_back().is_some_and(|c| c.is_ascii_digit())
}

/// Merge an architecture's binaries with the `all`-architecture ones and
/// reduce to "newest per name", as [Synchrotron::import_binaries_for_sources]
/// needs for both its source-repo and target-repo views.
fn binary_map_for_arch(by_arch: &HashMap<String, Vec<BinaryPackage>>, arch: &str) -> HashMap<String, BinaryPackage> {
    let mut combined: Vec<BinaryPackage> = Vec::new();
    if let Some(list) = by_arch.get(arch) {
        combined.extend(list.iter().cloned());
    }
    if let Some(all) = by_arch.get("all") {
        combined.extend(all.iter().cloned());
    }
    newest_per_name(&combined, |b| b.name.as_ref(), |b| &b.version)
}

#[cfg(test)]
mod test {
    use super::*;
    use laniakea_core::{
        architectures::Architecture,
        package::{ArchiveFile, DebType, PackageInfo, PackageName, Priority},
    };

    fn version(s: &str) -> PackageVersion {
        PackageVersion::try_from(s).unwrap()
    }

    fn pkg_name(s: &str) -> PackageName {
        PackageName::try_from(s).unwrap()
    }

    fn binary(name: &str, version_str: &str, source_name: &str, filename: &str) -> BinaryPackage {
        let arch = Architecture::new("amd64").unwrap();
        let mut bin = BinaryPackage::new("archive", pkg_name(name), version(version_str), arch).unwrap();
        bin.source_name = pkg_name(source_name);
        bin.file = ArchiveFile { filename: filename.to_string(), size: 0, sha256sum: String::new() };
        bin
    }

    fn source_with_binary(name: &str, version_str: &str) -> SourcePackage {
        let mut source = SourcePackage::new("upstream", pkg_name(name), version(version_str));
        source.binaries = vec![PackageInfo {
            deb_type: DebType::Deb,
            name: pkg_name(name),
            version: version(version_str),
            section: String::new(),
            priority: Priority::Unknown,
            architectures: Vec::new(),
        }];
        source
    }

    #[test]
    fn decide_sync_imports_when_absent() {
        assert_eq!(decide_sync(&version("1.0-1"), None, "tanglu"), SyncDecision::Import);
    }

    #[test]
    fn decide_sync_skips_when_target_ahead() {
        let target = version("2.0-1");
        assert_eq!(
            decide_sync(&version("1.0-1"), Some(&target), "tanglu"),
            SyncDecision::UpToDate
        );
    }

    #[test]
    fn decide_sync_flags_merge_required() {
        let target = version("1.9-0tanglu1");
        assert_eq!(
            decide_sync(&version("2.0-1"), Some(&target), "tanglu"),
            SyncDecision::MergeRequired
        );
    }

    #[test]
    fn cruft_candidate_excludes_native_and_new_in_distro() {
        assert!(!is_cruft_candidate("1", "tanglu", true));
        assert!(!is_cruft_candidate("0tanglu1", "tanglu", false));
        assert!(!is_cruft_candidate("1tanglu1", "tanglu", false));
        assert!(is_cruft_candidate("1", "tanglu", false));
    }

    #[test]
    fn binnmu_revision_matches_plain_and_plus_forms() {
        assert!(is_binnmu_revision("3b1"));
        assert!(is_binnmu_revision("0tanglu1+b2"));
        assert!(!is_binnmu_revision("3"));
        assert!(!is_binnmu_revision("beta1"));
    }

    #[tokio::test]
    async fn import_binaries_skips_rebuild_upload_binnmu() {
        // libx 1.2-3 source, libx 1.2-3b1 already in target: a binNMU rebuild,
        // so binary-binding must skip without touching dak.
        let engine = Synchrotron::new("upstream", "testing", "tanglu", HashSet::new());
        let source = source_with_binary("libx", "1.2-3");

        let mut source_binaries = HashMap::new();
        source_binaries.insert("amd64".to_string(), vec![binary("libx", "1.2-3", "libx", "pool/libx_1.2-3_amd64.deb")]);
        let mut target_binaries = HashMap::new();
        target_binaries.insert(
            "amd64".to_string(),
            vec![binary("libx", "1.2-3b1", "libx", "pool/libx_1.2-3b1_amd64.deb")],
        );

        let ok = engine
            .import_binaries_for_sources(&["amd64".to_string()], &[&source], &source_binaries, &target_binaries, false)
            .await
            .unwrap();
        assert!(ok);
    }

    #[tokio::test]
    async fn import_binaries_skips_locally_modified_target_unless_ignored() {
        let engine = Synchrotron::new("upstream", "testing", "tanglu", HashSet::new());
        let source = source_with_binary("libx", "2.0-1");

        let mut source_binaries = HashMap::new();
        source_binaries.insert("amd64".to_string(), vec![binary("libx", "2.0-1", "libx", "pool/libx_2.0-1_amd64.deb")]);
        let mut target_binaries = HashMap::new();
        target_binaries.insert(
            "amd64".to_string(),
            vec![binary("libx", "1.9-0tanglu1", "libx", "pool/libx_1.9-0tanglu1_amd64.deb")],
        );

        let ok = engine
            .import_binaries_for_sources(&["amd64".to_string()], &[&source], &source_binaries, &target_binaries, false)
            .await
            .unwrap();
        assert!(ok);
    }
}
