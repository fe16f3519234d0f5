// SPDX-License-Identifier: GPL-3.0-or-later

//! # Spears migration engine
//!
//! Drives `britney` over one or more source suites fused into a single
//! target suite, per a [SpearsConfigEntry], and turns its output back into
//! [SpearsExcuse]s.

use std::{
    collections::HashMap,
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use laniakea_core::{
    excuses,
    spears::{parse_heidi_line, SpearsConfigEntry},
    tagfile::TagfileCursor,
};
use log::{info, warn};
use xz2::{read::XzDecoder, write::XzEncoder};

use crate::tools::{britney, dak};

pub(crate) mod store;

/// britney.conf's `DELAY_*` keys, which are upper-cased regardless of how
/// [VersionPriority](laniakea_core::spears::VersionPriority) is spelled.
fn delay_key(priority: laniakea_core::spears::VersionPriority) -> &'static str {
    use laniakea_core::spears::VersionPriority;
    match priority {
        VersionPriority::Emergency => "EMERGENCY",
        VersionPriority::Critical => "CRITICAL",
        VersionPriority::High => "HIGH",
        VersionPriority::Medium => "MEDIUM",
        VersionPriority::Low => "LOW",
    }
}

/// Root directory all migration workspaces live under.
pub(crate) struct SpearsEngine {
    workspace_root: PathBuf,
    archive_root: PathBuf,
}

impl SpearsEngine {
    pub(crate) fn new(workspace_root: PathBuf, archive_root: PathBuf) -> Self {
        Self { workspace_root, archive_root }
    }

    fn workspace_dir(&self, migration_id: &str) -> PathBuf {
        self.workspace_root.join("spears").join(migration_id)
    }

    /// Regenerate `britney.conf` for `entry`'s workspace.
    pub(crate) async fn update_config(&self, entry: &SpearsConfigEntry) -> Result<PathBuf> {
        let migration_id = entry.migration_id();
        let workspace = self.workspace_dir(&migration_id);
        fs::create_dir_all(workspace.join("input"))?;
        fs::create_dir_all(workspace.join("output"))?;
        fs::create_dir_all(workspace.join("state"))?;

        let source_dists = if entry.is_multi_source() {
            workspace.join("input/dists").join(&migration_id.split("-to-").next().unwrap_or(&migration_id))
        } else {
            self.archive_root.join("dists").join(&entry.source_suites[0])
        };
        let target_dists = self.archive_root.join("dists").join(&entry.target_suite);

        let conf_path = workspace.join("britney.conf");
        let mut conf = fs::File::create(&conf_path)?;
        writeln!(conf, "TESTING = {}", target_dists.display())?;
        writeln!(conf, "UNSTABLE = {}", source_dists.display())?;
        writeln!(conf, "NONFREE = {}", target_dists.display())?;
        for (priority, days) in &entry.delays {
            writeln!(conf, "DELAY_{} = {days}", delay_key(*priority))?;
        }
        for hint in &entry.hints {
            writeln!(conf, "# hint: {} ({})", hint.hint, hint.reason)?;
        }
        conf.flush()?;

        britney::update_dist().await?;

        info!("updated britney config for migration {migration_id}");
        Ok(conf_path)
    }

    /// Fuse each source suite's indices into the workspace's fake dists
    /// directory. Only meaningful for multi-source migrations.
    async fn prepare_source_data(&self, entry: &SpearsConfigEntry, components: &[String], architectures: &[String]) -> Result<()> {
        if !entry.is_multi_source() {
            return Ok(());
        }
        let migration_id = entry.migration_id();
        let fake_name = entry.source_suites.join("+");
        let fake_dists = self.workspace_dir(&migration_id).join("input/dists").join(&fake_name);

        for component in components {
            for arch in architectures {
                for relative in [
                    format!("{component}/binary-{arch}/Packages.xz"),
                    format!("{component}/debian-installer/binary-{arch}/Packages.xz"),
                ] {
                    self.fuse_index(entry, &relative, &fake_dists).await?;
                }
            }
            self.fuse_index(entry, &format!("{component}/source/Sources.xz"), &fake_dists).await?;
        }

        let mut copied_release = false;
        for suite in &entry.source_suites {
            let candidate = self.archive_root.join("dists").join(suite).join("Release");
            if candidate.exists() {
                fs::create_dir_all(&fake_dists)?;
                fs::copy(&candidate, fake_dists.join("Release"))?;
                copied_release = true;
                break;
            }
        }
        if !copied_release {
            warn!("no source suite had a Release file to copy for migration {migration_id}");
        }

        Ok(())
    }

    async fn fuse_index(&self, entry: &SpearsConfigEntry, relative: &str, fake_dists: &Path) -> Result<()> {
        let mut found_any = false;
        let mut concatenated = Vec::new();
        for suite in &entry.source_suites {
            let path = self.archive_root.join("dists").join(suite).join(relative);
            if !path.exists() {
                continue;
            }
            found_any = true;
            let file = fs::File::open(&path)?;
            let mut decoder = XzDecoder::new(file);
            std::io::copy(&mut decoder, &mut concatenated)?;
        }

        if !found_any {
            bail!("no source suite provides '{relative}' for migration {}", entry.migration_id());
        }

        let dest = fake_dists.join(relative);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        let out = fs::File::create(&dest)?;
        let mut encoder = XzEncoder::new(out, 6);
        encoder.write_all(&concatenated)?;
        encoder.finish()?;
        Ok(())
    }

    /// Emit `faux-packages`, only for a single source suite where both ends
    /// have a parent suite: each parent's `Packages.xz` stanzas become a
    /// `(name, version, arch)` record carrying `Provides`/`Component`/`Architecture`.
    fn create_faux_packages(
        &self,
        entry: &SpearsConfigEntry,
        components: &[String],
        architectures: &[String],
        source_parent: Option<&str>,
        target_parent: Option<&str>,
    ) -> Result<()> {
        if entry.is_multi_source() {
            return Ok(());
        }
        let (Some(source_parent), Some(target_parent)) = (source_parent, target_parent) else {
            return Ok(());
        };

        let workspace = self.workspace_dir(&entry.migration_id());
        let faux_path = workspace.join("input/faux-packages");
        let mut out = fs::File::create(&faux_path).context("failed to create faux-packages")?;

        let mut parents = vec![source_parent];
        if target_parent != source_parent {
            parents.push(target_parent);
        }

        for parent in parents {
            for component in components {
                for arch in architectures {
                    let path = self
                        .archive_root
                        .join("dists")
                        .join(parent)
                        .join(component)
                        .join(format!("binary-{arch}"))
                        .join("Packages.xz");
                    if !path.exists() {
                        continue;
                    }

                    let file = fs::File::open(&path).with_context(|| format!("failed to open '{}'", path.display()))?;
                    let mut decoder = XzDecoder::new(file);
                    let mut text = String::new();
                    std::io::Read::read_to_string(&mut decoder, &mut text)
                        .with_context(|| format!("failed to decompress '{}'", path.display()))?;

                    let mut cursor = TagfileCursor::new(&text);
                    while cursor.next_section() {
                        let name = cursor.read_field("Package", "");
                        if name.is_empty() {
                            continue;
                        }
                        let version = cursor.read_field("Version", "");
                        let stanza_arch = cursor.read_field("Architecture", "");
                        let provides = cursor.read_field("Provides", "");

                        writeln!(out, "Package: {name}")?;
                        writeln!(out, "Version: {version}")?;
                        writeln!(out, "Architecture: {stanza_arch}")?;
                        if !provides.is_empty() {
                            writeln!(out, "Provides: {provides}")?;
                        }
                        writeln!(out, "Component: {component}")?;
                        writeln!(out)?;
                    }
                }
            }
        }

        Ok(())
    }

    /// Concatenate dak's exported urgency files into this workspace's state dir.
    fn collect_urgencies(&self, migration_id: &str) -> Result<()> {
        let export_dir = dak::urgency_export_dir();
        let dest_path = self.workspace_dir(migration_id).join("state/age-policy-urgencies");
        let mut dest = fs::File::create(&dest_path)?;

        let Ok(entries) = fs::read_dir(&export_dir) else {
            return Ok(());
        };
        for entry in entries.flatten() {
            let name = entry.file_name();
            if name.to_string_lossy().starts_with("install-urgencies") {
                let contents = fs::read(entry.path())?;
                dest.write_all(&contents)?;
            }
        }
        Ok(())
    }

    fn setup_dates(&self, migration_id: &str) -> Result<()> {
        let path = self.workspace_dir(migration_id).join("state/age-policy-dates");
        if !path.exists() {
            fs::File::create(&path)?;
        }
        Ok(())
    }

    fn setup_various(&self, entry: &SpearsConfigEntry) -> Result<()> {
        let state_dir = self.workspace_dir(&entry.migration_id()).join("state");
        let mut suites: Vec<&str> = entry.source_suites.iter().map(String::as_str).collect();
        suites.push(&entry.target_suite);
        for suite in suites {
            for (prefix, ext) in [("rc-bugs-", ""), ("piuparts-summary-", ".json")] {
                let path = state_dir.join(format!("{prefix}{suite}{ext}"));
                if !path.exists() {
                    fs::File::create(&path)?;
                }
            }
        }
        Ok(())
    }

    /// Post-process `output/target/HeidiResult` into the processed form dak
    /// expects, preserving each line's fourth column.
    fn process_heidi_result(&self, migration_id: &str) -> Result<String> {
        let workspace = self.workspace_dir(migration_id);
        let raw_path = workspace.join("output/target/HeidiResult");
        let raw = fs::read_to_string(&raw_path).with_context(|| format!("failed to read '{}'", raw_path.display()))?;

        let mut lines = Vec::new();
        for line in raw.lines() {
            if line.trim().is_empty() {
                continue;
            }
            match parse_heidi_line(line) {
                Some(parsed) => lines.push(parsed.to_line()),
                None => warn!("skipping malformed HeidiResult line in {migration_id}: '{line}'"),
            }
        }

        let processed = lines.join("\n");
        let processed_path = workspace.join("output/target/heidi/current");
        if let Some(parent) = processed_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&processed_path, &processed)?;
        Ok(processed)
    }

    /// Run one migration end to end, returning the excuses it produced.
    pub(crate) async fn run_migration_internal(
        &self,
        entry: &SpearsConfigEntry,
        components: &[String],
        architectures: &[String],
        source_parent: Option<&str>,
        target_parent: Option<&str>,
    ) -> Result<Option<Vec<excuses::SpearsExcuse>>> {
        let migration_id = entry.migration_id();
        let workspace = self.workspace_dir(&migration_id);
        let conf_path = workspace.join("britney.conf");
        if !conf_path.exists() {
            warn!("britney.conf missing for migration {migration_id}; configuration was never updated");
            return Ok(None);
        }

        self.prepare_source_data(entry, components, architectures).await?;
        self.create_faux_packages(entry, components, architectures, source_parent, target_parent)?;
        self.collect_urgencies(&migration_id)?;
        self.setup_dates(&migration_id)?;
        self.setup_various(entry)?;

        if !britney::run(&conf_path).await? {
            bail!("britney run failed for migration {migration_id}");
        }

        let processed = self.process_heidi_result(&migration_id)?;
        if !dak::set_suite_to_britney_result(&entry.target_suite, &processed).await? {
            bail!("dak failed to apply britney result for {}", entry.target_suite);
        }

        let excuses_path = workspace.join("output/target/excuses.yaml");
        let output_txt_path = workspace.join("output/target/output.txt");
        let excuses_raw = fs::read_to_string(&excuses_path).with_context(|| format!("failed to read '{}'", excuses_path.display()))?;
        let output_txt = fs::read_to_string(&output_txt_path).unwrap_or_default();
        let parsed = excuses::from_str(&excuses_raw)?;

        let excuses = parsed.into_spears_excuses(&migration_id, &entry.target_suite, &output_txt);
        Ok(Some(excuses))
    }

    /// Find the config entry for `source_suites_joined -> target_suite` and
    /// run it, mapping multi-source excuses back to their originating suite.
    pub(crate) async fn run_migration(
        &self,
        entries: &[SpearsConfigEntry],
        source_suites_joined: &str,
        target_suite: &str,
        components: &[String],
        architectures: &[String],
        pkg_source_suite_map: &HashMap<String, String>,
    ) -> Result<(bool, Vec<excuses::SpearsExcuse>)> {
        let Some(entry) = entries
            .iter()
            .find(|e| e.source_suites.join("+") == source_suites_joined && e.target_suite == target_suite)
        else {
            bail!("no such migration: {source_suites_joined} -> {target_suite}");
        };

        let result = self
            .run_migration_internal(entry, components, architectures, None, None)
            .await?;

        let Some(mut excuses) = result else {
            return Ok((false, Vec::new()));
        };

        if entry.is_multi_source() {
            for excuse in &mut excuses {
                let key = format!("{}/{}", excuse.source_package, excuse.new_version);
                excuse.source_suite = pkg_source_suite_map.get(&key).cloned();
            }
        }

        Ok((true, excuses))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use laniakea_core::spears::VersionPriority;
    use std::collections::HashMap;

    fn entry() -> SpearsConfigEntry {
        SpearsConfigEntry {
            source_suites: vec!["unstable".to_string()],
            target_suite: "testing".to_string(),
            delays: HashMap::from([(VersionPriority::Low, 10)]),
            hints: Vec::new(),
        }
    }

    #[tokio::test]
    async fn update_config_writes_britney_conf() {
        let tmp = tempfile::tempdir().unwrap();
        let engine = SpearsEngine::new(tmp.path().join("workspace"), tmp.path().join("archive"));
        let conf_path = engine.update_config(&entry()).await.unwrap();
        assert!(conf_path.exists());
        let contents = fs::read_to_string(&conf_path).unwrap();
        assert!(contents.contains("TESTING ="));
    }

    #[tokio::test]
    async fn update_config_writes_uppercase_delay_keys() {
        let tmp = tempfile::tempdir().unwrap();
        let engine = SpearsEngine::new(tmp.path().join("workspace"), tmp.path().join("archive"));
        let mut e = entry();
        e.delays.insert(VersionPriority::High, 2);
        let conf_path = engine.update_config(&e).await.unwrap();
        let contents = fs::read_to_string(&conf_path).unwrap();
        assert!(contents.contains("DELAY_LOW = 10"));
        assert!(contents.contains("DELAY_HIGH = 2"));
    }

    #[tokio::test]
    async fn create_faux_packages_skipped_for_multi_source() {
        let tmp = tempfile::tempdir().unwrap();
        let engine = SpearsEngine::new(tmp.path().join("workspace"), tmp.path().join("archive"));
        let mut multi = entry();
        multi.source_suites.push("experimental".to_string());
        engine.update_config(&multi).await.unwrap();
        engine
            .create_faux_packages(&multi, &["main".to_string()], &["amd64".to_string()], Some("parent"), Some("parent"))
            .unwrap();
        let faux_path = engine.workspace_dir(&multi.migration_id()).join("input/faux-packages");
        assert!(!faux_path.exists());
    }

    #[tokio::test]
    async fn create_faux_packages_reads_parent_packages_index() {
        let tmp = tempfile::tempdir().unwrap();
        let engine = SpearsEngine::new(tmp.path().join("workspace"), tmp.path().join("archive"));
        let e = entry();
        engine.update_config(&e).await.unwrap();

        let index_dir = tmp.path().join("archive/dists/parent/main/binary-amd64");
        fs::create_dir_all(&index_dir).unwrap();
        let raw = "Package: zathura\nVersion: 0.4.3-1\nArchitecture: amd64\nProvides: pdf-viewer\n\n";
        let out = fs::File::create(index_dir.join("Packages.xz")).unwrap();
        let mut encoder = XzEncoder::new(out, 6);
        encoder.write_all(raw.as_bytes()).unwrap();
        encoder.finish().unwrap();

        engine
            .create_faux_packages(&e, &["main".to_string()], &["amd64".to_string()], Some("parent"), Some("parent"))
            .unwrap();

        let faux_path = engine.workspace_dir(&e.migration_id()).join("input/faux-packages");
        let contents = fs::read_to_string(&faux_path).unwrap();
        assert!(contents.contains("Package: zathura"));
        assert!(contents.contains("Version: 0.4.3-1"));
        assert!(contents.contains("Provides: pdf-viewer"));
        assert!(contents.contains("Component: main"));
    }
}
