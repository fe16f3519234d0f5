// SPDX-License-Identifier: GPL-3.0-or-later

//! # Repository access
//!
//! Presents a uniform view over a local or remote archive mirror: fetch
//! (and verify) `InRelease`, fetch individual index files by checksum, and
//! stream the `Sources`/`Packages` indices into typed records.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use flate2::read::GzDecoder;
use laniakea_core::{
    architectures::Architecture,
    package::{ArchiveFile, BinaryPackage, PackageName, SourcePackage},
    release::Release,
    tagfile::{parse_checksums_list, parse_package_list, TagfileCursor},
    version::PackageVersion,
};
use log::{trace, warn};
use xz2::read::XzDecoder;

use laniakea::Downloader;

use crate::signed_file;

/// Whether the repository this reads from is local or fetched over HTTP(S).
#[derive(Debug, Clone)]
pub(crate) enum RepoLocation {
    /// A path on the local filesystem, already laid out as `dists/`/`pool/`.
    Local(PathBuf),
    /// A base URL, mirrored on demand into `cache_dir`.
    Remote { url: String, cache_dir: PathBuf },
}

/// A handle onto one archive mirror.
pub(crate) struct Repository {
    pub(crate) name: String,
    location: RepoLocation,
    downloader: Downloader,
    trusted: bool,
    keyrings: Vec<PathBuf>,
    release_cache: HashMap<String, Release>,
}

impl Repository {
    /// Construct a handle onto a repository, with the keyrings used to
    /// verify its `InRelease` files.
    pub(crate) fn new(
        name: impl Into<String>,
        location: RepoLocation,
        trusted: bool,
        keyrings: Vec<PathBuf>,
        force_download: bool,
    ) -> Self {
        Self {
            name: name.into(),
            location,
            downloader: Downloader::new(force_download),
            trusted,
            keyrings,
            release_cache: HashMap::new(),
        }
    }

    fn local_path(&self, relative: &str) -> PathBuf {
        match &self.location {
            RepoLocation::Local(root) => root.join(relative),
            RepoLocation::Remote { cache_dir, .. } => cache_dir.join(relative),
        }
    }

    async fn ensure_downloaded(&self, relative: &str) -> Result<PathBuf> {
        let dest = self.local_path(relative);
        if let RepoLocation::Remote { url, .. } = &self.location {
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            let source_url = format!("{}/{}", url.trim_end_matches('/'), relative);
            self.downloader
                .download_file(&source_url, dest.to_str().context("non-UTF-8 path")?)
                .await
                .with_context(|| format!("failed to fetch '{relative}' from {url}"))?;
        }
        Ok(dest)
    }

    /// Fetch and verify `dists/<suite>/InRelease`, memoized per suite.
    pub(crate) async fn repo_information(&mut self, suite: &str) -> Result<&Release> {
        if !self.release_cache.contains_key(suite) {
            let relative = format!("dists/{suite}/InRelease");
            let path = self.ensure_downloaded(&relative).await?;
            let raw = fs::read(&path)
                .with_context(|| format!("failed to read '{}'", path.display()))?;

            if !self.keyrings.is_empty() {
                let result = signed_file::verify_inline(&raw, &self.keyrings)?;
                if !result.valid {
                    bail!("InRelease signature verification failed for suite '{suite}'");
                }
            } else if !self.trusted {
                bail!("no keyring configured for untrusted repository '{}'", self.name);
            } else {
                warn!("repository '{}' is trusted and has no keyring; skipping signature check", self.name);
            }

            let release = laniakea_core::release::from_str(std::str::from_utf8(&raw)?)?;
            self.release_cache.insert(suite.to_string(), release);
        }
        Ok(self.release_cache.get(suite).expect("just inserted"))
    }

    /// Ensure `relative` is present locally, validating its checksum
    /// against the suite's `InRelease` manifest.
    pub(crate) async fn index_file(&mut self, suite: &str, relative: &str) -> Result<PathBuf> {
        let release = self.repo_information(suite).await?;
        let expected = release.files.get(relative).map(|info| info.hash);

        let path = self.ensure_downloaded(&format!("dists/{suite}/{relative}")).await?;

        match expected {
            Some(expected) => {
                let data = fs::read(&path)?;
                if sha256sum(&data) != hex::encode(expected) {
                    bail!("checksum mismatch for '{relative}' in suite '{suite}'");
                }
            }
            None if self.trusted && self.keyrings.is_empty() => {
                warn!("'{relative}' missing from InRelease; skipping validation (trusted, no keyring)");
            }
            None => bail!("'{relative}' not listed in InRelease for suite '{suite}'"),
        }

        Ok(path)
    }

    /// Stream `<component>/source/Sources.xz` into typed [SourcePackage]
    /// records.
    pub(crate) async fn source_packages(
        &mut self,
        suite: &str,
        component: &str,
    ) -> Result<Vec<SourcePackage>> {
        let relative = format!("{component}/source/Sources.xz");
        let path = self.index_file(suite, &relative).await?;
        let text = decompress_xz(&path)?;

        let mut result = Vec::new();
        let mut cursor = TagfileCursor::new(&text);
        while cursor.next_section() {
            let name = cursor.read_field("Package", "");
            if name.is_empty() {
                continue;
            }
            let Ok(name) = PackageName::try_from(name.as_str()) else {
                warn!("skipping Sources stanza with invalid package name '{name}'");
                continue;
            };
            let version_str = cursor.read_field("Version", "");
            let Ok(version) = PackageVersion::try_from(version_str.as_str()) else {
                warn!("skipping Sources stanza '{name}' with invalid version '{version_str}'");
                continue;
            };

            let package_list = cursor.read_field("Package-List", "");
            let binaries = parse_package_list(&package_list, &version);

            let checksums = cursor.read_field("Checksums-Sha256", "");
            let directory = cursor.read_field("Directory", "");
            let base_dir = (!directory.is_empty()).then(|| Path::new(directory.as_str()));
            let files = parse_checksums_list(&checksums, base_dir)?;

            let mut package = SourcePackage::new(self.name.clone(), name, version);
            package.component = component.to_string();
            package.suites = vec![suite.to_string()];
            package.binaries = binaries;
            package.files = files;
            package.directory = directory;
            result.push(package);
        }

        trace!("parsed {} source package(s) from {suite}/{component}", result.len());
        Ok(result)
    }

    /// Stream `<component>/binary-<arch>/Packages.xz` into typed
    /// [BinaryPackage] records. Stanzas with `Architecture: all` are
    /// skipped; fetch those separately with `arch = "all"`.
    pub(crate) async fn binary_packages(
        &mut self,
        suite: &str,
        component: &str,
        arch: &str,
    ) -> Result<Vec<BinaryPackage>> {
        let relative = format!("{component}/binary-{arch}/Packages.xz");
        let path = self.index_file(suite, &relative).await?;
        let text = decompress_xz(&path)?;
        let Ok(architecture) = Architecture::new(arch) else {
            bail!("invalid architecture '{arch}'");
        };

        let mut result = Vec::new();
        let mut cursor = TagfileCursor::new(&text);
        while cursor.next_section() {
            let name = cursor.read_field("Package", "");
            if name.is_empty() {
                continue;
            }
            let stanza_arch = cursor.read_field("Architecture", "");
            if stanza_arch != arch {
                continue;
            }
            let Ok(name) = PackageName::try_from(name.as_str()) else {
                warn!("skipping Packages stanza with invalid package name '{name}'");
                continue;
            };
            let version_str = cursor.read_field("Version", "");
            let Ok(version) = PackageVersion::try_from(version_str.as_str()) else {
                warn!("skipping Packages stanza '{name}' with invalid version '{version_str}'");
                continue;
            };
            let source_field = cursor.read_field("Source", name.as_str());
            let source_name = source_field.split_whitespace().next().unwrap_or(name.as_ref());
            let Ok(source_name) = PackageName::try_from(source_name) else {
                warn!("skipping Packages stanza '{name}' with invalid source name");
                continue;
            };

            let Ok(mut package) = BinaryPackage::new(self.name.clone(), name, version, architecture.clone())
            else {
                continue;
            };
            package.component = component.to_string();
            package.suites = vec![suite.to_string()];
            package.source_name = source_name;
            package.priority = laniakea_core::package::Priority::package_priority_from_string(
                &cursor.read_field("Priority", ""),
            );
            package.section = cursor.read_field("Section", "");
            result.push(package);
        }

        trace!(
            "parsed {} binary package(s) from {suite}/{component}/{arch}",
            result.len()
        );
        Ok(result)
    }

    /// Fetch binary packages across `architectures` plus the
    /// architecture-independent `all` pool, keyed by architecture, as the
    /// synchrotron engine's binary-binding step needs for both the source
    /// and target side.
    pub(crate) async fn binary_packages_by_arch(
        &mut self,
        suite: &str,
        component: &str,
        architectures: &[String],
    ) -> Result<HashMap<String, Vec<BinaryPackage>>> {
        let mut result = HashMap::new();
        for arch in architectures.iter().map(String::as_str).chain(std::iter::once("all")) {
            if result.contains_key(arch) {
                continue;
            }
            let packages = self.binary_packages(suite, component, arch).await?;
            result.insert(arch.to_string(), packages);
        }
        Ok(result)
    }

    /// Download (if remote) and optionally validate an [ArchiveFile]'s
    /// checksum, returning its local path.
    pub(crate) async fn file(&self, file: &ArchiveFile, validate: bool) -> Result<PathBuf> {
        let path = self.ensure_downloaded(&file.filename).await?;
        if validate {
            let data = fs::read(&path)?;
            let actual = sha256sum(&data);
            if actual != file.sha256sum {
                bail!("checksum mismatch for '{}'", file.filename);
            }
        }
        Ok(path)
    }
}

/// "Newest per name" reduction: for each name, keep the entry with the
/// largest version; ties (equal versions) go to the later item in
/// iteration order.
pub(crate) fn newest_per_name<T: Clone>(
    items: &[T],
    name_of: impl Fn(&T) -> &str,
    version_of: impl Fn(&T) -> &PackageVersion,
) -> HashMap<String, T> {
    let mut result: HashMap<String, T> = HashMap::new();
    for item in items {
        let name = name_of(item).to_string();
        match result.get(&name) {
            Some(existing) if version_of(existing) > version_of(item) => {}
            _ => {
                result.insert(name, item.clone());
            }
        }
    }
    result
}

fn decompress_xz(path: &Path) -> Result<String> {
    let file = fs::File::open(path).with_context(|| format!("failed to open '{}'", path.display()))?;
    let mut decoder = XzDecoder::new(file);
    let mut text = String::new();
    std::io::Read::read_to_string(&mut decoder, &mut text)
        .with_context(|| format!("failed to decompress '{}'", path.display()))?;
    Ok(text)
}

#[allow(dead_code)]
fn decompress_gz(path: &Path) -> Result<String> {
    let file = fs::File::open(path)?;
    let mut decoder = GzDecoder::new(file);
    let mut text = String::new();
    std::io::Read::read_to_string(&mut decoder, &mut text)?;
    Ok(text)
}

fn sha256sum(data: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn local_path_joins_relative_to_root() {
        let repo = Repository::new(
            "debian",
            RepoLocation::Local(PathBuf::from("/srv/mirror")),
            true,
            Vec::new(),
            false,
        );
        assert_eq!(
            repo.local_path("dists/unstable/InRelease"),
            PathBuf::from("/srv/mirror/dists/unstable/InRelease")
        );
    }

    #[test]
    fn newest_per_name_picks_largest_version_and_last_tie() {
        // third element is an arbitrary marker distinguishing otherwise-tied entries.
        let items = vec![
            ("zathura".to_string(), PackageVersion::try_from("0.4.1-1").unwrap(), "a"),
            ("zathura".to_string(), PackageVersion::try_from("0.4.3-1").unwrap(), "b"),
            ("zathura".to_string(), PackageVersion::try_from("0.4.2-1").unwrap(), "c"),
            ("foo".to_string(), PackageVersion::try_from("1.0-1").unwrap(), "first"),
            ("foo".to_string(), PackageVersion::try_from("1.0-1").unwrap(), "second"),
        ];
        let map = newest_per_name(&items, |(name, ..)| name.as_str(), |(_, version, _)| version);
        assert_eq!(map.get("zathura").unwrap().2, "b");
        assert_eq!(map.get("foo").unwrap().2, "second");
    }
}
