// SPDX-License-Identifier: LGPL-3.0-or-later

//! # Version handling
//!
//! This module handles versions of Debian-style packages: parsing,
//! formatting, and ordering them according to the `[epoch:]upstream[-revision]`
//! grammar.
//!
//! ```
//! use laniakea_core::version::PackageVersion;
//!
//! let ver1 = PackageVersion::new(None, "1.0", Some("2")).expect("Failed to construct version");
//! assert_eq!(ver1.to_string(), "1.0-2");
//! assert!(!ver1.has_epoch());
//! assert!(!ver1.is_native());
//!
//! let ver2 = PackageVersion::new(Some(1), "0.2", Some("1.1")).expect("Failed to construct version");
//! assert_eq!(ver2.to_string(), "1:0.2-1.1");
//! assert!(ver2.has_epoch());
//! assert!(ver1 < ver2);
//! ```

use std::{
    cmp::Ordering,
    error::Error,
    fmt::{self, Display},
    hash::{Hash, Hasher},
};

use serde::{de, Deserialize, Serialize};

pub use crate::ParseError;

/// Version errors
#[derive(Debug)]
pub enum VersionError {
    /// Epoch is invalid
    InvalidEpoch,
    /// Upstream version is invalid
    InvalidUpstreamVersion,
    /// Debian revision is invalid
    InvalidDebianRevision,
}

impl Display for VersionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionError::InvalidEpoch => write!(f, "invalid epoch"),
            VersionError::InvalidUpstreamVersion => write!(f, "invalid upstream version"),
            VersionError::InvalidDebianRevision => write!(f, "invalid Debian revision"),
        }
    }
}

impl Error for VersionError {}

/// A version number of a Debian-style package.
///
/// Version numbers consists of three components:
/// * an optional epoch
/// * the upstream version
/// * an optional debian revision
#[derive(Debug, Clone)]
pub struct PackageVersion {
    /// The (optional) epoch
    pub(crate) epoch: Option<u32>,
    /// The upstream version
    pub(crate) upstream_version: String,
    /// The (optional) Debian revision
    pub(crate) debian_revision: Option<String>,
}

impl PackageVersion {
    /// Create a new version struct from the individual components.
    pub fn new(
        epoch: Option<u32>,
        upstream_version: &str,
        debian_revision: Option<&str>,
    ) -> Result<Self, VersionError> {
        if upstream_version.is_empty()
            || upstream_version
                .chars()
                .any(|c| !c.is_alphanumeric() && !".+-~".contains(c))
        {
            return Err(VersionError::InvalidUpstreamVersion);
        }

        if let Some(rev) = debian_revision {
            if rev.is_empty()
                || rev
                    .chars()
                    .any(|c| !c.is_alphanumeric() && !".+~".contains(c))
            {
                return Err(VersionError::InvalidDebianRevision);
            }
        }

        Ok(Self {
            epoch,
            upstream_version: String::from(upstream_version),
            debian_revision: debian_revision.map(String::from),
        })
    }

    /// Returns whether version is a native version, i.e., there is no revision.
    pub fn is_native(&self) -> bool {
        self.debian_revision.is_none()
    }

    /// Return whether the version has an epoch.
    pub fn has_epoch(&self) -> bool {
        self.epoch.is_some()
    }

    /// Return epoch of 0 if none set.
    pub fn epoch_or_0(&self) -> u32 {
        self.epoch.unwrap_or(0)
    }

    /// Return the Debian revision as used for comparison, i.e. `"0"` for a
    /// native version.
    fn revision_or_0(&self) -> &str {
        self.debian_revision.as_deref().unwrap_or("0")
    }

    /// Return the Debian revision of a version string.
    ///
    /// Returns the suffix after the last `-`. If no `-` is present, returns
    /// `version` itself when `full_for_native` is set, or an empty string
    /// otherwise.
    pub fn debian_revision_str(version: &str, full_for_native: bool) -> String {
        match version.rsplit_once('-') {
            Some((_, rev)) => rev.to_string(),
            None if full_for_native => version.to_string(),
            None => String::new(),
        }
    }

    /// Return whether this version has a binNMU version, i.e., ends in +bX for some integer X.
    pub fn has_binnmu_version(&self) -> bool {
        if let Some(revision) = &self.debian_revision {
            revision.contains("+b")
        } else {
            false
        }
    }

    /// Return binNMU version if available.
    pub fn binnmu_version(&self) -> Option<u32> {
        if let Some(revision) = &self.debian_revision {
            let mut split = revision.split("+b");
            split.next();
            if let Some(binnmu) = split.last() {
                return binnmu.parse::<u32>().ok();
            }
        }
        None
    }

    /// Obtain version without the binNMU version.
    pub fn without_binnmu_version(self) -> Self {
        if let Some(mut revision) = self.debian_revision {
            if let Some(index) = revision.rfind("+b") {
                revision.truncate(index);
            }
            Self {
                epoch: self.epoch,
                upstream_version: self.upstream_version,
                debian_revision: Some(revision),
            }
        } else {
            self
        }
    }
}

/// Compare two Debian versions, returning `-1`, `0` or `1` the way `dpkg
/// --compare-versions` would.
pub fn version_compare(a: &PackageVersion, b: &PackageVersion) -> i8 {
    match a.cmp(b) {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    }
}

/// Character ordering used by `verrevcmp`: `~` sorts before everything
/// (including the end of string), digits are handled separately and sort
/// before letters, and letters sort before everything else.
fn order(c: Option<u8>) -> i32 {
    match c {
        None => 0,
        Some(b'~') => -1,
        Some(c) if c.is_ascii_digit() => 0,
        Some(c) if c.is_ascii_alphabetic() => c as i32,
        Some(c) => c as i32 + 256,
    }
}

/// Compare the upstream-version or debian-revision part of two versions,
/// following the algorithm dpkg uses internally (`verrevcmp`).
fn verrevcmp(a: &str, b: &str) -> Ordering {
    let a = a.as_bytes();
    let b = b.as_bytes();
    let (mut ai, mut bi) = (0usize, 0usize);

    loop {
        // compare non-digit runs lexicographically by `order`
        while (ai < a.len() && !a[ai].is_ascii_digit())
            || (bi < b.len() && !b[bi].is_ascii_digit())
        {
            let ac = order(a.get(ai).copied());
            let bc = order(b.get(bi).copied());
            if ac != bc {
                return ac.cmp(&bc);
            }
            if ai < a.len() {
                ai += 1;
            }
            if bi < b.len() {
                bi += 1;
            }
        }

        // skip leading zeroes
        while ai < a.len() && a[ai] == b'0' {
            ai += 1;
        }
        while bi < b.len() && b[bi] == b'0' {
            bi += 1;
        }

        // compare digit runs numerically by length then value, remembering
        // the first differing digit in case the runs are the same length
        let mut first_diff = 0i32;
        while ai < a.len() && bi < b.len() && a[ai].is_ascii_digit() && b[bi].is_ascii_digit() {
            if first_diff == 0 {
                first_diff = a[ai] as i32 - b[bi] as i32;
            }
            ai += 1;
            bi += 1;
        }

        if ai < a.len() && a[ai].is_ascii_digit() {
            return Ordering::Greater;
        }
        if bi < b.len() && b[bi].is_ascii_digit() {
            return Ordering::Less;
        }
        if first_diff != 0 {
            return first_diff.cmp(&0);
        }

        if ai >= a.len() && bi >= b.len() {
            return Ordering::Equal;
        }
    }
}

impl PartialOrd for PackageVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PackageVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.epoch_or_0()
            .cmp(&other.epoch_or_0())
            .then_with(|| verrevcmp(&self.upstream_version, &other.upstream_version))
            .then_with(|| verrevcmp(self.revision_or_0(), other.revision_or_0()))
    }
}

impl PartialEq for PackageVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PackageVersion {}

impl TryFrom<&str> for PackageVersion {
    type Error = ParseError;

    fn try_from(mut value: &str) -> Result<Self, Self::Error> {
        let epoch = if let Some((epoch_str, new_value)) = value.split_once(':') {
            value = new_value;
            Some(
                epoch_str
                    .parse::<u32>()
                    .map_err(|_| ParseError::InvalidVersion(VersionError::InvalidEpoch))?,
            )
        } else {
            None
        };

        let debian_revision = if let Some((new_value, debian_revision_str)) = value.rsplit_once('-')
        {
            value = new_value;
            Some(debian_revision_str)
        } else {
            None
        };

        Self::new(epoch, value, debian_revision).map_err(ParseError::InvalidVersion)
    }
}

impl Display for PackageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(epoch) = self.epoch {
            write!(f, "{}:", epoch)?;
        }
        write!(f, "{}", self.upstream_version)?;
        if let Some(debian_revision) = &self.debian_revision {
            write!(f, "-{}", debian_revision)?;
        }
        Ok(())
    }
}

impl Serialize for PackageVersion {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for PackageVersion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct VersionVisitor;

        impl<'de> de::Visitor<'de> for VersionVisitor {
            type Value = PackageVersion;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                write!(formatter, "a version string")
            }

            fn visit_str<E>(self, s: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                match PackageVersion::try_from(s) {
                    Ok(version) => Ok(version),
                    Err(_) => Err(de::Error::invalid_value(de::Unexpected::Str(s), &self)),
                }
            }
        }

        deserializer.deserialize_str(VersionVisitor)
    }
}

impl Hash for PackageVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.epoch_or_0().hash(state);
        self.upstream_version.hash(state);
        self.debian_revision.hash(state);
    }
}

#[cfg(test)]
mod test {
    use super::{version_compare, PackageVersion};

    #[test]
    fn conversion() {
        let version = PackageVersion::try_from("2:1.0+dfsg-1").unwrap();
        assert_eq!(version.epoch, Some(2));
        assert_eq!(version.upstream_version, "1.0+dfsg");
        assert_eq!(version.debian_revision, Some("1".into()));
    }

    #[test]
    fn epoch_compare() {
        let version1 = PackageVersion::try_from("2.0-1").unwrap();
        let version2 = PackageVersion::try_from("2:1.0+dfsg-1").unwrap();

        assert!(version2.has_epoch());
        assert!(!version1.has_epoch());
        assert!(version1 < version2);
    }

    #[test]
    fn zero_epoch_compare() {
        let version1 = PackageVersion::try_from("2.0-1").unwrap();
        let version2 = PackageVersion::try_from("0:2.0-1").unwrap();

        assert_eq!(version1, version2);
    }

    #[test]
    fn invalid_epoch() {
        assert!(PackageVersion::try_from("-1:1.0-1").is_err());
        assert!(PackageVersion::try_from(":1.0-1").is_err());
        assert!(PackageVersion::try_from("a1:1.0-1").is_err());
    }

    #[test]
    fn invalid_upstream_version() {
        assert!(PackageVersion::try_from("-1").is_err());
        assert!(PackageVersion::try_from("0:-1").is_err());
    }

    #[test]
    fn multi_dash() {
        let version = PackageVersion::try_from("1.0-2-1").unwrap();
        assert_eq!(version.upstream_version, "1.0-2");
        assert_eq!(version.debian_revision, Some("1".into()));
    }

    #[test]
    fn binnum() {
        let version = PackageVersion::try_from("1.0-1").unwrap();
        assert!(!version.has_binnmu_version());
        assert_eq!(version.binnmu_version(), None);

        let version = PackageVersion::try_from("1.0-1+b1").unwrap();
        assert!(version.has_binnmu_version());
        assert_eq!(version.binnmu_version(), Some(1u32));
    }

    #[test]
    fn strip_binnum() {
        let version = PackageVersion::try_from("1.0-1+b1").unwrap();
        let version = version.without_binnmu_version();
        assert_eq!(version, PackageVersion::try_from("1.0-1").unwrap());

        assert!(!version.has_binnmu_version());
        assert_eq!(version.binnmu_version(), None);
    }

    #[test]
    fn tilde_sorts_before_everything() {
        let version1 = PackageVersion::try_from("1.0~beta1").unwrap();
        let version2 = PackageVersion::try_from("1.0").unwrap();
        assert!(version1 < version2);
    }

    #[test]
    fn numeric_runs_compare_by_value_not_length() {
        let version1 = PackageVersion::try_from("1.2").unwrap();
        let version2 = PackageVersion::try_from("1.10").unwrap();
        assert!(version1 < version2);
    }

    #[test]
    fn native_version_revision_defaults_to_zero() {
        let native = PackageVersion::try_from("1.0").unwrap();
        let revisioned = PackageVersion::try_from("1.0-0").unwrap();
        assert_eq!(version_compare(&native, &revisioned), 0);
    }

    #[test]
    fn comparison_is_antisymmetric() {
        let version1 = PackageVersion::try_from("1.0-1").unwrap();
        let version2 = PackageVersion::try_from("1.0-2").unwrap();
        assert_eq!(
            version_compare(&version1, &version2),
            -version_compare(&version2, &version1)
        );
    }

    #[test]
    fn comparison_is_transitive() {
        let a = PackageVersion::try_from("1.0-1").unwrap();
        let b = PackageVersion::try_from("1.0-2").unwrap();
        let c = PackageVersion::try_from("1.1-1").unwrap();
        assert!(a < b);
        assert!(b < c);
        assert!(a < c);
    }

    #[test]
    fn debian_revision_helper() {
        assert_eq!(PackageVersion::debian_revision_str("1.0-2", false), "2");
        assert_eq!(PackageVersion::debian_revision_str("1.0", false), "");
        assert_eq!(PackageVersion::debian_revision_str("1.0", true), "1.0");
    }
}
