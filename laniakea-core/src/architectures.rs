// SPDX-License-Identifier: LGPL-3.0-or-later

//! # Helpers to handle archive architectures
//!
//! Unlike a single release's fixed architecture list, an archive
//! configured at runtime can name architectures that are not known ahead
//! of time (a ports architecture, a vendor fork's own triplet, …). This
//! module therefore represents [Architecture] as a validated newtype
//! rather than a closed enum, and resolves the Debian Policy wildcard
//! aliases (`any`, `linux-any`, `any-arm`, …) against a small multiarch
//! tuple table instead of a hardcoded match.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{de, Deserialize, Serialize};

pub use crate::ParseError;

/// The pseudo-architecture used for architecture-independent packages.
pub const ALL: &str = "all";
/// The pseudo-architecture used for source packages.
pub const SOURCE: &str = "source";

/// An archive architecture name, e.g. `amd64`, `arm64`, or `all`.
///
/// Validated to be a non-empty, lowercase, alphanumeric-and-hyphen token,
/// matching the character set dpkg accepts for architecture names, but
/// otherwise open: any such token is a legal [Architecture].
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Architecture(String);

impl Architecture {
    /// Construct an [Architecture] from a name, validating its character set.
    pub fn new(name: &str) -> Result<Self, ParseError> {
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(ParseError::InvalidArchitecture);
        }
        Ok(Self(name.to_string()))
    }

    /// Return the architecture name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Return whether this is the `all` pseudo-architecture.
    pub fn is_all(&self) -> bool {
        self.0 == ALL
    }

    /// Return whether this is the `source` pseudo-architecture.
    pub fn is_source(&self) -> bool {
        self.0 == SOURCE
    }

    /// Return whether this is a "real" architecture, i.e. neither `all` nor `source`.
    pub fn is_concrete(&self) -> bool {
        !self.is_all() && !self.is_source()
    }
}

impl Display for Architecture {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<&str> for Architecture {
    type Error = ParseError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Architecture::new(value)
    }
}

impl FromStr for Architecture {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Architecture::new(s)
    }
}

impl Serialize for Architecture {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Architecture {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct ArchVisitor;

        impl<'de> de::Visitor<'de> for ArchVisitor {
            type Value = Architecture;

            fn expecting(&self, formatter: &mut Formatter) -> std::fmt::Result {
                write!(formatter, "an architecture name")
            }

            fn visit_str<E>(self, s: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Architecture::new(s).map_err(|_| de::Error::invalid_value(de::Unexpected::Str(s), &self))
            }
        }

        deserializer.deserialize_str(ArchVisitor)
    }
}

/// Release architectures for the current stable release. Kept as a
/// convenience default set for config templates; the archive model itself
/// never restricts to this list.
pub fn default_release_architectures() -> Vec<Architecture> {
    [
        "amd64", "arm64", "armel", "armhf", "i386", "ppc64el", "mipsel", "mips64el", "s390x",
    ]
    .iter()
    .map(|a| Architecture::new(a).expect("static architecture name is valid"))
    .collect()
}

/// `(libc, os, cpu)` tuple describing a concrete architecture's multiarch
/// identity, used to resolve wildcard patterns. Unrecognized architectures
/// default to a glibc/Linux tuple whose `cpu` is the architecture name
/// itself — a reasonable default for an archive that may define its own
/// ports architecture without teaching this table about it up front.
struct ArchTuple {
    libc: &'static str,
    os: &'static str,
    cpu: &'static str,
}

fn tuple_for(arch: &str) -> ArchTuple {
    match arch {
        "amd64" => ArchTuple { libc: "gnu", os: "linux", cpu: "amd64" },
        "i386" => ArchTuple { libc: "gnu", os: "linux", cpu: "i386" },
        "arm64" => ArchTuple { libc: "gnu", os: "linux", cpu: "arm64" },
        "armhf" => ArchTuple { libc: "gnueabihf", os: "linux", cpu: "arm" },
        "armel" => ArchTuple { libc: "gnueabi", os: "linux", cpu: "arm" },
        "mips64el" => ArchTuple { libc: "gnuabi64", os: "linux", cpu: "mips64el" },
        "mipsel" => ArchTuple { libc: "gnu", os: "linux", cpu: "mipsel" },
        "ppc64el" => ArchTuple { libc: "gnu", os: "linux", cpu: "ppc64el" },
        "ppc64" => ArchTuple { libc: "gnu", os: "linux", cpu: "ppc64" },
        "riscv64" => ArchTuple { libc: "gnu", os: "linux", cpu: "riscv64" },
        "s390x" => ArchTuple { libc: "gnu", os: "linux", cpu: "s390x" },
        "sh4" => ArchTuple { libc: "gnu", os: "linux", cpu: "sh4" },
        "sparc64" => ArchTuple { libc: "gnu", os: "linux", cpu: "sparc64" },
        "x32" => ArchTuple { libc: "gnux32", os: "linux", cpu: "amd64" },
        "kfreebsd-amd64" => ArchTuple { libc: "gnu", os: "kfreebsd", cpu: "amd64" },
        "kfreebsd-i386" => ArchTuple { libc: "gnu", os: "kfreebsd", cpu: "i386" },
        "hurd-i386" => ArchTuple { libc: "gnu", os: "hurd", cpu: "i386" },
        _ => ArchTuple { libc: "gnu", os: "linux", cpu: arch },
    }
}

/// Resolve an archive architecture wildcard (`any`, `linux-any`, `any-arm`,
/// `gnu-any-any`, `musl-any-any`, a concrete name, …) against a concrete
/// architecture.
///
/// `all` and `source` match only themselves; every other pattern is
/// resolved against the `(libc, os, cpu)` tuple of `arch`, right-aligned so
/// that a one-token pattern constrains only `cpu`, a two-token pattern
/// constrains `os-cpu`, and a three-token pattern constrains
/// `libc-os-cpu`. `any` in any position matches unconditionally.
pub fn arch_matches(pattern: &str, arch: &Architecture) -> bool {
    if pattern == arch.as_str() {
        return true;
    }
    if arch.is_all() || arch.is_source() {
        // pseudo-architectures only ever match themselves, even against "any".
        return false;
    }
    if pattern == "any" {
        return true;
    }
    if pattern == ALL || pattern == SOURCE {
        return false;
    }

    let tuple = tuple_for(arch.as_str());
    let fields = [tuple.libc, tuple.os, tuple.cpu];
    let parts: Vec<&str> = pattern.split('-').collect();
    if parts.len() > 3 || parts.is_empty() {
        return false;
    }

    let offset = fields.len() - parts.len();
    parts
        .iter()
        .enumerate()
        .all(|(i, part)| *part == "any" || *part == fields[offset + i])
}

#[cfg(test)]
mod test {
    use super::*;

    fn arch(s: &str) -> Architecture {
        Architecture::new(s).unwrap()
    }

    #[test]
    fn any_matches_all_concrete_architectures() {
        assert!(arch_matches("any", &arch("amd64")));
        assert!(arch_matches("any", &arch("arm64")));
        assert!(!arch_matches("any", &arch("all")));
        assert!(!arch_matches("any", &arch("source")));
    }

    #[test]
    fn all_matches_only_all() {
        assert!(arch_matches("all", &arch("all")));
        assert!(!arch_matches("all", &arch("amd64")));
    }

    #[test]
    fn linux_any_excludes_kfreebsd() {
        assert!(arch_matches("linux-any", &arch("amd64")));
        assert!(!arch_matches("linux-any", &arch("kfreebsd-amd64")));
    }

    #[test]
    fn any_arm_matches_arm_family() {
        assert!(arch_matches("any-arm", &arch("armhf")));
        assert!(arch_matches("any-arm", &arch("armel")));
        assert!(!arch_matches("any-arm", &arch("amd64")));
    }

    #[test]
    fn three_token_wildcard_constrains_libc() {
        assert!(arch_matches("gnu-any-any", &arch("amd64")));
        assert!(arch_matches("gnu-any-any", &arch("kfreebsd-amd64")));
        assert!(!arch_matches("musl-any-any", &arch("amd64")));
    }

    #[test]
    fn exact_name_is_always_a_match() {
        assert!(arch_matches("kfreebsd-amd64", &arch("kfreebsd-amd64")));
        assert!(arch_matches("source", &arch("source")));
    }

    #[test]
    fn invalid_architecture_name_rejected() {
        assert!(Architecture::new("").is_err());
        assert!(Architecture::new("AMD64").is_err());
        assert!(Architecture::new("amd 64").is_err());
    }
}
