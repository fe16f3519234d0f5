// SPDX-License-Identifier: LGPL-3.0-or-later

//! # Deterministic content-addressed identifiers
//!
//! Archive entities are re-ingested every time the repository is scanned, so
//! their identifiers are derived from their content rather than handed out
//! by a sequence: re-importing the same source package twice yields the
//! same [Uuid]. This is a UUIDv5-shaped derivation (SHA-1 over a fixed
//! namespace, version/variant bits forced) rather than a call into
//! `Uuid::new_v5` against a single fixed namespace constant, so the input
//! string alone determines the identifier.

use sha1::{Digest, Sha1};
use uuid::Uuid;

/// Namespace the archive's identifiers are rooted in. Arbitrary but fixed:
/// changing it would silently re-key every stored entity.
const NAMESPACE: Uuid = Uuid::from_bytes([
    0x3c, 0x1a, 0x0e, 0x2f, 0x6b, 0x84, 0x4b, 0x21, 0x9b, 0x77, 0x1d, 0x4f, 0xab, 0x5c, 0x90, 0xd3,
]);

/// Derive a stable UUID from an arbitrary string, content-addressed over
/// `NAMESPACE`. Equal inputs always yield equal UUIDs.
pub fn sha1_uuid(input: &str) -> Uuid {
    let mut hasher = Sha1::new();
    hasher.update(NAMESPACE.as_bytes());
    hasher.update(input.as_bytes());
    let digest = hasher.finalize();

    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    // Force version 5 (name-based, SHA-1) and the RFC 4122 variant, exactly
    // as uuid::Uuid::new_v5 does to its own hash output.
    bytes[6] = (bytes[6] & 0x0f) | 0x50;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;
    Uuid::from_bytes(bytes)
}

/// Identifier for a source package: `repo::source/name/version`.
pub fn source_package_uuid(repo: &str, name: &str, version: &str) -> Uuid {
    sha1_uuid(&format!("{repo}::source/{name}/{version}"))
}

/// Stable-across-versions identifier for a source package, used as a
/// migration/build trigger key.
pub fn source_uuid(repo: &str, name: &str) -> Uuid {
    sha1_uuid(&format!("{repo}::{name}"))
}

/// Identifier for a binary package: `repo::name/version/arch`.
pub fn binary_package_uuid(repo: &str, name: &str, version: &str, arch: &str) -> Uuid {
    sha1_uuid(&format!("{repo}::{name}/{version}/{arch}"))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn same_input_yields_same_uuid() {
        assert_eq!(sha1_uuid("hello"), sha1_uuid("hello"));
    }

    #[test]
    fn different_input_yields_different_uuid() {
        assert_ne!(sha1_uuid("hello"), sha1_uuid("world"));
    }

    #[test]
    fn uuid_has_forced_version_and_variant_bits() {
        let id = sha1_uuid("main-repo::source/zathura/0.4.3-1");
        assert_eq!(id.get_version_num(), 5);
        assert_eq!(id.get_variant(), uuid::Variant::RFC4122);
    }

    #[test]
    fn source_uuid_is_stable_across_versions() {
        let a = source_uuid("main-repo", "zathura");
        let b = source_uuid("main-repo", "zathura");
        assert_eq!(a, b);
        assert_ne!(a, source_package_uuid("main-repo", "zathura", "0.4.3-1"));
    }

    #[test]
    fn binary_package_uuid_includes_architecture() {
        let amd64 = binary_package_uuid("main-repo", "zathura", "0.4.3-1", "amd64");
        let arm64 = binary_package_uuid("main-repo", "zathura", "0.4.3-1", "arm64");
        assert_ne!(amd64, arm64);
    }
}
