// SPDX-License-Identifier: LGPL-3.0-or-later

//! # Aggregated parse error taxonomy
//!
//! Each concern (versions, architectures, checksum lists) defines its own
//! closed, `thiserror`-derived error enum; [ParseError] aggregates them so
//! callers crossing module boundaries have a single error type to match on.

use thiserror::Error;

pub use crate::version::VersionError;

/// Failure parsing a `Checksums-Sha256`-style file list.
#[derive(Debug, Error)]
pub enum ChecksumError {
    /// A size column was not a valid unsigned integer.
    #[error("invalid size in checksums list: {0}")]
    InvalidSize(#[from] std::num::ParseIntError),
}

/// Parsing error aggregating the per-concern error enums defined across
/// this crate.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Given string is not a valid architecture.
    #[error("invalid architecture")]
    InvalidArchitecture,
    /// Given string is not a valid version.
    #[error("invalid version: {0}")]
    InvalidVersion(#[from] VersionError),
    /// Given string is not a valid checksums list.
    #[error("invalid checksums list: {0}")]
    InvalidChecksums(#[from] ChecksumError),
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn checksum_error_wraps_parse_int_error() {
        let err: Result<u64, _> = "not-a-number".parse();
        let checksum_err = ChecksumError::from(err.unwrap_err());
        assert!(matches!(checksum_err, ChecksumError::InvalidSize(_)));
    }

    #[test]
    fn parse_error_displays_inner_version_error() {
        let err = ParseError::InvalidVersion(VersionError::InvalidEpoch);
        assert!(err.to_string().contains("invalid version"));
    }
}
