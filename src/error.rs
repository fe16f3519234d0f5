// SPDX-License-Identifier: GPL-3.0-or-later

use thiserror::Error;

/// Top-level error taxonomy the CLI maps to exit codes.
///
/// Matching the administrative CLI's convention (documented in the
/// external tool's own man page): `1` usage error, `2` module init/run
/// failure, `4` configuration load failure.
#[derive(Debug, Error)]
pub enum LaniakeaError {
    /// The on-disk configuration file could not be loaded or parsed.
    #[error("failed to load configuration: {0}")]
    Config(String),
    /// A checksum mismatch or other integrity failure, fatal to the run.
    #[error("integrity check failed: {0}")]
    Integrity(String),
    /// A PGP signature was missing or invalid.
    #[error("signature verification failed: {0}")]
    Signature(String),
    /// An external tool (`dak`, `britney`, `dose-debcheck`, ...) exited non-zero.
    #[error("{tool} failed with status {status}: {stderr}")]
    Tool {
        /// Name of the tool that was invoked.
        tool: String,
        /// Its exit status.
        status: i32,
        /// Captured stderr output.
        stderr: String,
    },
    /// A transient network failure that exhausted its retry budget.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    /// A database-layer failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    /// A filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// A domain-model parse failure surfaced from `laniakea-core`.
    #[error("parse error: {0}")]
    Parse(#[from] laniakea_core::ParseError),
}

impl LaniakeaError {
    /// The exit code this error should produce for the administrative CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            LaniakeaError::Config(_) => 4,
            _ => 2,
        }
    }
}
