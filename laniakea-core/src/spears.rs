// SPDX-License-Identifier: LGPL-3.0-or-later

//! # Spears domain types
//!
//! Migration configuration. [SpearsExcuse] and the britney wire format live
//! in [crate::excuses]; the migration engine itself lives in the `laniakea`
//! binary crate's `spears` module.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Urgency/priority tier used to look up a minimum migration age in
/// [SpearsConfigEntry::delays].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum VersionPriority {
    /// Emergency fixes, minimal delay.
    Emergency,
    /// Critical fixes.
    Critical,
    /// High-urgency uploads.
    High,
    /// Medium-urgency uploads.
    Medium,
    /// Low-urgency uploads (the default).
    Low,
}

/// A hint recorded against a migration, as britney's hinter syntax expresses
/// it (`unblock`, `block`, `age-days`, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpearsHint {
    /// The hint text itself, e.g. `unblock zathura/0.4.3-2`.
    pub hint: String,
    /// Why the hint was given.
    pub reason: String,
    /// When the hint was recorded.
    pub date: DateTime<Utc>,
    /// Operator who gave the hint, if known.
    pub user: Option<String>,
}

/// Configuration for one `sourceSuites... -> targetSuite` migration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpearsConfigEntry {
    /// Source suites fused together as britney's input (non-empty).
    pub source_suites: Vec<String>,
    /// Suite packages migrate into.
    pub target_suite: String,
    /// Minimum age (in days) required per urgency tier before migration.
    pub delays: HashMap<VersionPriority, u32>,
    /// Hints active for this migration.
    pub hints: Vec<SpearsHint>,
}

impl SpearsConfigEntry {
    /// `sort(sourceSuites).join("+") + "-to-" + targetSuite`, this
    /// migration's workspace and excuse identifier.
    pub fn migration_id(&self) -> String {
        crate::excuses::migration_id(&self.source_suites, &self.target_suite)
    }

    /// Whether this entry fuses more than one source suite, requiring the
    /// "fake dists" synthesis step before britney can run.
    pub fn is_multi_source(&self) -> bool {
        self.source_suites.len() > 1
    }
}

/// One parsed line of britney's `HeidiResult` output: package name, version,
/// architecture, plus a fourth column some britney builds emit (e.g. a
/// faux/fake marker) that earlier tooling discarded but this one keeps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeidiLine {
    /// Binary package name.
    pub package: String,
    /// Version of the binary package.
    pub version: String,
    /// Architecture the binary package was built for.
    pub architecture: String,
    /// Fourth whitespace-separated column, if present.
    pub extra: Option<String>,
}

impl HeidiLine {
    /// Render back to the four-column, whitespace-separated `HeidiResult`
    /// line format.
    pub fn to_line(&self) -> String {
        match &self.extra {
            Some(extra) => format!("{} {} {} {extra}", self.package, self.version, self.architecture),
            None => format!("{} {} {}", self.package, self.version, self.architecture),
        }
    }
}

/// Parse one non-blank `HeidiResult` line. Returns `None` (and lets the
/// caller log a warning) if the token count is not exactly four.
pub fn parse_heidi_line(line: &str) -> Option<HeidiLine> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() != 4 {
        return None;
    }
    Some(HeidiLine {
        package: tokens[0].to_string(),
        version: tokens[1].to_string(),
        architecture: tokens[2].to_string(),
        extra: Some(tokens[3].to_string()),
    })
}

#[cfg(test)]
mod test {
    use super::*;

    fn entry(sources: &[&str], target: &str) -> SpearsConfigEntry {
        SpearsConfigEntry {
            source_suites: sources.iter().map(|s| s.to_string()).collect(),
            target_suite: target.to_string(),
            delays: HashMap::new(),
            hints: Vec::new(),
        }
    }

    #[test]
    fn migration_id_matches_sorted_join() {
        let e = entry(&["unstable", "experimental"], "testing");
        assert_eq!(e.migration_id(), "experimental+unstable-to-testing");
    }

    #[test]
    fn is_multi_source_detects_fan_in() {
        assert!(!entry(&["unstable"], "testing").is_multi_source());
        assert!(entry(&["unstable", "experimental"], "testing").is_multi_source());
    }

    #[test]
    fn heidi_line_parses_four_columns() {
        let line = parse_heidi_line("zathura 0.4.3-2 amd64 faux").unwrap();
        assert_eq!(line.package, "zathura");
        assert_eq!(line.extra.as_deref(), Some("faux"));
        assert_eq!(line.to_line(), "zathura 0.4.3-2 amd64 faux");
    }

    #[test]
    fn heidi_line_rejects_wrong_column_count() {
        assert!(parse_heidi_line("zathura 0.4.3-2 amd64").is_none());
        assert!(parse_heidi_line("zathura 0.4.3-2 amd64 faux extra").is_none());
    }
}
