// SPDX-License-Identifier: LGPL-3.0-or-later

//! # Tagfile parsing
//!
//! A cursor over RFC2822-style stanzaed files (`Packages`, `Sources`), plus
//! the two derived parsers needed by the repository layer: the `Package-List`
//! grammar embedded in `Sources` stanzas, and the `Checksums-Sha256` file
//! list grammar shared by both.

use std::path::{Path, PathBuf};

use log::warn;

use crate::{
    architectures::Architecture,
    error::ChecksumError,
    package::{ArchiveFile, DebType, PackageInfo, PackageName, Priority},
    version::PackageVersion,
};

/// A cursor over the stanzas of an RFC2822-style tagfile.
///
/// Stanzas are separated by one or more blank lines; within a stanza,
/// continuation lines (beginning with a single space) are folded into the
/// previous field's value with the leading space stripped and the newline
/// preserved.
#[derive(Debug)]
pub struct TagfileCursor<'a> {
    remaining: &'a str,
    current: Vec<&'a str>,
}

impl<'a> TagfileCursor<'a> {
    /// Wrap a decompressed tagfile's contents.
    pub fn new(data: &'a str) -> Self {
        Self {
            remaining: data,
            current: Vec::new(),
        }
    }

    /// Advance to the next stanza. Returns `false` once the input is exhausted.
    pub fn next_section(&mut self) -> bool {
        // skip any blank lines separating the previous stanza from this one
        let mut lines = self.remaining.lines();
        let mut stanza = Vec::new();
        let mut consumed = 0usize;
        let mut started = false;

        for line in lines.by_ref() {
            consumed += line.len() + 1;
            if line.is_empty() {
                if started {
                    break;
                }
                continue;
            }
            started = true;
            stanza.push(line);
        }

        self.remaining = if consumed >= self.remaining.len() {
            ""
        } else {
            &self.remaining[consumed..]
        };

        if stanza.is_empty() {
            self.current.clear();
            false
        } else {
            self.current = stanza;
            true
        }
    }

    /// Read a field's value from the current stanza, folding continuation
    /// lines. Returns `default` if the field is absent.
    pub fn read_field(&self, name: &str, default: &str) -> String {
        let prefix = format!("{name}:");
        let mut value = None;
        let mut lines = self.current.iter().peekable();

        while let Some(line) = lines.next() {
            if let Some(rest) = line.strip_prefix(&prefix) {
                let mut buf = rest.trim_start().to_string();
                while let Some(next) = lines.peek() {
                    if let Some(cont) = next.strip_prefix(' ') {
                        buf.push('\n');
                        buf.push_str(cont);
                        lines.next();
                    } else {
                        break;
                    }
                }
                value = Some(buf);
                break;
            }
        }

        value.unwrap_or_else(|| default.to_string())
    }
}

/// Parse a `Package-List` field body per Debian Policy: each non-empty line
/// is `name type section priority [key=value ...]`; a trailing `arch=a,b,c`
/// token populates architectures. Malformed lines are skipped with a warning.
pub fn parse_package_list(raw: &str, default_version: &PackageVersion) -> Vec<PackageInfo> {
    let mut result = Vec::new();

    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let mut fields = line.split_whitespace();
        let (Some(name), Some(deb_type), Some(section), Some(priority)) =
            (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            warn!("skipping malformed Package-List line: {line}");
            continue;
        };

        let name = match PackageName::try_from(name) {
            Ok(name) => name,
            Err(_) => {
                warn!("skipping Package-List line with invalid package name: {line}");
                continue;
            }
        };

        let mut architectures = Vec::new();
        for extra in fields {
            if let Some(archs) = extra.strip_prefix("arch=") {
                for arch in archs.split(',') {
                    match Architecture::new(arch) {
                        Ok(arch) => architectures.push(arch),
                        Err(_) => warn!("skipping invalid architecture '{arch}' in Package-List"),
                    }
                }
            }
        }

        result.push(PackageInfo {
            deb_type: DebType::deb_type_from_string(deb_type),
            name,
            version: default_version.clone(),
            section: section.to_string(),
            priority: Priority::package_priority_from_string(priority),
            architectures,
        });
    }

    result
}

/// Parse a `Checksums-Sha256` field body: three whitespace-separated
/// columns per line (`sha256sum`, `size`, `filename`). When `base_dir` is
/// given, `filename` is joined under it. An invalid size fails the whole
/// stanza, matching the spec's "invalid size strings fail the whole stanza"
/// rule; malformed lines (wrong column count) are skipped with a warning.
pub fn parse_checksums_list(raw: &str, base_dir: Option<&Path>) -> Result<Vec<ArchiveFile>, ChecksumError> {
    let mut result = Vec::new();

    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let columns: Vec<&str> = line.split_whitespace().collect();
        if columns.len() != 3 {
            warn!("skipping malformed Checksums-Sha256 line: {line}");
            continue;
        }

        let size: u64 = columns[1].parse()?;
        let filename = match base_dir {
            Some(dir) => path_to_string(&dir.join(columns[2])),
            None => columns[2].to_string(),
        };

        result.push(ArchiveFile {
            filename,
            size,
            sha256sum: columns[0].to_string(),
        });
    }

    Ok(result)
}

fn path_to_string(path: &PathBuf) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn cursor_reads_single_line_field() {
        let data = "Package: zathura\nVersion: 0.4.3-1\n";
        let mut cursor = TagfileCursor::new(data);
        assert!(cursor.next_section());
        assert_eq!(cursor.read_field("Package", ""), "zathura");
        assert_eq!(cursor.read_field("Version", ""), "0.4.3-1");
        assert_eq!(cursor.read_field("Missing", "default"), "default");
    }

    #[test]
    fn cursor_folds_continuation_lines() {
        let data = "Package: zathura\nDescription: short\n long line one\n long line two\n";
        let mut cursor = TagfileCursor::new(data);
        assert!(cursor.next_section());
        assert_eq!(
            cursor.read_field("Description", ""),
            "short\nlong line one\nlong line two"
        );
    }

    #[test]
    fn cursor_iterates_multiple_stanzas() {
        let data = "Package: a\n\nPackage: b\n\nPackage: c\n";
        let mut cursor = TagfileCursor::new(data);
        let mut names = Vec::new();
        while cursor.next_section() {
            names.push(cursor.read_field("Package", ""));
        }
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn package_list_parses_arch_token() {
        let version = PackageVersion::new(None, "0.4.3", Some("1")).unwrap();
        let infos = parse_package_list(
            "zathura-pdf-poppler deb viewers optional arch=amd64,arm64",
            &version,
        );
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].architectures.len(), 2);
        assert_eq!(infos[0].priority, Priority::Optional);
    }

    #[test]
    fn package_list_skips_malformed_lines() {
        let version = PackageVersion::new(None, "0.4.3", Some("1")).unwrap();
        let infos = parse_package_list("garbage line\nzathura deb viewers optional", &version);
        assert_eq!(infos.len(), 1);
    }

    #[test]
    fn checksums_list_parses_three_columns() {
        let files = parse_checksums_list(
            "deadbeef00000000000000000000000000000000000000000000000000000000 1234 zathura_0.4.3-1.dsc",
            None,
        )
        .unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].size, 1234);
        assert_eq!(files[0].filename, "zathura_0.4.3-1.dsc");
    }

    #[test]
    fn checksums_list_joins_base_dir() {
        let files = parse_checksums_list(
            "deadbeef 10 zathura_0.4.3-1.dsc",
            Some(Path::new("pool/main/z/zathura")),
        )
        .unwrap();
        assert_eq!(files[0].filename, "pool/main/z/zathura/zathura_0.4.3-1.dsc");
    }
}
