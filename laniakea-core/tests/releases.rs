// SPDX-License-Identifier: LGPL-3.0-or-later

use std::{fs::File, io::BufReader, path::PathBuf};

use laniakea_core::release;

#[test]
fn parse_release_unstable() {
    parse_release("Release-archive-unstable");
}

#[test]
fn parse_release_testing() {
    parse_release("Release-archive-testing");
}

#[test]
fn parse_release_stable() {
    parse_release("Release-archive-stable");
}

fn parse_release(data_file: &str) {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let release_path = manifest_dir.join("tests").join("data").join(data_file);

    let release_file = File::open(release_path).expect("Release file opened.");
    let archive =
        release::from_reader(BufReader::new(release_file)).expect("Release file parse correctly.");

    assert!(!archive.architectures.is_empty());
    assert!(!archive.components.is_empty());
    assert!(!archive.origin.is_empty());
    assert!(!archive.label.is_empty());
    assert!(!archive.files.is_empty());
}
