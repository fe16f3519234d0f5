// SPDX-License-Identifier: LGPL-3.0-or-later

use std::{fs::File, io::BufReader, path::PathBuf};

use laniakea_core::excuses;

#[test]
fn parse_excuses_yaml() {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let excuses_path = manifest_dir
        .join("tests")
        .join("data")
        .join("excuses-sample.yaml");
    let excuses_file = File::open(excuses_path).expect("excuses file exists");
    let parsed = excuses::from_reader(BufReader::new(excuses_file)).expect("excuses file parsed");

    assert!(!parsed.sources.is_empty());
    for source in &parsed.sources {
        assert!(source.item_name.contains(source.source.as_str()));
    }

    let spears = parsed.into_spears_excuses("unstable-to-testing", "testing", "");
    assert_eq!(spears.len(), 2);
    assert!(spears.iter().any(|e| e.source_package == "zathura"));
}
