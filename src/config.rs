// SPDX-License-Identifier: GPL-3.0-or-later

use std::{env, fs, path::PathBuf};

use anyhow::{Context, Result};
use indicatif::ProgressStyle;
use laniakea_core::config::BaseConfig;

const PROGRESS_CHARS: &str = "█  ";

pub(crate) fn default_progress_style() -> ProgressStyle {
    ProgressStyle::default_bar().progress_chars(PROGRESS_CHARS)
}

/// Resolve `base-config.json`: `/etc/laniakea/base-config.json` first, then
/// a path relative to the running executable (`../data/base-config.json`).
fn resolve_config_path(explicit: Option<&PathBuf>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.clone());
    }

    let system_path = PathBuf::from("/etc/laniakea/base-config.json");
    if system_path.exists() {
        return Ok(system_path);
    }

    let exe = env::current_exe().context("failed to determine executable path")?;
    let beside_exe = exe
        .parent()
        .map(|dir| dir.join("../data/base-config.json"))
        .context("executable has no parent directory")?;
    Ok(beside_exe)
}

/// Load and parse `base-config.json` from `explicit`, or the standard
/// two-location fallback when not given.
pub(crate) fn load_base_config(explicit: Option<&PathBuf>) -> Result<BaseConfig> {
    let path = resolve_config_path(explicit)?;
    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read configuration file '{}'", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse configuration file '{}'", path.display()))
}
