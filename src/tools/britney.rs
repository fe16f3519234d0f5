// SPDX-License-Identifier: GPL-3.0-or-later

//! # `britney` wrapper
//!
//! `britney` is a Python tool this system only knows by its filesystem
//! contract: a config path, an input directory layout, and the `HeidiResult`,
//! `excuses.yaml` and `output.txt` outputs it produces.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use log::warn;

use super::{git, subprocess::run_streaming};

/// Directory britney's own git checkout lives in.
pub fn working_tree_dir() -> PathBuf {
    PathBuf::from("/srv/britney")
}

/// Refresh britney's working tree from git (`UpdateDist`). A no-op, with a
/// warning, if the working tree has not been checked out yet.
pub async fn update_dist() -> Result<()> {
    let dir = working_tree_dir();
    if !dir.exists() {
        warn!("britney working tree '{}' not present; skipping update", dir.display());
        return Ok(());
    }
    if !git::pull(&dir, None).await? {
        bail!("git pull failed for britney's working tree");
    }
    Ok(())
}

/// Run `britney` against `config_path`, returning whether it exited
/// successfully. Its actual results are read back from the output files it
/// writes under the workspace (`excuses.yaml`, `output.txt`, `HeidiResult`).
pub async fn run(config_path: &Path) -> Result<bool> {
    let config_path = config_path
        .to_str()
        .context("britney config path is not valid UTF-8")?;
    let output = run_streaming("britney", &["-c", config_path], None).await?;
    Ok(output.success)
}
