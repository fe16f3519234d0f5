// SPDX-License-Identifier: GPL-3.0-or-later

//! # `git` wrapper, for image-build recipe checkouts.

use std::path::Path;

use anyhow::Result;

use super::subprocess::run_streaming;

/// `git clone <url> <dir>`.
pub async fn clone(url: &str, dir: &Path) -> Result<bool> {
    let dir = dir.to_string_lossy();
    let output = run_streaming("git", &["clone", url, &dir], None).await?;
    Ok(output.success)
}

/// `git pull [origin branch]` inside an already-cloned `dir`.
pub async fn pull(dir: &Path, branch: Option<&str>) -> Result<bool> {
    let mut args = vec!["-C"];
    let dir = dir.to_string_lossy();
    args.push(&dir);
    args.push("pull");
    if let Some(branch) = branch {
        args.push("origin");
        args.push(branch);
    }
    let output = run_streaming("git", &args, None).await?;
    Ok(output.success)
}
