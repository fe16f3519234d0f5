// SPDX-License-Identifier: GPL-3.0-or-later

//! # `dak` wrapper
//!
//! `dak` is treated as an opaque external tool, invoked with its upstream
//! CLI (`import`, `rm`, `control-suite`).

use anyhow::{bail, Result};
use log::warn;

use super::subprocess::run_streaming;

/// Import package files into `suite`.
pub async fn import_package_files(suite: &str, files: &[String]) -> Result<bool> {
    let mut args = vec!["import", "-s", suite];
    args.extend(files.iter().map(String::as_str));
    let output = run_streaming("dak", &args, None).await?;
    if !output.success {
        warn!("dak import failed for suite {suite}: {}", output.stderr_str());
    }
    Ok(output.success)
}

/// Whether `package` is currently removable from `suite` without breaking
/// other packages' dependencies.
pub async fn package_is_removable(package: &str, suite: &str) -> Result<bool> {
    let output = run_streaming("dak", &["rm", "-n", "-s", suite, package], None).await?;
    Ok(output.success)
}

/// Remove `package` from `suite`.
pub async fn remove_package(package: &str, suite: &str, reason: &str) -> Result<bool> {
    let output = run_streaming(
        "dak",
        &["rm", "-R", "-s", suite, "-m", reason, package],
        None,
    )
    .await?;
    if !output.success {
        warn!("dak rm failed for {package} in {suite}: {}", output.stderr_str());
    }
    Ok(output.success)
}

/// Apply a `HeidiResult` listing to `suite` via `dak control-suite`.
pub async fn control_suite(suite: &str, heidi_result: &str) -> Result<()> {
    let output = run_streaming("dak", &["control-suite", "-s", suite, "--set"], Some(heidi_result.as_bytes())).await?;
    if !output.success {
        bail!("dak control-suite failed for {suite}: {}", output.stderr_str());
    }
    Ok(())
}

/// Feed a migration's processed `HeidiResult` back into `suite` via `dak
/// control-suite`.
pub async fn set_suite_to_britney_result(suite: &str, heidi_result: &str) -> Result<bool> {
    let output = run_streaming(
        "dak",
        &["control-suite", "-s", suite, "--set"],
        Some(heidi_result.as_bytes()),
    )
    .await?;
    if !output.success {
        warn!("dak control-suite failed for {suite}: {}", output.stderr_str());
    }
    Ok(output.success)
}

/// Directory dak exports per-upload urgency files into.
pub fn urgency_export_dir() -> std::path::PathBuf {
    std::path::PathBuf::from("/var/lib/dak/export/urgencies")
}
