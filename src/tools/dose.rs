// SPDX-License-Identifier: GPL-3.0-or-later

//! # `dose-debcheck`/`dose-builddebcheck` wrapper

use anyhow::Result;

use super::subprocess::run_streaming;

const GENERIC_FLAGS: &[&str] = &["--quiet", "--latest=1", "-e", "-f", "--summary"];

/// Run `dose-builddebcheck` with the background indices followed by the
/// foreground ones as positional arguments, returning the raw `report:`
/// YAML on stdout.
pub async fn run_builddebcheck(native_arch: &str, bg: &[String], fg: &[String]) -> Result<String> {
    let mut args: Vec<&str> = GENERIC_FLAGS.to_vec();
    args.push("--deb-emulate-sbuild");
    let native_flag = format!("--deb-native-arch={native_arch}");
    args.push(&native_flag);
    args.extend(bg.iter().map(String::as_str));
    args.extend(fg.iter().map(String::as_str));
    let output = run_streaming("dose-builddebcheck", &args, None).await?;
    Ok(output.stdout_str())
}

/// Run `dose-debcheck`, passing the background indices as `--bg=<file>` and
/// the foreground ones as `--fg=<file>`, returning the raw `report:` YAML on
/// stdout.
pub async fn run_debcheck(bg: &[String], fg: &[String]) -> Result<String> {
    let mut args: Vec<String> = GENERIC_FLAGS.iter().map(|s| s.to_string()).collect();
    args.extend(bg.iter().map(|f| format!("--bg={f}")));
    args.extend(fg.iter().map(|f| format!("--fg={f}")));
    let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
    let output = run_streaming("dose-debcheck", &arg_refs, None).await?;
    Ok(output.stdout_str())
}
