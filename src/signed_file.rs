// SPDX-License-Identifier: GPL-3.0-or-later

//! # `InRelease` signature verification
//!
//! `gpg --status-fd=3 ... --decrypt -` needs simultaneous I/O on stdin,
//! stdout, stderr and the status-fd pipe. A naive sequential read/write
//! deadlocks as soon as gpg fills one of those pipe buffers before the
//! caller drains it, so each descriptor gets its own reader thread,
//! mirroring the streaming design used for subprocess output in
//! [crate::tools::subprocess].

use std::{
    io::{pipe, Read, Write},
    path::Path,
    process::{Command, Stdio},
    thread,
};

use anyhow::{bail, Context, Result};
use command_fds::{CommandFdExt, FdMapping};
use log::debug;

/// Outcome of verifying an inline-signed (`InRelease`) or detached
/// (`Release`/`Release.gpg`) signature.
#[derive(Debug)]
pub struct VerificationResult {
    /// Whether gpg reported a valid signature from a trusted key.
    pub valid: bool,
    /// The inline-signed payload, with the signature stripped.
    pub payload: Vec<u8>,
    /// Raw `--status-fd` lines, for diagnostics.
    pub status_lines: Vec<String>,
}

/// Verify `data` (an `InRelease` file's contents) against the keyrings in
/// `keyring_paths`.
pub fn verify_inline(data: &[u8], keyring_paths: &[impl AsRef<Path>]) -> Result<VerificationResult> {
    if keyring_paths.is_empty() {
        bail!("no trusted keyrings configured");
    }

    let (status_read, status_write) = pipe().context("failed to create status-fd pipe")?;

    let mut command = Command::new("gpg");
    command
        .arg("--status-fd=3")
        .arg("--no-default-keyring")
        .arg("--batch")
        .arg("--no-tty")
        .arg("--trust-model")
        .arg("always")
        .arg("--fixed-list-mode");
    for keyring in keyring_paths {
        command.arg("--keyring").arg(keyring.as_ref());
    }
    command.arg("--decrypt").arg("-");

    command
        .fd_mappings(vec![FdMapping {
            parent_fd: status_write.try_clone()?.into(),
            child_fd: 3,
        }])
        .context("failed to map status-fd into child process")?;

    command
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    debug!("spawning gpg --decrypt with {} keyring(s)", keyring_paths.len());
    let mut child = command.spawn().context("failed to spawn gpg")?;
    drop(status_write);

    let mut stdin = child.stdin.take().expect("stdin was piped");
    let mut stdout = child.stdout.take().expect("stdout was piped");
    let mut stderr = child.stderr.take().expect("stderr was piped");
    let mut status_read = status_read;

    let (payload, stderr_buf, status_buf) = thread::scope(|scope| -> Result<_> {
        let writer = scope.spawn(move || -> Result<()> {
            stdin.write_all(data)?;
            Ok(())
        });
        let stdout_reader = scope.spawn(move || -> Result<Vec<u8>> {
            let mut buf = Vec::new();
            stdout.read_to_end(&mut buf)?;
            Ok(buf)
        });
        let stderr_reader = scope.spawn(move || -> Result<Vec<u8>> {
            let mut buf = Vec::new();
            stderr.read_to_end(&mut buf)?;
            Ok(buf)
        });
        let status_reader = scope.spawn(move || -> Result<Vec<u8>> {
            let mut buf = Vec::new();
            status_read.read_to_end(&mut buf)?;
            Ok(buf)
        });

        writer.join().expect("writer thread panicked")?;
        let payload = stdout_reader.join().expect("stdout thread panicked")?;
        let stderr_buf = stderr_reader.join().expect("stderr thread panicked")?;
        let status_buf = status_reader.join().expect("status thread panicked")?;
        Ok((payload, stderr_buf, status_buf))
    })?;

    let status = child.wait().context("failed to wait on gpg")?;
    let status_lines: Vec<String> = String::from_utf8_lossy(&status_buf)
        .lines()
        .map(str::to_string)
        .collect();
    let valid = status.success()
        && status_lines
            .iter()
            .any(|line| line.contains("GOODSIG") || line.contains("VALIDSIG"));

    if !status.success() {
        debug!("gpg exited non-zero: {}", String::from_utf8_lossy(&stderr_buf));
    }

    Ok(VerificationResult {
        valid,
        payload,
        status_lines,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn verify_inline_rejects_empty_keyring_list() {
        let keyrings: Vec<&Path> = Vec::new();
        let result = verify_inline(b"data", &keyrings);
        assert!(result.is_err());
    }
}
