// SPDX-License-Identifier: GPL-3.0-or-later

//! # Streaming subprocess primitive
//!
//! A naive `wait()` followed by reading stdout/stderr deadlocks as soon as
//! a child fills an unread pipe buffer. Every tool wrapper in this module
//! (`dak`, `britney`, `dose`, `git`) and [crate::signed_file]'s `gpg`
//! invocation goes through [run_streaming] instead, which drains stdout
//! and stderr concurrently with the child's own progress.

use std::process::Stdio;

use anyhow::{Context, Result};
use log::{debug, trace};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    process::Command,
};

/// Output captured from a subprocess run to completion.
#[derive(Debug)]
pub struct ToolOutput {
    /// Whether the process exited with status 0.
    pub success: bool,
    /// Raw exit code, if the process was not killed by a signal.
    pub status: Option<i32>,
    /// Everything written to stdout.
    pub stdout: Vec<u8>,
    /// Everything written to stderr.
    pub stderr: Vec<u8>,
}

impl ToolOutput {
    /// `stdout` decoded as UTF-8, lossily.
    pub fn stdout_str(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// `stderr` decoded as UTF-8, lossily.
    pub fn stderr_str(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Run `program` with `args`, optionally feeding `stdin`, draining stdout
/// and stderr concurrently so neither pipe can block the child.
pub async fn run_streaming(program: &str, args: &[&str], stdin: Option<&[u8]>) -> Result<ToolOutput> {
    debug!("spawning {program} {args:?}");

    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = command
        .spawn()
        .with_context(|| format!("failed to spawn '{program}'"))?;

    let mut child_stdout = child.stdout.take().expect("stdout was piped");
    let mut child_stderr = child.stderr.take().expect("stderr was piped");

    let write_stdin = async {
        if let (Some(data), Some(mut sink)) = (stdin, child.stdin.take()) {
            sink.write_all(data).await?;
        }
        Ok::<_, std::io::Error>(())
    };

    let read_stdout = async {
        let mut buf = Vec::new();
        child_stdout.read_to_end(&mut buf).await?;
        Ok::<_, std::io::Error>(buf)
    };

    let read_stderr = async {
        let mut buf = Vec::new();
        child_stderr.read_to_end(&mut buf).await?;
        Ok::<_, std::io::Error>(buf)
    };

    let (_, stdout, stderr) = tokio::try_join!(write_stdin, read_stdout, read_stderr)
        .with_context(|| format!("I/O with '{program}' failed"))?;

    let status = child
        .wait()
        .await
        .with_context(|| format!("failed to wait on '{program}'"))?;

    trace!("{program} exited with {status}");

    Ok(ToolOutput {
        success: status.success(),
        status: status.code(),
        stdout,
        stderr,
    })
}
