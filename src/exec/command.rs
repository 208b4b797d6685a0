// src/exec/command.rs

//! Warm-up actions backed by shell commands.

use std::process::Stdio;

use anyhow::{anyhow, Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::engine::Action;

/// Build an [`Action`] that runs `cmd` through the platform shell.
///
/// - Exit status 0 is success; anything else fails with the exit code.
/// - stdout/stderr are drained line by line into `debug` events.
/// - If the run is cancelled while the command is running, the child is
///   killed and the action fails.
pub fn shell_action(unit: impl Into<String>, cmd: impl Into<String>) -> Action {
    let unit = unit.into();
    let cmd = cmd.into();

    Action::new(move |cancel| {
        let unit = unit.clone();
        let cmd = cmd.clone();
        async move { run_command(&unit, &cmd, cancel).await }
    })
}

async fn run_command(unit: &str, cmd_line: &str, cancel: CancellationToken) -> Result<()> {
    info!(unit = %unit, cmd = %cmd_line, "starting warm-up command");

    // Build a shell command appropriate for the platform.
    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmd_line);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmd_line);
        c
    };

    cmd.stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning process for unit '{unit}'"))?;

    // Always consume output so pipe buffers don't fill up.
    if let Some(stdout) = child.stdout.take() {
        forward_lines(unit.to_string(), "stdout", stdout);
    }
    if let Some(stderr) = child.stderr.take() {
        forward_lines(unit.to_string(), "stderr", stderr);
    }

    tokio::select! {
        status_res = child.wait() => {
            let status = status_res
                .with_context(|| format!("waiting for process of unit '{unit}'"))?;
            let code = status.code().unwrap_or(-1);

            info!(
                unit = %unit,
                exit_code = code,
                success = status.success(),
                "warm-up command exited"
            );

            if status.success() {
                Ok(())
            } else {
                Err(anyhow!("command `{cmd_line}` exited with code {code}"))
            }
        }

        _ = cancel.cancelled() => {
            info!(unit = %unit, "cancellation requested; killing warm-up command");
            if let Err(e) = child.kill().await {
                warn!(unit = %unit, error = %e, "failed to kill child process on cancellation");
            }
            Err(anyhow!("command `{cmd_line}` cancelled"))
        }
    }
}

fn forward_lines<R>(unit: String, stream: &'static str, reader: R)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            debug!(unit = %unit, stream, "{}", line);
        }
    });
}
