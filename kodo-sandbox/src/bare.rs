use crate::capture::read_capped;
use crate::signal::GroupKiller;
use crate::{Isolator, Limits, RunOutcome};

use kodo_utils::os_cmd::OsCmd;

use std::io;
use std::os::unix::process::ExitStatusExt;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use nix::unistd::{self, Pid};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::task::{self, JoinHandle};
use tokio::time;
use tracing::{debug, warn};

/// How long pipe readers may keep draining after the process group is gone.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Plain subprocess with a wall-clock deadline. No resource limits, no
/// filesystem or network isolation. Meant for development and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct BareIsolator;

#[async_trait]
impl Isolator for BareIsolator {
    fn name(&self) -> &'static str {
        "bare"
    }

    async fn execute(&self, cmd: &OsCmd, stdin: &[u8], limits: &Limits) -> Result<RunOutcome> {
        spawn_and_wait(to_command(cmd), stdin, limits).await
    }
}

pub(crate) fn to_command(cmd: &OsCmd) -> Command {
    let mut command = Command::new(&cmd.bin);
    command.args(&cmd.args);
    command.env_clear();
    command.envs(cmd.env_pairs());
    if let Some(ref cwd) = cmd.cwd {
        command.current_dir(cwd);
    }
    command
}

pub(crate) async fn spawn_and_wait(
    mut command: Command,
    stdin: &[u8],
    limits: &Limits,
) -> Result<RunOutcome> {
    command.stdin(Stdio::piped());
    command.stdout(Stdio::piped());
    command.stderr(Stdio::piped());
    command.kill_on_drop(true);
    unsafe {
        command.pre_exec(|| {
            unistd::setpgid(Pid::from_raw(0), Pid::from_raw(0)).map_err(io::Error::from)
        });
    }

    let t0 = Instant::now();
    let mut child = command.spawn().context("failed to spawn child process")?;
    let mut killer = GroupKiller::new(child.id());
    debug!(pid = ?child.id(), "child spawned");

    let stdin_pipe = child.stdin.take().context("missing stdin pipe")?;
    let stdout_pipe = child.stdout.take().context("missing stdout pipe")?;
    let stderr_pipe = child.stderr.take().context("missing stderr pipe")?;

    let writer = {
        let input = stdin.to_vec();
        task::spawn(async move {
            let mut pipe = stdin_pipe;
            // the program may exit without reading its input
            let _ = pipe.write_all(&input).await;
            let _ = pipe.shutdown().await;
        })
    };
    let stdout_reader = task::spawn(read_capped(stdout_pipe, limits.output));
    let stderr_reader = task::spawn(read_capped(stderr_pipe, limits.output));

    let (status, timed_out) = match time::timeout(limits.wall_time, child.wait()).await {
        Ok(status) => (status.context("failed to wait child process")?, false),
        Err(_) => {
            debug!(wall_time = ?limits.wall_time, "wall time limit exceeded");
            killer.kill();
            let _ = child.start_kill();
            let status = child
                .wait()
                .await
                .context("failed to wait killed child process")?;
            (status, true)
        }
    };
    let real_time = t0.elapsed();

    // leftovers of the group would keep the pipes open; no-op after a timeout
    killer.kill();

    writer.abort();
    let (stdout, stdout_truncated) = join_reader(stdout_reader).await?;
    let (stderr, stderr_truncated) = join_reader(stderr_reader).await?;

    let (exit_code, signal) = decode_status(status);
    // a cpu time rlimit is a time limit too
    let timed_out = timed_out || signal == Some(libc::SIGXCPU);
    debug!(exit_code, ?signal, timed_out, ?real_time, "child finished");

    Ok(RunOutcome {
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
        exit_code,
        signal,
        timed_out,
        real_time: real_time.as_millis() as u64,
        stdout_truncated,
        stderr_truncated,
    })
}

async fn join_reader(
    mut handle: JoinHandle<io::Result<(Vec<u8>, bool)>>,
) -> Result<(Vec<u8>, bool)> {
    match time::timeout(DRAIN_GRACE, &mut handle).await {
        Ok(joined) => {
            let captured = joined.context("pipe reader panicked")?;
            captured.context("failed to read child output")
        }
        Err(_) => {
            warn!("pipe is still open after the process group was killed");
            handle.abort();
            Ok((Vec::new(), true))
        }
    }
}

fn decode_status(status: ExitStatus) -> (i32, Option<i32>) {
    match (status.code(), status.signal()) {
        (Some(code), _) => (code, None),
        (None, Some(sig)) => (128 + sig, Some(sig)),
        (None, None) => (-1, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn echoes_stdin() {
        let cmd = OsCmd::new("/bin/cat");
        let limits = Limits::new(Duration::from_secs(5));
        let outcome = BareIsolator.execute(&cmd, b"hello\n", &limits).await.unwrap();
        assert_eq!(outcome.stdout, "hello\n");
        assert!(outcome.is_success());
    }

    #[tokio::test]
    async fn signal_is_decoded() {
        let mut cmd = OsCmd::new("/bin/sh");
        cmd.arg("-c").arg("kill -9 $$");
        let limits = Limits::new(Duration::from_secs(5));
        let outcome = BareIsolator.execute(&cmd, b"", &limits).await.unwrap();
        assert_eq!(outcome.signal, Some(libc::SIGKILL));
        assert_eq!(outcome.exit_code, 128 + libc::SIGKILL);
        assert!(!outcome.timed_out);
    }
}
