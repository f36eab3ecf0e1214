use crate::bare::{spawn_and_wait, to_command};
use crate::{Isolator, Limits, RunOutcome};

use kodo_utils::os_cmd::OsCmd;

use std::io;

use anyhow::Result;
use async_trait::async_trait;
use nix::errno::Errno;
use nix::sched::{self, CloneFlags};
use rlimit::Resource;
use tracing::debug;

/// Subprocess constrained by rlimits, optionally cut off from the network
/// by a fresh network namespace.
#[derive(Debug, Clone, Copy)]
pub struct RlimitIsolator {
    pub isolate_network: bool,
}

#[derive(Debug, Clone, Copy)]
struct ChildLimits {
    cpu_time: Option<u64>,
    memory: Option<u64>,
    file_size: Option<u64>,
    pids: Option<u64>,
}

#[async_trait]
impl Isolator for RlimitIsolator {
    fn name(&self) -> &'static str {
        "rlimit"
    }

    async fn execute(&self, cmd: &OsCmd, stdin: &[u8], limits: &Limits) -> Result<RunOutcome> {
        let child_limits = ChildLimits {
            cpu_time: limits.cpu_time,
            memory: limits.memory,
            file_size: limits.file_size,
            pids: limits.pids,
        };
        let isolate_network = self.isolate_network;
        debug!(?child_limits, isolate_network, "rlimit isolator");

        let mut command = to_command(cmd);
        unsafe {
            command.pre_exec(move || setup_child(&child_limits, isolate_network));
        }
        spawn_and_wait(command, stdin, limits).await
    }
}

// runs between fork and exec
fn setup_child(limits: &ChildLimits, isolate_network: bool) -> io::Result<()> {
    if isolate_network {
        unshare_network()?;
    }

    if let Some(cpu_time) = limits.cpu_time {
        // SIGXCPU at the soft limit, SIGKILL one second later
        Resource::CPU.set(cpu_time, cpu_time + 1)?;
    }

    // RLIMIT_DATA counts writable private mappings only, so address space
    // reserved up front (JVM heaps, malloc arenas) does not trip it.
    if let Some(memory) = limits.memory {
        Resource::DATA.set(memory, memory)?;
    }

    if let Some(file_size) = limits.file_size {
        Resource::FSIZE.set(file_size, file_size)?;
    }

    if let Some(pids) = limits.pids {
        Resource::NPROC.set(pids, pids)?;
    }

    Resource::CORE.set(0, 0)?;

    Ok(())
}

fn unshare_network() -> io::Result<()> {
    match sched::unshare(CloneFlags::CLONE_NEWNET) {
        Ok(()) => Ok(()),
        // unprivileged: a user namespace grants the capability inside it
        Err(Errno::EPERM) => sched::unshare(CloneFlags::CLONE_NEWUSER | CloneFlags::CLONE_NEWNET)
            .map_err(io::Error::from),
        Err(errno) => Err(io::Error::from(errno)),
    }
}
