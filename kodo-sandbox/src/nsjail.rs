use crate::bare::{spawn_and_wait, to_command};
use crate::{Isolator, Limits, RunOutcome};

use kodo_utils::os_cmd::OsCmd;

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

/// Runs the command inside an nsjail container.
///
/// nsjail puts the program into fresh namespaces (network included), so it
/// sees only the read-only system directories plus the working directory
/// of the command, which is mounted read-write.
#[derive(Debug, Clone)]
pub struct NsjailIsolator {
    pub bin: PathBuf,
    pub config: Option<PathBuf>,
    pub bind_ro: Vec<PathBuf>,
    pub uid: Option<u32>,
    pub gid: Option<u32>,
}

#[async_trait]
impl Isolator for NsjailIsolator {
    fn name(&self) -> &'static str {
        "nsjail"
    }

    async fn execute(&self, cmd: &OsCmd, stdin: &[u8], limits: &Limits) -> Result<RunOutcome> {
        let wrapped = self.wrap(cmd, limits);
        debug!("executing command\n{}\n", wrapped.display());
        spawn_and_wait(to_command(&wrapped), stdin, limits).await
    }
}

fn to_mb(bytes: u64) -> u64 {
    (bytes + (1 << 20) - 1) >> 20
}

impl NsjailIsolator {
    pub fn wrap(&self, cmd: &OsCmd, limits: &Limits) -> OsCmd {
        let mut jail = OsCmd::new(&self.bin);
        jail.inherit_env("PATH");

        jail.arg("--mode").arg("o");
        jail.arg("--quiet");

        if let Some(ref config) = self.config {
            jail.arg("--config").arg(config);
        } else {
            for dir in &self.bind_ro {
                if Path::new(dir).exists() {
                    jail.arg("--bindmount_ro").arg(dir);
                }
            }
        }

        if let Some(ref cwd) = cmd.cwd {
            jail.arg("--bindmount").arg(cwd);
            jail.arg("--cwd").arg(cwd);
        }

        if let Some(uid) = self.uid {
            jail.arg("--user").arg(uid.to_string());
        }
        if let Some(gid) = self.gid {
            jail.arg("--group").arg(gid.to_string());
        }

        // backstop behind the wall-clock deadline of the caller
        let time_limit = limits.wall_time.as_secs() + 1;
        jail.arg("--time_limit").arg(time_limit.to_string());

        if let Some(cpu_time) = limits.cpu_time {
            jail.arg("--rlimit_cpu").arg(cpu_time.to_string());
        }
        match limits.memory {
            Some(memory) => jail.arg("--rlimit_as").arg(to_mb(memory).to_string()),
            None => jail.arg("--rlimit_as").arg("max"),
        };
        if let Some(file_size) = limits.file_size {
            jail.arg("--rlimit_fsize").arg(to_mb(file_size).to_string());
        }
        if let Some(pids) = limits.pids {
            jail.arg("--rlimit_nproc").arg(pids.to_string());
        }

        for (k, v) in cmd.env_pairs() {
            let mut e: OsString = k;
            e.push("=");
            e.push(v);
            jail.arg("--env").arg(e);
        }

        jail.arg("--");
        jail.arg(&cmd.bin);
        jail.args(cmd.args.iter().cloned());
        jail
    }
}
