#![deny(clippy::all)]

mod bare;
mod capture;
mod nsjail;
mod limited;
mod signal;

pub use self::bare::BareIsolator;
pub use self::nsjail::NsjailIsolator;
pub use self::limited::RlimitIsolator;

use kodo_utils::os_cmd::OsCmd;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Resource envelope for one process invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    pub wall_time: Duration,
    pub cpu_time: Option<u64>,  // seconds
    pub memory: Option<u64>,    // bytes
    pub file_size: Option<u64>, // bytes
    pub pids: Option<u64>,      // number
    pub output: usize,          // bytes kept per stream
}

impl Limits {
    pub fn new(wall_time: Duration) -> Self {
        Self {
            wall_time,
            cpu_time: None,
            memory: None,
            file_size: None,
            pids: None,
            output: 1024 * 1024,
        }
    }
}

/// Raw result of one process invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub signal: Option<i32>,
    pub timed_out: bool,

    pub real_time: u64, // milliseconds
    pub stdout_truncated: bool,
    pub stderr_truncated: bool,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        !self.timed_out && self.exit_code == 0
    }
}

/// Runs one command under a resource envelope.
///
/// An `Err` means the isolator itself failed (spawn failure, broken pipe
/// plumbing). Anything the program does, including crashing or running
/// out of time, is reported through [`RunOutcome`].
#[async_trait]
pub trait Isolator: Send + Sync {
    fn name(&self) -> &'static str;

    async fn execute(&self, cmd: &OsCmd, stdin: &[u8], limits: &Limits) -> Result<RunOutcome>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum IsolatorConfig {
    Bare,

    Rlimit {
        #[serde(default = "default_true")]
        isolate_network: bool,
    },

    Nsjail {
        #[serde(default = "default_nsjail_bin")]
        bin: PathBuf,

        #[serde(default)]
        config: Option<PathBuf>,

        #[serde(default = "default_bind_ro")]
        bind_ro: Vec<PathBuf>,

        #[serde(default)]
        uid: Option<u32>,

        #[serde(default)]
        gid: Option<u32>,
    },
}

impl Default for IsolatorConfig {
    fn default() -> Self {
        IsolatorConfig::Rlimit {
            isolate_network: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_nsjail_bin() -> PathBuf {
    "nsjail".into()
}

fn default_bind_ro() -> Vec<PathBuf> {
    ["/bin", "/sbin", "/etc", "/usr", "/lib", "/lib64"]
        .iter()
        .map(PathBuf::from)
        .collect()
}

pub fn build(config: &IsolatorConfig) -> Arc<dyn Isolator> {
    match config {
        IsolatorConfig::Bare => Arc::new(BareIsolator),
        IsolatorConfig::Rlimit { isolate_network } => Arc::new(RlimitIsolator {
            isolate_network: *isolate_network,
        }),
        IsolatorConfig::Nsjail {
            bin,
            config,
            bind_ro,
            uid,
            gid,
        } => Arc::new(NsjailIsolator {
            bin: bin.clone(),
            config: config.clone(),
            bind_ro: bind_ro.clone(),
            uid: *uid,
            gid: *gid,
        }),
    }
}
