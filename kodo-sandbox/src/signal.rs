use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tracing::debug;

pub fn send_group_signal(pgid: Pid, signal: Signal) -> nix::Result<()> {
    let result = signal::killpg(pgid, signal);
    debug!(%pgid, %signal, ?result, "killpg");
    result
}

/// Kills a whole process group, once.
///
/// The child is spawned as the leader of a new group, so its pid is the
/// pgid. Descendants that stay in the group die with it. After the kill the
/// pgid is forgotten: once the group is empty the id may be reused.
pub struct GroupKiller {
    pgid: Option<Pid>,
}

impl GroupKiller {
    pub fn new(pid: Option<u32>) -> Self {
        Self {
            pgid: pid.map(|p| Pid::from_raw(p as libc::pid_t)),
        }
    }

    pub fn is_armed(&self) -> bool {
        self.pgid.is_some()
    }

    pub fn kill(&mut self) {
        if let Some(pgid) = self.pgid.take() {
            let _ = send_group_signal(pgid, Signal::SIGKILL);
        }
    }
}

impl Drop for GroupKiller {
    fn drop(&mut self) {
        self.kill();
    }
}
