use std::sync::Once;

use kodo_sandbox::{Isolator, Limits, RunOutcome};
use kodo_utils::os_cmd::OsCmd;
use kodo_utils::tracing::setup_tracing;

use anyhow::Result;
use tracing::{debug, error};

pub fn init() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        dotenv::dotenv().ok();
        setup_tracing();
    });
}

pub fn sh(script: &str) -> OsCmd {
    let mut cmd = OsCmd::new("/bin/sh");
    cmd.arg("-c").arg(script);
    cmd.inherit_env("PATH");
    cmd
}

pub async fn run(
    isolator: &dyn Isolator,
    cmd: &OsCmd,
    stdin: &[u8],
    limits: &Limits,
) -> Result<RunOutcome> {
    debug!(isolator = isolator.name(), cmd = %cmd.display(), "sandbox args");
    match isolator.execute(cmd, stdin, limits).await {
        Ok(outcome) => {
            debug!(?outcome, "sandbox output");
            Ok(outcome)
        }
        Err(err) => {
            error!("sandbox error:\n{:?}", err);
            Err(err)
        }
    }
}
