use crate::lang::LanguageProfile;
use crate::verdict::{self, TestResult};
use crate::workspace::Workspace;

use kodo_protocol::common::{Mode, TestCase};
use kodo_sandbox::{Isolator, Limits, RunOutcome};

use anyhow::Result;
use tracing::debug;

pub async fn run(
    isolator: &dyn Isolator,
    profile: &LanguageProfile,
    workspace: &Workspace,
    input: &str,
    limits: &Limits,
) -> Result<RunOutcome> {
    let cmd = profile.run_command(workspace)?;
    debug!("running\n{}\n", cmd.display());
    isolator.execute(&cmd, input.as_bytes(), limits).await
}

/// Runs the cases in order, one process each.
///
/// In submit mode the first failing case ends the loop, so later cases
/// have no result. Run mode always goes through every case.
#[tracing::instrument(skip_all, fields(lang = %profile.id, cases = cases.len()))]
pub async fn run_cases(
    isolator: &dyn Isolator,
    profile: &LanguageProfile,
    workspace: &Workspace,
    cases: &[TestCase],
    mode: Mode,
    limits: &Limits,
) -> Result<Vec<TestResult>> {
    let mut results = Vec::with_capacity(cases.len());
    for (index, case) in cases.iter().enumerate() {
        let outcome = run(isolator, profile, workspace, &case.input, limits).await?;
        let result = verdict::judge_case(case, outcome);
        debug!(
            index,
            verdict = %result.verdict,
            time = result.outcome.real_time,
            "test case finished"
        );

        let passed = result.passed;
        results.push(result);
        if !passed && mode == Mode::Submit {
            break;
        }
    }
    Ok(results)
}
