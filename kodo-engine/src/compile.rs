use crate::lang::LanguageProfile;
use crate::workspace::Workspace;

use kodo_sandbox::{Isolator, Limits, RunOutcome};

use anyhow::{Context, Result};
use tokio::fs;
use tracing::debug;

#[derive(Debug)]
pub enum CompileOutcome {
    /// Interpreted language, nothing to build.
    Skipped,
    Compiled(RunOutcome),
    Failed { message: String, outcome: RunOutcome },
}

/// Writes the prepared source into the workspace and builds it.
///
/// A compiler that fails or runs out of time is a [`CompileOutcome::Failed`],
/// not an `Err`.
#[tracing::instrument(skip_all, fields(lang = %profile.id))]
pub async fn compile(
    isolator: &dyn Isolator,
    profile: &LanguageProfile,
    workspace: &Workspace,
    source: &str,
    limits: &Limits,
) -> Result<CompileOutcome> {
    fs::write(&workspace.source_path, source)
        .await
        .with_context(|| {
            format!(
                "failed to write source: path = {}",
                workspace.source_path.display()
            )
        })?;

    let cmd = match profile.compile_command(workspace)? {
        Some(cmd) => cmd,
        None => return Ok(CompileOutcome::Skipped),
    };
    debug!("compiling\n{}\n", cmd.display());

    let outcome = isolator.execute(&cmd, b"", limits).await?;

    if outcome.timed_out {
        let message = format!(
            "Compilation timed out after {} ms.",
            limits.wall_time.as_millis()
        );
        return Ok(CompileOutcome::Failed { message, outcome });
    }

    if outcome.exit_code != 0 {
        let message = compiler_message(profile, &outcome);
        return Ok(CompileOutcome::Failed { message, outcome });
    }

    Ok(CompileOutcome::Compiled(outcome))
}

// javac writes diagnostics to stdout, gcc to stderr
fn compiler_message(profile: &LanguageProfile, outcome: &RunOutcome) -> String {
    let stderr = outcome.stderr.trim();
    let stdout = outcome.stdout.trim();
    if !stderr.is_empty() {
        stderr.to_owned()
    } else if !stdout.is_empty() {
        stdout.to_owned()
    } else {
        format!("{} compilation failed", profile.id)
    }
}
