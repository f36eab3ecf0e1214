#![allow(dead_code)]

use kodo_engine::lang::LanguageProfile;
use kodo_engine::Config;
use kodo_sandbox::IsolatorConfig;
use kodo_utils::tracing::setup_tracing;

use std::fs;
use std::path::Path;
use std::sync::Once;
use std::time::{Duration, Instant};

pub fn init() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        dotenv::dotenv().ok();
        setup_tracing();
    });
}

/// Interpreted: the source is a shell script.
pub fn shell_profile() -> LanguageProfile {
    LanguageProfile {
        id: "shell".into(),
        aliases: vec!["sh".into()],
        source_extension: ".sh".into(),
        source_file_name: None,
        boilerplate_prefix: None,
        boilerplate_suffix: None,
        entry_point: None,
        compile: None,
        run: vec!["/bin/sh".into(), "{source}".into()],
        artifact_dir: false,
        run_in_artifact_dir: false,
        env: Vec::new(),
        memory_limit: None,
        enabled: true,
    }
}

/// Compiled: a syntax check stands in for the compiler, the artifact is a
/// copy of the source.
pub fn compiled_shell_profile() -> LanguageProfile {
    LanguageProfile {
        id: "shellc".into(),
        aliases: Vec::new(),
        source_extension: ".sh".into(),
        source_file_name: None,
        boilerplate_prefix: Some("set -u\n".into()),
        boilerplate_suffix: None,
        entry_point: None,
        compile: Some(vec![
            "/bin/sh".into(),
            "-c".into(),
            "/bin/sh -n \"$0\" && cp \"$0\" \"$1\"".into(),
            "{source}".into(),
            "{artifact}".into(),
        ]),
        run: vec!["/bin/sh".into(), "{artifact}".into()],
        artifact_dir: false,
        run_in_artifact_dir: false,
        env: Vec::new(),
        memory_limit: None,
        enabled: true,
    }
}

pub fn config(workspace_root: &Path) -> Config {
    let mut config = Config::default();
    config.executor.workspace_root = workspace_root.to_owned();
    config.executor.isolator = IsolatorConfig::Bare;
    config.executor.compile_timeout = 5000;
    config.executor.run_timeout = 1000;
    config.languages = vec![shell_profile(), compiled_shell_profile()];
    config
}

/// Number of workspaces left under the root.
pub fn leftovers(workspace_root: &Path) -> usize {
    fs::read_dir(workspace_root)
        .map(|dir| dir.count())
        .unwrap_or(0)
}

pub async fn wait_until(what: &str, mut cond: impl FnMut() -> bool) {
    let t0 = Instant::now();
    while !cond() {
        assert!(t0.elapsed() < Duration::from_secs(10), "timed out: {}", what);
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
