use super::LanguageProfile;
use crate::config::Toolchains;

const PREFIX: &str = "# Python code starts here\n";

pub fn profile(toolchains: &Toolchains) -> LanguageProfile {
    LanguageProfile {
        id: "python".into(),
        aliases: vec!["py".into(), "python3".into()],
        source_extension: ".py".into(),
        source_file_name: None,
        boilerplate_prefix: Some(PREFIX.into()),
        boilerplate_suffix: None,
        entry_point: None,
        compile: None,
        run: vec![toolchains.python.clone(), "{source}".into()],
        artifact_dir: false,
        run_in_artifact_dir: false,
        env: vec!["PYTHONIOENCODING=utf-8".into()],
        memory_limit: None,
        enabled: true,
    }
}
