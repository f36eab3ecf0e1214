use super::LanguageProfile;
use crate::config::Toolchains;

const PREFIX: &str = "\
#include <stdio.h>
#include <stdlib.h>
#include <string.h>
#include <math.h>
";

pub fn profile(toolchains: &Toolchains) -> LanguageProfile {
    LanguageProfile {
        id: "c".into(),
        aliases: Vec::new(),
        source_extension: ".c".into(),
        source_file_name: None,
        boilerplate_prefix: Some(PREFIX.into()),
        boilerplate_suffix: None,
        entry_point: None,
        compile: Some(vec![
            toolchains.gcc.clone(),
            "{source}".into(),
            "-O2".into(),
            "-o".into(),
            "{artifact}".into(),
            // libm is not linked by default
            "-lm".into(),
        ]),
        run: vec!["{artifact}".into()],
        artifact_dir: false,
        run_in_artifact_dir: false,
        env: Vec::new(),
        memory_limit: None,
        enabled: true,
    }
}
