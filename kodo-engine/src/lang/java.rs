use super::LanguageProfile;
use crate::config::Toolchains;

use ubyte::ByteUnit;

const PREFIX: &str = "
import java.util.*;
class Main {
";

const SUFFIX: &str = "
}
";

/// Bare methods are wrapped into `class Main`. A source that declares the
/// class itself is compiled as is, and must live in `Main.java`.
pub fn profile(toolchains: &Toolchains) -> LanguageProfile {
    LanguageProfile {
        id: "java".into(),
        aliases: Vec::new(),
        source_extension: ".java".into(),
        source_file_name: Some("Main.java".into()),
        boilerplate_prefix: Some(PREFIX.into()),
        boilerplate_suffix: Some(SUFFIX.into()),
        entry_point: Some("class Main".into()),
        compile: Some(vec![
            toolchains.javac.clone(),
            "-J-Xms64m".into(),
            "-J-Xmx512m".into(),
            "-encoding".into(),
            "UTF-8".into(),
            "-d".into(),
            "{artifact_dir}".into(),
            "{source}".into(),
        ]),
        run: vec![
            toolchains.java.clone(),
            "-Xms64m".into(),
            "-Xmx512m".into(),
            "-cp".into(),
            "{artifact_dir}".into(),
            "Main".into(),
        ],
        artifact_dir: true,
        run_in_artifact_dir: true,
        env: Vec::new(),
        // the JVM needs headroom beyond -Xmx
        memory_limit: Some(ByteUnit::Gibibyte(2)),
        enabled: true,
    }
}
