use super::LanguageProfile;
use crate::config::Toolchains;

const PREFIX: &str = "\
#include <iostream>
#include <vector>
#include <string>
#include <algorithm>
#include <utility>
#include <map>
#include <set>
#include <unordered_map>
#include <unordered_set>
#include <queue>
#include <stack>
#include <deque>
#include <cmath>
#include <limits>
#include <climits>
using namespace std;
";

pub fn profile(toolchains: &Toolchains) -> LanguageProfile {
    LanguageProfile {
        id: "cpp".into(),
        aliases: vec!["c++".into(), "cxx".into(), "cc".into()],
        source_extension: ".cpp".into(),
        source_file_name: None,
        boilerplate_prefix: Some(PREFIX.into()),
        boilerplate_suffix: None,
        entry_point: None,
        compile: Some(vec![
            toolchains.gxx.clone(),
            "{source}".into(),
            "-O2".into(),
            "-std=c++17".into(),
            "-o".into(),
            "{artifact}".into(),
        ]),
        run: vec!["{artifact}".into()],
        artifact_dir: false,
        run_in_artifact_dir: false,
        env: Vec::new(),
        memory_limit: None,
        enabled: true,
    }
}
