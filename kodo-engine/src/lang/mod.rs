mod c;
mod cpp;
mod java;
mod python;

use crate::config::{Config, Toolchains};
use crate::error::EngineError;
use crate::workspace::Workspace;

use kodo_utils::os_cmd::OsCmd;

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use ubyte::ByteUnit;
use validator::Validate;

/// How to turn source text in one language into a running program.
///
/// Command templates are argv lists. The first element is the program,
/// and every element may contain the placeholders `{source}`, `{artifact}`,
/// `{artifact_dir}` and `{workspace}`, which are replaced with paths inside
/// the job's workspace.
#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
pub struct LanguageProfile {
    #[validate(length(min = 1, max = 32))]
    pub id: String,

    #[serde(default)]
    pub aliases: Vec<String>,

    #[validate(length(min = 1))]
    pub source_extension: String,

    /// Overrides `main{source_extension}`, e.g. for languages that tie the
    /// file name to the entry class.
    #[serde(default)]
    pub source_file_name: Option<String>,

    #[serde(default)]
    pub boilerplate_prefix: Option<String>,

    #[serde(default)]
    pub boilerplate_suffix: Option<String>,

    /// Wrapping is skipped when the source already contains this.
    #[serde(default)]
    pub entry_point: Option<String>,

    #[serde(default)]
    pub compile: Option<Vec<String>>,

    #[validate(length(min = 1))]
    pub run: Vec<String>,

    /// Whether the compiler writes into a dedicated artifact directory.
    #[serde(default)]
    pub artifact_dir: bool,

    #[serde(default)]
    pub run_in_artifact_dir: bool,

    /// `K=V` entries, or a bare `K` to pass the variable through.
    #[serde(default)]
    pub env: Vec<String>,

    /// Replaces the executor's memory limit for this language.
    #[serde(default)]
    pub memory_limit: Option<ByteUnit>,

    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl LanguageProfile {
    pub fn is_compiled(&self) -> bool {
        self.compile.is_some()
    }

    pub fn source_file_name(&self) -> String {
        match self.source_file_name {
            Some(ref name) => name.clone(),
            None => format!("main{}", self.source_extension),
        }
    }

    pub fn compile_command(&self, workspace: &Workspace) -> Result<Option<OsCmd>> {
        match self.compile {
            Some(ref template) => {
                let cmd = self.expand(template, workspace, &workspace.root)?;
                Ok(Some(cmd))
            }
            None => Ok(None),
        }
    }

    pub fn run_command(&self, workspace: &Workspace) -> Result<OsCmd> {
        let cwd = match workspace.artifact_dir {
            Some(ref dir) if self.run_in_artifact_dir => dir.as_path(),
            _ => workspace.root.as_path(),
        };
        self.expand(&self.run, workspace, cwd)
    }

    fn expand(&self, template: &[String], workspace: &Workspace, cwd: &Path) -> Result<OsCmd> {
        let (bin, args) = template
            .split_first()
            .with_context(|| format!("empty command template: lang = {}", self.id))?;

        let artifact_dir = workspace.artifact_dir.as_ref().unwrap_or(&workspace.root);
        let vars = [
            ("{source}", path_str(&workspace.source_path)?),
            ("{artifact}", path_str(&workspace.artifact_path)?),
            ("{artifact_dir}", path_str(artifact_dir)?),
            ("{workspace}", path_str(&workspace.root)?),
        ];
        let subst = |s: &str| {
            vars.iter()
                .fold(s.to_owned(), |acc, &(k, v)| acc.replace(k, v))
        };

        let mut cmd = OsCmd::new(subst(bin));
        cmd.args(args.iter().map(|a| subst(a)));
        cmd.inherit_env("PATH");
        for e in &self.env {
            if e.contains('=') {
                cmd.env.push(e.into());
            } else {
                cmd.inherit_env(e);
            }
        }
        cmd.current_dir(cwd);
        Ok(cmd)
    }
}

fn path_str(path: &Path) -> Result<&str> {
    path.to_str()
        .with_context(|| format!("non utf-8 path: {}", path.display()))
}

pub fn builtin_profiles(toolchains: &Toolchains) -> Vec<LanguageProfile> {
    vec![
        cpp::profile(toolchains),
        c::profile(toolchains),
        python::profile(toolchains),
        java::profile(toolchains),
    ]
}

/// Immutable id/alias to profile table, built once per engine.
#[derive(Debug, Default)]
pub struct LanguageRegistry {
    profiles: BTreeMap<String, Arc<LanguageProfile>>,
    aliases: HashMap<String, String>,
}

impl LanguageRegistry {
    pub fn new(profiles: impl IntoIterator<Item = LanguageProfile>) -> Result<Self> {
        let mut registry = Self::default();
        for mut profile in profiles {
            profile
                .validate()
                .with_context(|| format!("invalid language profile: id = {}", profile.id))?;

            profile.id = profile.id.to_lowercase();
            let id = profile.id.clone();
            for alias in &profile.aliases {
                let alias = alias.to_lowercase();
                if alias == id {
                    continue;
                }
                if let Some(owner) = registry.aliases.get(&alias) {
                    if *owner != id {
                        anyhow::bail!("alias {} is claimed by {} and {}", alias, owner, id);
                    }
                }
                registry.aliases.insert(alias, id.clone());
            }
            registry.profiles.insert(id, Arc::new(profile));
        }
        for (alias, id) in &registry.aliases {
            if registry.profiles.contains_key(alias) {
                anyhow::bail!("alias {} of {} shadows a language id", alias, id);
            }
        }
        Ok(registry)
    }

    /// Built-in profiles, replaced or extended by `[[languages]]`, minus the
    /// ones turned off in `[languages_enabled]`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut merged: BTreeMap<String, LanguageProfile> = BTreeMap::new();
        for profile in builtin_profiles(&config.toolchains) {
            merged.insert(profile.id.clone(), profile);
        }
        for profile in &config.languages {
            let id = profile.id.to_lowercase();
            if merged.contains_key(&id) {
                debug!(%id, "builtin language profile is overridden");
            }
            merged.insert(id, profile.clone());
        }

        let enabled = |id: &str| {
            config
                .languages_enabled
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(id))
                .map(|(_, &v)| v)
        };
        merged.retain(|id, profile| enabled(id).unwrap_or(profile.enabled));

        let registry = Self::new(merged.into_iter().map(|(_, p)| p))?;
        info!(languages = ?registry.ids(), "language registry is ready");
        Ok(registry)
    }

    pub fn resolve(&self, language: &str) -> Result<Arc<LanguageProfile>, EngineError> {
        let key = language.trim().to_lowercase();
        let id = self.aliases.get(&key).unwrap_or(&key);
        match self.profiles.get(id) {
            Some(profile) => Ok(profile.clone()),
            None => Err(EngineError::UnsupportedLanguage {
                language: language.to_owned(),
                supported: self.ids().join(", "),
            }),
        }
    }

    pub fn ids(&self) -> Vec<&str> {
        self.profiles.keys().map(String::as_str).collect()
    }

    pub fn profiles(&self) -> impl Iterator<Item = &LanguageProfile> {
        self.profiles.values().map(|p| &**p)
    }
}
