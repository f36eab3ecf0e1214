use crate::lang::LanguageProfile;

use kodo_sandbox::IsolatorConfig;

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use ubyte::ByteUnit;
use validator::Validate;

#[derive(Debug, Clone, Default, Validate, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[validate]
    pub executor: Executor,

    #[validate]
    pub scheduler: Scheduler,

    pub toolchains: Toolchains,

    /// Turns built-in or configured languages on and off by id.
    pub languages_enabled: HashMap<String, bool>,

    /// Extra profiles. A profile with a built-in id replaces the built-in.
    pub languages: Vec<LanguageProfile>,
}

#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
#[serde(default)]
pub struct Executor {
    pub workspace_root: PathBuf,

    #[validate(range(min = 100, max = 600000))]
    pub compile_timeout: u64, // milliseconds

    #[validate(range(min = 100, max = 600000))]
    pub run_timeout: u64, // milliseconds

    pub output_limit: ByteUnit,
    pub max_source_bytes: ByteUnit,

    pub memory_limit: Option<ByteUnit>,
    pub file_size_limit: Option<ByteUnit>,
    pub pids_limit: Option<u64>,

    pub isolator: IsolatorConfig,
}

impl Default for Executor {
    fn default() -> Self {
        Self {
            workspace_root: env::temp_dir().join("kodo"),
            compile_timeout: 10000,
            run_timeout: 5000,
            output_limit: ByteUnit::Mebibyte(1),
            max_source_bytes: ByteUnit::Kibibyte(64),
            memory_limit: Some(ByteUnit::Mebibyte(512)),
            file_size_limit: Some(ByteUnit::Mebibyte(64)),
            pids_limit: None,
            isolator: IsolatorConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
#[serde(default)]
pub struct Scheduler {
    #[validate(range(min = 1, max = 256))]
    pub workers: usize,

    #[validate(range(min = 1, max = 65536))]
    pub queue_depth: usize,

    #[validate(range(min = 1, max = 86400000))]
    pub queue_timeout: u64, // milliseconds
}

impl Default for Scheduler {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_depth: 64,
            queue_timeout: 30000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Toolchains {
    pub gcc: String,
    pub gxx: String,
    pub javac: String,
    pub java: String,
    pub python: String,
}

impl Default for Toolchains {
    fn default() -> Self {
        Self {
            gcc: "gcc".into(),
            gxx: "g++".into(),
            javac: "javac".into(),
            java: "java".into(),
            python: "python3".into(),
        }
    }
}

static GLOBAL_CONFIG: OnceCell<Config> = OnceCell::new();

impl FromStr for Config {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config: path = {}", path.display()))?;
        let mut config: Config = toml::from_str(&content)?;
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus environment overrides, for running without a file.
    pub fn from_env() -> Result<Config> {
        let mut config = Config::default();
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    pub fn init_from_file(path: impl AsRef<Path>) -> Result<&'static Config> {
        Self::init(Self::from_file(path)?)
    }

    /// Installs the process-wide config. Fails if one is installed already.
    pub fn init(config: Config) -> Result<&'static Config> {
        GLOBAL_CONFIG
            .set(config)
            .map_err(|_| anyhow::format_err!("config is already initialized"))?;
        Self::global().context("config is not initialized")
    }

    pub fn global() -> Option<&'static Config> {
        GLOBAL_CONFIG.get()
    }

    pub fn apply_env(&mut self) -> Result<()> {
        if let Some(v) = env_var("KODO_COMPILE_TIMEOUT_MS")? {
            self.executor.compile_timeout = v;
        }
        if let Some(v) = env_var("KODO_RUN_TIMEOUT_MS")? {
            self.executor.run_timeout = v;
        }
        if let Some(v) = env_var("KODO_WORKERS")? {
            self.scheduler.workers = v;
        }
        if let Some(v) = env_var("KODO_QUEUE_DEPTH")? {
            self.scheduler.queue_depth = v;
        }
        if let Some(v) = env_var::<PathBuf>("KODO_WORKSPACE_ROOT")? {
            self.executor.workspace_root = v;
        }
        Ok(())
    }
}

fn env_var<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(s) => {
            let v = s
                .trim()
                .parse::<T>()
                .with_context(|| format!("invalid value of {}: {:?}", key, s))?;
            Ok(Some(v))
        }
        Err(env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(err).with_context(|| format!("invalid value of {}", key)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_valid() {
        let config: Config = "".parse().unwrap();
        assert_eq!(config.executor.compile_timeout, 10000);
        assert_eq!(config.executor.run_timeout, 5000);
        assert_eq!(config.executor.output_limit.as_u64(), 1024 * 1024);
        assert_eq!(
            config.executor.memory_limit.map(|m| m.as_u64()),
            Some(512 * 1024 * 1024)
        );
        assert_eq!(config.scheduler.workers, 4);
        assert_eq!(config.executor.isolator, IsolatorConfig::default());
        assert!(config.languages.is_empty());
    }

    #[test]
    fn sections_are_parsed() {
        let content = r#"
            [executor]
            workspace_root = "/var/lib/kodo"
            run_timeout = 2000
            output_limit = "64 KiB"
            memory_limit = "256 MiB"

            [executor.isolator]
            kind = "bare"

            [scheduler]
            workers = 2
            queue_depth = 8

            [toolchains]
            python = "/usr/bin/python3.11"

            [languages_enabled]
            java = false

            [[languages]]
            id = "shell"
            source_extension = ".sh"
            run = ["/bin/sh", "{source}"]
        "#;
        let config: Config = content.parse().unwrap();
        assert_eq!(config.executor.workspace_root, PathBuf::from("/var/lib/kodo"));
        assert_eq!(config.executor.run_timeout, 2000);
        assert_eq!(config.executor.output_limit.as_u64(), 64 * 1024);
        assert_eq!(
            config.executor.memory_limit.map(|m| m.as_u64()),
            Some(256 * 1024 * 1024)
        );
        assert_eq!(config.executor.isolator, IsolatorConfig::Bare);
        assert_eq!(config.scheduler.workers, 2);
        assert_eq!(config.scheduler.queue_depth, 8);
        assert_eq!(config.toolchains.python, "/usr/bin/python3.11");
        assert_eq!(config.toolchains.gxx, "g++");
        assert_eq!(config.languages_enabled.get("java"), Some(&false));
        assert_eq!(config.languages[0].id, "shell");
    }

    #[test]
    fn out_of_range_is_rejected() {
        assert!("[scheduler]\nworkers = 0\n".parse::<Config>().is_err());
        assert!("[executor]\nrun_timeout = 10\n".parse::<Config>().is_err());
    }

    #[test]
    fn file_is_read_and_validated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kodo.toml");
        fs::write(&path, "[executor]\ncompile_timeout = 3000\n").unwrap();
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.executor.compile_timeout, 3000);

        assert!(Config::from_file(dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn global_is_installed_once() {
        let first = Config::init(Config::default()).unwrap();
        assert!(std::ptr::eq(first, Config::global().unwrap()));
        assert!(Config::init(Config::default()).is_err());
    }
}
