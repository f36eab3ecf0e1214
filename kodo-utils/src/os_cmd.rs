use std::env;
use std::ffi::{OsStr, OsString};
use std::os::unix::ffi::OsStrExt;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsCmd {
    pub bin: PathBuf,
    pub args: Vec<OsString>,
    pub env: Vec<OsString>,
    pub cwd: Option<PathBuf>,
}

impl OsCmd {
    pub fn new(bin: impl Into<PathBuf>) -> Self {
        Self {
            bin: bin.into(),
            args: Vec::new(),
            env: Vec::new(),
            cwd: None,
        }
    }

    pub fn arg(&mut self, a: impl Into<OsString>) -> &mut Self {
        self.args.push(a.into());
        self
    }

    pub fn args<I>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Passes the variable through from the current process environment.
    pub fn inherit_env(&mut self, k: impl Into<OsString>) -> &mut Self {
        self.env.push(k.into());
        self
    }

    pub fn add_env(&mut self, k: impl Into<OsString>, v: impl AsRef<OsStr>) -> &mut Self {
        let mut e: OsString = k.into();
        e.push(OsStr::from_bytes(b"="));
        e.push(v.as_ref());
        self.env.push(e);
        self
    }

    pub fn current_dir(&mut self, dir: impl Into<PathBuf>) -> &mut Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Resolves `env` into key/value pairs. Inherited keys missing from the
    /// current environment are skipped.
    pub fn env_pairs(&self) -> Vec<(OsString, OsString)> {
        let mut pairs = Vec::with_capacity(self.env.len());
        for e in &self.env {
            let bytes = e.as_bytes();
            match bytes.iter().position(|&b| b == b'=') {
                Some(pos) => {
                    let k = OsStr::from_bytes(&bytes[..pos]).to_owned();
                    let v = OsStr::from_bytes(&bytes[pos + 1..]).to_owned();
                    pairs.push((k, v));
                }
                None => {
                    if let Some(v) = env::var_os(e) {
                        pairs.push((e.clone(), v));
                    }
                }
            }
        }
        pairs
    }

    /// Renders the command line for logs.
    pub fn display(&self) -> String {
        let mut s = self.bin.display().to_string();
        for a in &self.args {
            s.push(' ');
            s.push_str(&a.to_string_lossy());
        }
        s
    }
}
