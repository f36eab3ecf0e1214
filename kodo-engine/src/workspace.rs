use crate::lang::LanguageProfile;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering::SeqCst};

use anyhow::{Context, Result};
use tracing::{debug, warn};
use uuid::Uuid;

const ARTIFACT_NAME: &str = "main";
const ARTIFACT_DIR_NAME: &str = "out";

pub struct WorkspaceManager {
    root: PathBuf,
}

impl WorkspaceManager {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.exists() {
            fs::create_dir_all(&root).with_context(|| {
                format!("failed to create workspace root: path = {}", root.display())
            })?;
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates a fresh directory for one job.
    ///
    /// The name carries a random suffix, so jobs with equal request ids
    /// never share a directory. An existing directory is an error, never
    /// reused.
    pub fn acquire(&self, request_id: &str, profile: &LanguageProfile) -> Result<Workspace> {
        let name = format!("{}-{}", sanitize(request_id), Uuid::new_v4().simple());
        let root = self.root.join(name);
        fs::create_dir(&root)
            .with_context(|| format!("failed to create workspace: path = {}", root.display()))?;

        let artifact_dir = if profile.artifact_dir {
            let dir = root.join(ARTIFACT_DIR_NAME);
            if let Err(err) = fs::create_dir(&dir) {
                let _ = fs::remove_dir_all(&root);
                return Err(err).with_context(|| {
                    format!("failed to create artifact dir: path = {}", dir.display())
                });
            }
            Some(dir)
        } else {
            None
        };

        let source_path = root.join(profile.source_file_name());
        let artifact_path = root.join(ARTIFACT_NAME);
        debug!(workspace = %root.display(), "workspace acquired");
        Ok(Workspace::new(root, source_path, artifact_path, artifact_dir))
    }
}

fn sanitize(request_id: &str) -> String {
    let s: String = request_id
        .chars()
        .filter(|&c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        .take(32)
        .collect();
    if s.is_empty() {
        "job".to_owned()
    } else {
        s
    }
}

/// Per-job directory. Removed by [`Workspace::release`].
#[derive(Debug)]
pub struct Workspace {
    pub root: PathBuf,
    pub source_path: PathBuf,
    pub artifact_path: PathBuf,
    pub artifact_dir: Option<PathBuf>,
    released: AtomicBool,
}

impl Workspace {
    pub fn new(
        root: PathBuf,
        source_path: PathBuf,
        artifact_path: PathBuf,
        artifact_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            root,
            source_path,
            artifact_path,
            artifact_dir,
            released: AtomicBool::new(false),
        }
    }

    pub fn is_released(&self) -> bool {
        self.released.load(SeqCst)
    }

    /// Removes the directory tree. Only the first call does anything, and
    /// failures are logged instead of returned.
    pub fn release(&self) {
        if self.released.swap(true, SeqCst) {
            return;
        }
        match fs::remove_dir_all(&self.root) {
            Ok(()) => debug!(workspace = %self.root.display(), "workspace released"),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => {
                warn!(workspace = %self.root.display(), %err, "failed to remove workspace")
            }
        }
    }
}
