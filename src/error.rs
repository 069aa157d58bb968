//! Launcher error taxonomy
//!
//! Fatal errors (missing dependencies, isolation failures at the root)
//! unwind out of the orchestrator. Per-instance failures are contained
//! and reported where they happen so sibling instances still launch.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A required external command or runtime is missing. Aborts the whole
    /// run before any instance is touched.
    #[error("dependency error: {0}")]
    Dependency(String),

    /// Building the mirrored game tree failed for one instance. Fatal for
    /// that instance only.
    #[error("instance {instance}: filesystem isolation failed: {reason}")]
    Isolation { instance: usize, reason: String },

    /// Profile contents that cannot be launched (bad player count, missing
    /// executable). Raised at profile load, never mid-run.
    #[error("invalid profile: {0}")]
    Profile(String),

    #[error("executable {exe} is not inside game directory {root}")]
    ExeOutsideGameDir { exe: PathBuf, root: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
