//! Host dependency validation and per-instance prefix preparation
//!
//! Hard external commands are checked up front so a missing tool never
//! surfaces halfway through a launch. Prefix preparation (first-run Proton
//! init, dxvk/vkd3d, winetricks verbs) hides behind a trait so the
//! orchestrator only depends on the contract.

use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::process::{Command, Stdio};

use tracing::info;

use crate::error::{Error, Result};
use crate::proton::ProtonRuntime;

/// Resolve a command name on $PATH, shutil.which-style.
pub fn command_on_path(cmd: &str) -> bool {
    let Some(path_var) = std::env::var_os("PATH") else {
        return false;
    };
    for dir in std::env::split_paths(&path_var) {
        let candidate = dir.join(cmd);
        let executable = candidate
            .metadata()
            .map(|md| md.is_file() && md.permissions().mode() & 0o111 != 0)
            .unwrap_or(false);
        if executable {
            return true;
        }
    }
    false
}

/// Confirm every command in `required` resolves on $PATH.
///
/// The first missing command aborts the run before any instance is touched.
pub fn validate_required_commands(required: &[String]) -> Result<()> {
    for cmd in required {
        if !command_on_path(cmd) {
            return Err(Error::Dependency(format!(
                "required command '{cmd}' not found"
            )));
        }
    }
    Ok(())
}

/// One-time per-instance prefix setup, invoked before any launch.
///
/// Every step may fail with a dependency error; that aborts only the
/// affected instance's preparation.
pub trait DependencyPreparer {
    /// Create/initialize the compat prefix at `prefix_dir`.
    fn initialize_prefix(&self, prefix_dir: &Path) -> Result<()>;
    /// Install DXVK/VKD3D translation libraries into the prefix.
    fn apply_runtime_libraries(&self, prefix_dir: &Path) -> Result<()>;
    /// Run extra winetricks verbs against the prefix.
    fn apply_extra_setup(&self, prefix_dir: &Path, verbs: &[String]) -> Result<()>;
}

/// Proton-backed preparer: drives the located Proton install and
/// winetricks against an instance prefix.
pub struct ProtonPreparer {
    runtime: ProtonRuntime,
}

impl ProtonPreparer {
    pub fn new(runtime: ProtonRuntime) -> Self {
        Self { runtime }
    }

    fn prefix_env(&self, cmd: &mut Command, prefix_dir: &Path) {
        cmd.env("STEAM_COMPAT_CLIENT_INSTALL_PATH", &self.runtime.steam_root)
            .env("STEAM_COMPAT_DATA_PATH", prefix_dir)
            .env("WINEPREFIX", prefix_dir.join("pfx"));
    }
}

impl DependencyPreparer for ProtonPreparer {
    fn initialize_prefix(&self, prefix_dir: &Path) -> Result<()> {
        // An existing registry means the prefix already went through first-run
        if prefix_dir.join("pfx/system.reg").exists() {
            return Ok(());
        }
        info!("Initializing prefix at {}", prefix_dir.display());
        let mut cmd = Command::new(&self.runtime.proton_path);
        cmd.args(["run", "wineboot"])
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        self.prefix_env(&mut cmd, prefix_dir);
        let status = cmd.status().map_err(|e| {
            Error::Dependency(format!(
                "failed to run {}: {}",
                self.runtime.proton_path.display(),
                e
            ))
        })?;
        if !status.success() {
            return Err(Error::Dependency(format!(
                "prefix initialization failed at {} ({})",
                prefix_dir.display(),
                status
            )));
        }
        Ok(())
    }

    fn apply_runtime_libraries(&self, prefix_dir: &Path) -> Result<()> {
        self.apply_extra_setup(prefix_dir, &["dxvk".to_string(), "vkd3d".to_string()])
    }

    fn apply_extra_setup(&self, prefix_dir: &Path, verbs: &[String]) -> Result<()> {
        if verbs.is_empty() {
            return Ok(());
        }
        if !command_on_path("winetricks") {
            return Err(Error::Dependency(
                "winetricks verbs configured but 'winetricks' not found".into(),
            ));
        }
        info!(
            "Applying winetricks verbs {:?} to {}",
            verbs,
            prefix_dir.display()
        );
        let status = Command::new("winetricks")
            .args(verbs)
            .env("WINEPREFIX", prefix_dir.join("pfx"))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| Error::Dependency(format!("failed to run winetricks: {e}")))?;
        if !status.success() {
            return Err(Error::Dependency(format!(
                "winetricks {:?} failed in {} ({})",
                verbs,
                prefix_dir.display(),
                status
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_on_path_finds_sh() {
        assert!(command_on_path("sh"));
    }

    #[test]
    fn test_command_on_path_rejects_nonsense() {
        assert!(!command_on_path("coopscope-no-such-command"));
    }

    #[test]
    fn test_validate_required_commands() {
        assert!(validate_required_commands(&["sh".to_string()]).is_ok());

        let err = validate_required_commands(&[
            "sh".to_string(),
            "coopscope-no-such-command".to_string(),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("coopscope-no-such-command"));
    }
}
