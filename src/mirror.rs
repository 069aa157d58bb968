//! Per-instance mirrored game tree
//!
//! Reproduces the game's install layout under the instance prefix using
//! real directories and per-file symlinks to the originals. The game sees
//! its own writable-looking tree while the install stays untouched and no
//! disk space is spent on copies.

use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};

use tracing::{info, warn};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::instance::GameInstance;

/// Outcome of building one instance's mirror.
///
/// Per-file link failures are collected here instead of aborting the whole
/// tree; a single unlinkable file does not make the mirror unusable.
#[derive(Debug)]
pub struct MirrorReport {
    /// Path of the mirrored executable inside the tree
    pub exe_path: PathBuf,
    /// Symlinks created by this run
    pub linked: usize,
    /// Files left out of the mirror, with the reason
    pub skipped: Vec<(PathBuf, String)>,
}

/// Mirror the game install into `<prefix>/game_files` and verify that the
/// executable's mirror resolves to the real executable.
///
/// Idempotent: existing links are left alone. Fails only when the
/// executable is outside the install root or the executable's own symlink
/// cannot be verified afterwards.
pub fn build_game_mirror(
    instance: &GameInstance,
    game_root: &Path,
    exe_path: &Path,
) -> Result<MirrorReport> {
    let mirror_root = instance.game_files_dir();
    std::fs::create_dir_all(&mirror_root)?;

    info!(
        "Instance {}: Mirroring {} at {}",
        instance.instance_num,
        game_root.display(),
        mirror_root.display()
    );

    // The whole install must be reachable from one root for the mirror to
    // be meaningful.
    let relative_exe = exe_path
        .strip_prefix(game_root)
        .map_err(|_| Error::ExeOutsideGameDir {
            exe: exe_path.to_path_buf(),
            root: game_root.to_path_buf(),
        })?;
    let mirrored_exe = mirror_root.join(relative_exe);

    let mut linked = 0usize;
    let mut skipped = Vec::new();

    for entry in WalkDir::new(game_root).min_depth(1).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(
                    "Instance {}: Skipping unreadable entry under {}: {}",
                    instance.instance_num,
                    game_root.display(),
                    e
                );
                continue;
            }
        };

        let rel_path = match entry.path().strip_prefix(game_root) {
            Ok(rel) => rel,
            Err(_) => continue,
        };
        let target = mirror_root.join(rel_path);

        if entry.file_type().is_dir() {
            if let Err(e) = std::fs::create_dir_all(&target) {
                warn!(
                    "Instance {}: Failed to create mirror directory {}: {}",
                    instance.instance_num,
                    target.display(),
                    e
                );
                skipped.push((entry.path().to_path_buf(), e.to_string()));
            }
            continue;
        }

        // symlink_metadata so an existing (possibly dangling) link counts
        if target.symlink_metadata().is_ok() {
            continue;
        }
        if let Some(parent) = target.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                skipped.push((entry.path().to_path_buf(), e.to_string()));
                continue;
            }
        }
        match symlink(entry.path(), &target) {
            Ok(()) => linked += 1,
            Err(e) => {
                warn!(
                    "Instance {}: Failed to create symlink for {}: {}",
                    instance.instance_num,
                    entry.path().display(),
                    e
                );
                skipped.push((entry.path().to_path_buf(), e.to_string()));
            }
        }
    }

    verify_executable_symlink(instance, &mirrored_exe, exe_path)?;

    info!(
        "Instance {}: Mirror ready ({} links created, {} skipped)",
        instance.instance_num,
        linked,
        skipped.len()
    );

    Ok(MirrorReport {
        exe_path: mirrored_exe,
        linked,
        skipped,
    })
}

/// The mirrored executable must exist, be a symlink, and resolve to the
/// real executable. Anything else aborts the launch of this instance.
fn verify_executable_symlink(
    instance: &GameInstance,
    mirrored_exe: &Path,
    exe_path: &Path,
) -> Result<()> {
    let is_symlink = mirrored_exe
        .symlink_metadata()
        .map(|md| md.file_type().is_symlink())
        .unwrap_or(false);
    if !is_symlink {
        return Err(Error::Isolation {
            instance: instance.instance_num,
            reason: format!(
                "symlink verification failed: {} missing or not a symlink",
                mirrored_exe.display()
            ),
        });
    }

    let resolved = mirrored_exe.canonicalize().map_err(|e| Error::Isolation {
        instance: instance.instance_num,
        reason: format!(
            "symlink verification failed: cannot resolve {}: {}",
            mirrored_exe.display(),
            e
        ),
    })?;
    let original = exe_path.canonicalize().map_err(|e| Error::Isolation {
        instance: instance.instance_num,
        reason: format!("cannot resolve executable {}: {}", exe_path.display(), e),
    })?;

    if resolved != original {
        return Err(Error::Isolation {
            instance: instance.instance_num,
            reason: format!(
                "symlink verification failed: {} points to {}, not {}",
                mirrored_exe.display(),
                resolved.display(),
                original.display()
            ),
        });
    }

    info!(
        "Instance {}: Executable symlink verified: {}",
        instance.instance_num,
        mirrored_exe.display()
    );
    Ok(())
}
