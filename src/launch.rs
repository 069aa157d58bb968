//! Launch command assembly
//!
//! Composes the final argv for one instance out of three stages:
//! bwrap sandbox (optional), gamescope compositor (optional) and the base
//! game command. The sandbox wraps everything; the compositor wraps the
//! base command behind its `--` separator. A disabled stage contributes
//! zero tokens.

use std::path::Path;

use crate::bwrap::build_bwrap_args;
use crate::devices::DeviceAssignment;
use crate::gamescope::{build_gamescope_args, separator};
use crate::profile::GameProfile;
use crate::proton::ProtonRuntime;

/// Base game command: the mirrored executable (through Proton's `run` verb
/// for Windows games) plus profile-declared extra arguments.
pub fn build_base_args(
    profile: &GameProfile,
    runtime: Option<&ProtonRuntime>,
    mirrored_exe: &Path,
) -> Vec<String> {
    let mut args = Vec::new();
    if profile.is_native {
        args.push(mirrored_exe.to_string_lossy().into_owned());
    } else if let Some(runtime) = runtime {
        args.push(runtime.proton_path.to_string_lossy().into_owned());
        args.push("run".to_string());
        args.push(mirrored_exe.to_string_lossy().into_owned());
    }
    args.extend(profile.game_args.split_whitespace().map(str::to_string));
    args
}

/// Full argument vector to spawn one instance.
pub fn build_launch_argv(
    profile: &GameProfile,
    runtime: Option<&ProtonRuntime>,
    devices: &DeviceAssignment,
    mirrored_exe: &Path,
    instance_num: usize,
) -> Vec<String> {
    let mut argv = Vec::new();

    if profile.disable_bwrap {
        tracing::warn!(
            "Instance {}: bwrap is disabled, input device isolation will NOT work",
            instance_num
        );
    } else {
        argv.extend(build_bwrap_args(devices, instance_num));
    }

    let gamescope_args = build_gamescope_args(profile, devices, instance_num);
    if !gamescope_args.is_empty() {
        argv.extend(gamescope_args);
        argv.push(separator());
    }

    argv.extend(build_base_args(profile, runtime, mirrored_exe));
    argv
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::PlayerInstanceConfig;
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn test_profile(is_native: bool) -> GameProfile {
        GameProfile {
            game_name: "test".into(),
            exe_path: PathBuf::from("/bin/sh"),
            proton_version: None,
            num_players: 2,
            instance_width: 960,
            instance_height: 540,
            players: vec![PlayerInstanceConfig::default(); 2],
            selected_players: vec![],
            use_gamescope: true,
            disable_bwrap: false,
            splitscreen_mode: true,
            game_args: String::new(),
            env_vars: HashMap::new(),
            apply_dxvk_vkd3d: false,
            winetricks_verbs: vec![],
            is_native,
        }
    }

    fn test_runtime() -> ProtonRuntime {
        ProtonRuntime {
            proton_path: PathBuf::from("/steam/compatibilitytools.d/GE-Proton/proton"),
            steam_root: PathBuf::from("/steam"),
        }
    }

    const EXE: &str = "/prefixes/instance_1/game_files/game.exe";

    #[test]
    fn test_stage_order_sandbox_compositor_base() {
        let argv = build_launch_argv(
            &test_profile(false),
            Some(&test_runtime()),
            &DeviceAssignment::default(),
            Path::new(EXE),
            1,
        );
        let bwrap = argv.iter().position(|a| a == "bwrap").unwrap();
        let gamescope = argv.iter().position(|a| a == "gamescope").unwrap();
        let sep = argv.iter().position(|a| a == "--").unwrap();
        let proton = argv.iter().position(|a| a.ends_with("/proton")).unwrap();
        assert!(bwrap < gamescope && gamescope < sep && sep < proton);
        assert_eq!(argv[proton + 1], "run");
        assert_eq!(argv[proton + 2], EXE);
    }

    #[test]
    fn test_disabled_sandbox_contributes_no_tokens() {
        let mut profile = test_profile(true);
        profile.disable_bwrap = true;
        let argv = build_launch_argv(
            &profile,
            None,
            &DeviceAssignment::default(),
            Path::new(EXE),
            1,
        );
        assert!(!argv.iter().any(|a| a == "bwrap" || a.starts_with("--dev-bind")));
        assert_eq!(argv[0], "gamescope");
    }

    #[test]
    fn test_no_gamescope_no_separator() {
        let mut profile = test_profile(true);
        profile.use_gamescope = false;
        profile.disable_bwrap = true;
        let argv = build_launch_argv(
            &profile,
            None,
            &DeviceAssignment::default(),
            Path::new(EXE),
            1,
        );
        assert_eq!(argv, vec![EXE.to_string()]);
    }

    #[test]
    fn test_game_args_split_on_whitespace() {
        let mut profile = test_profile(true);
        profile.game_args = "-windowed  -novid".into();
        let args = build_base_args(&profile, None, Path::new(EXE));
        assert_eq!(args, vec![EXE.to_string(), "-windowed".into(), "-novid".into()]);
    }

    #[test]
    fn test_native_skips_proton_even_when_located() {
        let args = build_base_args(&test_profile(true), Some(&test_runtime()), Path::new(EXE));
        assert_eq!(args, vec![EXE.to_string()]);
    }
}
