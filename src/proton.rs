//! Proton runtime location and per-instance environment
//!
//! Windows games run through Proton with one compat prefix per instance.
//! The locator resolves a requested Proton version to a concrete binary
//! plus the Steam client root; the environment builder produces the
//! minimal child environment for a spawn.

use std::collections::HashMap;
use std::path::PathBuf;

use tracing::info;

use crate::devices::DeviceAssignment;
use crate::error::{Error, Result};
use crate::instance::GameInstance;
use crate::paths::PATH_STEAM;
use crate::profile::GameProfile;

/// A located Proton installation.
#[derive(Clone)]
pub struct ProtonRuntime {
    /// The `proton` entry script
    pub proton_path: PathBuf,
    /// Steam client install root (STEAM_COMPAT_CLIENT_INSTALL_PATH)
    pub steam_root: PathBuf,
}

/// Resolve a Proton version name ("Experimental", "GE-Proton9-20", ...) to
/// an installed runtime.
///
/// Checks compatibilitytools.d and the default library first, then every
/// Steam library. A missing runtime is a fatal dependency error.
pub fn find_proton(version: &str) -> Result<ProtonRuntime> {
    let steam_root = match steamlocate::SteamDir::locate() {
        Ok(dir) => dir.path().to_path_buf(),
        Err(_) => PATH_STEAM.clone(),
    };

    let candidates = [
        steam_root.join("compatibilitytools.d").join(version),
        steam_root
            .join("steamapps/common")
            .join(format!("Proton {version}")),
        steam_root.join("steamapps/common").join(version),
    ];
    for dir in &candidates {
        let bin = dir.join("proton");
        if bin.exists() {
            info!("Found Proton '{}' at {}", version, bin.display());
            return Ok(ProtonRuntime {
                proton_path: bin,
                steam_root,
            });
        }
    }

    // Other Steam libraries can hold Proton installs too
    if let Ok(steam_dir) = steamlocate::SteamDir::locate() {
        if let Ok(libraries) = steam_dir.libraries() {
            for library in libraries.flatten() {
                let bin = library
                    .path()
                    .join("steamapps/common")
                    .join(format!("Proton {version}"))
                    .join("proton");
                if bin.exists() {
                    info!("Found Proton '{}' at {}", version, bin.display());
                    return Ok(ProtonRuntime {
                        proton_path: bin,
                        steam_root,
                    });
                }
            }
        }
    }

    Err(Error::Dependency(format!(
        "Proton '{version}' not found under {} (checked compatibilitytools.d and steamapps/common)",
        steam_root.display()
    )))
}

/// Build the child process environment for one instance.
///
/// Starts from this process's environment, strips interpreter state that
/// must not leak into the game, wires up the Proton/compat paths for
/// non-native games and the instance audio sink, and applies profile
/// overrides last so operator settings always win.
pub fn build_env(
    instance: &GameInstance,
    profile: &GameProfile,
    runtime: Option<&ProtonRuntime>,
    devices: &DeviceAssignment,
) -> HashMap<String, String> {
    let mut env: HashMap<String, String> = std::env::vars().collect();

    // Foreign interpreter state must never reach the game process
    env.remove("PYTHONHOME");
    env.remove("PYTHONPATH");

    if !profile.is_native {
        if let Some(runtime) = runtime {
            env.insert(
                "STEAM_COMPAT_CLIENT_INSTALL_PATH".to_string(),
                runtime.steam_root.to_string_lossy().into_owned(),
            );
            env.insert(
                "STEAM_COMPAT_DATA_PATH".to_string(),
                instance.prefix_dir.to_string_lossy().into_owned(),
            );
            env.insert(
                "WINEPREFIX".to_string(),
                instance.pfx_dir().to_string_lossy().into_owned(),
            );
            info!(
                "Instance {}: WINEPREFIX={}",
                instance.instance_num,
                instance.pfx_dir().display()
            );

            if let Some(proton_bin_dir) = runtime.proton_path.parent() {
                let original_path = env.get("PATH").cloned().unwrap_or_default();
                env.insert(
                    "PATH".to_string(),
                    format!("{}:{}", proton_bin_dir.display(), original_path),
                );
            }
        }

        // Sync defaults, kept only when the operator hasn't decided already
        env.entry("PROTON_NO_ESYNC".to_string())
            .or_insert_with(|| "0".to_string());
        env.entry("PROTON_NO_FSYNC".to_string())
            .or_insert_with(|| "0".to_string());
    }

    // PULSE_SINK routes instance audio for both PulseAudio and PipeWire
    // (via pipewire-pulse)
    if let Some(sink) = &devices.audio_device_id {
        env.insert("PULSE_SINK".to_string(), sink.clone());
    }

    // Profile overrides win over everything computed above
    for (key, value) in &profile.env_vars {
        env.insert(key.clone(), value.clone());
    }

    if !instance.player_config.account_name.is_empty() {
        env.insert(
            "COOPSCOPE_ACCOUNT_NAME".to_string(),
            instance.player_config.account_name.clone(),
        );
    }

    env
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::PlayerInstanceConfig;

    fn test_instance(prefix: &str) -> GameInstance {
        GameInstance {
            instance_num: 1,
            profile_name: "test".into(),
            prefix_dir: PathBuf::from(prefix),
            log_file: PathBuf::from("/dev/null"),
            player_config: PlayerInstanceConfig::default(),
            pid: None,
        }
    }

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
            use_gamescope: false,
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

    #[test]
    fn test_proton_env_wiring() {
        let instance = test_instance("/data/prefixes/test/instance_1");
        let env = build_env(&instance, &test_profile(false), Some(&test_runtime()), &DeviceAssignment::default());

        assert_eq!(env["STEAM_COMPAT_CLIENT_INSTALL_PATH"], "/steam");
        assert_eq!(env["STEAM_COMPAT_DATA_PATH"], "/data/prefixes/test/instance_1");
        assert_eq!(env["WINEPREFIX"], "/data/prefixes/test/instance_1/pfx");
        assert!(env["PATH"].starts_with("/steam/compatibilitytools.d/GE-Proton:"));
        assert_eq!(env["PROTON_NO_ESYNC"], "0");
        assert_eq!(env["PROTON_NO_FSYNC"], "0");
    }

    #[test]
    fn test_native_env_has_no_proton_vars() {
        let instance = test_instance("/data/prefixes/test/instance_1");
        let env = build_env(&instance, &test_profile(true), None, &DeviceAssignment::default());
        assert!(!env.contains_key("WINEPREFIX"));
        assert!(!env.contains_key("STEAM_COMPAT_DATA_PATH"));
        assert!(!env.contains_key("PROTON_NO_ESYNC"));
    }

    #[test]
    fn test_interpreter_state_stripped() {
        // SAFETY: test-only env mutation, single-threaded access pattern
        unsafe { std::env::set_var("PYTHONPATH", "/leaky/site-packages") };
        let instance = test_instance("/data/prefixes/test/instance_1");
        let env = build_env(&instance, &test_profile(true), None, &DeviceAssignment::default());
        assert!(!env.contains_key("PYTHONPATH"));
        unsafe { std::env::remove_var("PYTHONPATH") };
    }

    #[test]
    fn test_profile_overrides_win() {
        let instance = test_instance("/data/prefixes/test/instance_1");
        let mut profile = test_profile(false);
        profile
            .env_vars
            .insert("PROTON_NO_ESYNC".to_string(), "1".to_string());
        profile
            .env_vars
            .insert("MANGOHUD".to_string(), "1".to_string());
        let env = build_env(&instance, &profile, Some(&test_runtime()), &DeviceAssignment::default());
        assert_eq!(env["PROTON_NO_ESYNC"], "1");
        assert_eq!(env["MANGOHUD"], "1");
    }

    #[test]
    fn test_audio_sink_exported() {
        // SAFETY: test-only env mutation, single-threaded access pattern
        unsafe { std::env::remove_var("PULSE_SINK") };
        let instance = test_instance("/data/prefixes/test/instance_1");
        let devices = DeviceAssignment {
            audio_device_id: Some("alsa_output.usb-headset".into()),
            ..DeviceAssignment::default()
        };
        let env = build_env(&instance, &test_profile(true), None, &devices);
        assert_eq!(env["PULSE_SINK"], "alsa_output.usb-headset");

        let env = build_env(
            &instance,
            &test_profile(true),
            None,
            &DeviceAssignment::default(),
        );
        assert!(!env.contains_key("PULSE_SINK"));
    }

    #[test]
    fn test_account_name_exported() {
        let mut instance = test_instance("/data/prefixes/test/instance_1");
        instance.player_config.account_name = "player_two".into();
        let env = build_env(&instance, &test_profile(true), None, &DeviceAssignment::default());
        assert_eq!(env["COOPSCOPE_ACCOUNT_NAME"], "player_two");
    }
}
