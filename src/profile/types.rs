//! Game profile type definitions
//!
//! A profile describes one game and how to split it across players. It is
//! validated once at load; everything downstream treats it as read-only.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Per-player device and session configuration.
///
/// The position in `GameProfile::players` defines the player index;
/// instance numbering is that index + 1.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct PlayerInstanceConfig {
    /// evdev path of a dedicated mouse (e.g. "/dev/input/event5")
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub mouse_event_path: String,
    /// evdev path of a dedicated keyboard
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub keyboard_event_path: String,
    /// evdev path of a gamepad/joystick
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub physical_device_id: String,
    /// Audio sink/device identifier, passed through opaquely
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub audio_device_id: String,
    /// Account name override for this player's session
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub account_name: String,
    /// Per-player resolution override (falls back to the profile resolution)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameProfile {
    pub game_name: String,
    pub exe_path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proton_version: Option<String>,
    pub num_players: usize,
    pub instance_width: u32,
    pub instance_height: u32,
    #[serde(default)]
    pub players: Vec<PlayerInstanceConfig>,
    /// 1-based instance numbers to launch. Empty = launch all players.
    #[serde(default)]
    pub selected_players: Vec<usize>,
    #[serde(default = "default_true")]
    pub use_gamescope: bool,
    /// Disabling bwrap removes all input device isolation
    #[serde(default)]
    pub disable_bwrap: bool,
    /// Borderless windows for split-view, fullscreen + adaptive sync otherwise
    #[serde(default = "default_true")]
    pub splitscreen_mode: bool,
    /// Extra game arguments, whitespace-separated
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub game_args: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub env_vars: HashMap<String, String>,
    #[serde(default)]
    pub apply_dxvk_vkd3d: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub winetricks_verbs: Vec<String>,
    /// Derived once from the executable suffix at load time
    #[serde(skip)]
    pub is_native: bool,
}

fn default_true() -> bool {
    true
}

/// Windows executables run through Proton; everything else is native.
pub fn derive_is_native(exe_path: &std::path::Path) -> bool {
    !exe_path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("exe"))
        .unwrap_or(false)
}

/// Strip characters that would be unsafe in directory names.
pub fn sanitize_game_name(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

impl GameProfile {
    /// Normalize and validate a freshly deserialized profile.
    ///
    /// Derives `is_native`, sanitizes the game name and pads the player
    /// list to `num_players` so indexing by player is always in bounds.
    pub fn normalize(&mut self) -> Result<()> {
        if self.num_players < 2 {
            return Err(Error::Profile(format!(
                "num_players is {}, at least 2 players are required",
                self.num_players
            )));
        }
        if !self.exe_path.exists() {
            return Err(Error::Profile(format!(
                "game executable not found: {}",
                self.exe_path.display()
            )));
        }
        self.game_name = sanitize_game_name(&self.game_name);
        if self.game_name.is_empty() {
            return Err(Error::Profile("game_name is empty".into()));
        }
        self.is_native = derive_is_native(&self.exe_path);
        while self.players.len() < self.num_players {
            self.players.push(PlayerInstanceConfig::default());
        }
        Ok(())
    }

    /// Player config for a 1-based instance number, if one exists.
    pub fn player_config(&self, instance_num: usize) -> Option<&PlayerInstanceConfig> {
        instance_num
            .checked_sub(1)
            .and_then(|idx| self.players.get(idx))
    }

    /// Render/output dimensions for an instance, honoring per-player overrides.
    pub fn get_instance_dimensions(&self, instance_num: usize) -> (u32, u32) {
        let player = self.player_config(instance_num);
        let width = player
            .and_then(|p| p.width)
            .unwrap_or(self.instance_width);
        let height = player
            .and_then(|p| p.height)
            .unwrap_or(self.instance_height);
        (width, height)
    }

    /// Whether this instance number should launch under the current selection.
    pub fn is_selected(&self, instance_num: usize) -> bool {
        self.selected_players.is_empty() || self.selected_players.contains(&instance_num)
    }

    /// Number of instances that will actually launch.
    pub fn effective_num_players(&self) -> usize {
        (1..=self.players.len())
            .filter(|&n| self.is_selected(n))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_profile(exe: PathBuf) -> GameProfile {
        GameProfile {
            game_name: "Test Game!".into(),
            exe_path: exe,
            proton_version: None,
            num_players: 2,
            instance_width: 960,
            instance_height: 540,
            players: vec![],
            selected_players: vec![],
            use_gamescope: true,
            disable_bwrap: false,
            splitscreen_mode: true,
            game_args: String::new(),
            env_vars: HashMap::new(),
            apply_dxvk_vkd3d: false,
            winetricks_verbs: vec![],
            is_native: false,
        }
    }

    #[test]
    fn test_derive_is_native() {
        assert!(!derive_is_native(std::path::Path::new("/games/foo/Game.exe")));
        assert!(!derive_is_native(std::path::Path::new("/games/foo/Game.EXE")));
        assert!(derive_is_native(std::path::Path::new("/games/foo/game.x86_64")));
        assert!(derive_is_native(std::path::Path::new("/games/foo/game")));
    }

    #[test]
    fn test_sanitize_game_name() {
        assert_eq!(sanitize_game_name("My Game: Deluxe"), "My_Game__Deluxe");
        assert_eq!(sanitize_game_name("plain-name_2"), "plain-name_2");
    }

    #[test]
    fn test_normalize_rejects_single_player() {
        let mut profile = test_profile(PathBuf::from("/bin/sh"));
        profile.num_players = 1;
        assert!(profile.normalize().is_err());
    }

    #[test]
    fn test_normalize_rejects_missing_exe() {
        let mut profile = test_profile(PathBuf::from("/nonexistent/game.exe"));
        assert!(profile.normalize().is_err());
    }

    #[test]
    fn test_normalize_pads_players() {
        let mut profile = test_profile(PathBuf::from("/bin/sh"));
        profile.num_players = 3;
        profile.normalize().unwrap();
        assert_eq!(profile.players.len(), 3);
        assert!(profile.is_native);
        assert_eq!(profile.game_name, "Test_Game_");
    }

    #[test]
    fn test_instance_dimensions_with_override() {
        let mut profile = test_profile(PathBuf::from("/bin/sh"));
        profile.normalize().unwrap();
        profile.players[1].width = Some(1280);
        profile.players[1].height = Some(720);
        assert_eq!(profile.get_instance_dimensions(1), (960, 540));
        assert_eq!(profile.get_instance_dimensions(2), (1280, 720));
        // Out-of-range instance falls back to profile resolution
        assert_eq!(profile.get_instance_dimensions(9), (960, 540));
    }

    #[test]
    fn test_selection() {
        let mut profile = test_profile(PathBuf::from("/bin/sh"));
        profile.num_players = 4;
        profile.normalize().unwrap();
        assert!(profile.is_selected(3));
        assert_eq!(profile.effective_num_players(), 4);

        profile.selected_players = vec![2, 4];
        assert!(!profile.is_selected(1));
        assert!(profile.is_selected(2));
        assert_eq!(profile.effective_num_players(), 2);
    }
}
