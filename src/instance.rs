use std::path::PathBuf;

use crate::profile::PlayerInstanceConfig;

/// One isolated running copy of the game, bound to one player.
///
/// Owns an exclusive prefix directory and log file, both derived from the
/// instance number so no two instances can collide.
#[derive(Clone)]
pub struct GameInstance {
    /// 1-based, stable for the whole run
    pub instance_num: usize,
    /// Sanitized game name, used for directory naming
    pub profile_name: String,
    pub prefix_dir: PathBuf,
    pub log_file: PathBuf,
    pub player_config: PlayerInstanceConfig,
    /// Set once the process is spawned
    pub pid: Option<u32>,
}

impl GameInstance {
    /// Wine prefix inside the compat data dir
    pub fn pfx_dir(&self) -> PathBuf {
        self.prefix_dir.join("pfx")
    }

    /// Root of the mirrored game tree for this instance
    pub fn game_files_dir(&self) -> PathBuf {
        self.prefix_dir.join("game_files")
    }
}
