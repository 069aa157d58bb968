use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use tracing::info;

use crate::error::{Error, Result};
use crate::profile::types::GameProfile;

/// Load and validate a game profile from a JSON file.
pub fn load_profile(path: &Path) -> Result<GameProfile> {
    let file = File::open(path).map_err(|e| {
        Error::Profile(format!("cannot open profile {}: {}", path.display(), e))
    })?;
    let mut profile: GameProfile = serde_json::from_reader(BufReader::new(file))?;
    profile.normalize()?;
    info!(
        "Loaded profile '{}' ({} players, {})",
        profile.game_name,
        profile.num_players,
        if profile.is_native { "native" } else { "proton" }
    );
    Ok(profile)
}
