//! Gamescope nested compositor stage
//!
//! Builds the gamescope portion of the launch argv: fixed per-instance
//! resolution, an effectively uncapped frame rate so the compositor never
//! introduces stutter, and exclusive input grabbing when the instance has
//! its own mouse and keyboard.

use tracing::info;

use crate::devices::DeviceAssignment;
use crate::profile::GameProfile;

/// Build the gamescope invocation for one instance.
///
/// Returns an empty vector when gamescope is disabled in the profile; the
/// stage then contributes nothing to the final command.
pub fn build_gamescope_args(
    profile: &GameProfile,
    devices: &DeviceAssignment,
    instance_num: usize,
) -> Vec<String> {
    if !profile.use_gamescope {
        info!("Instance {}: Gamescope is disabled for this profile", instance_num);
        return Vec::new();
    }

    let (width, height) = profile.get_instance_dimensions(instance_num);

    let mut args = vec![
        "gamescope".to_string(),
        // Steam integration for proper launcher handling
        "-e".to_string(),
        "-W".to_string(),
        width.to_string(),
        "-H".to_string(),
        height.to_string(),
        "-w".to_string(),
        width.to_string(),
        "-h".to_string(),
        height.to_string(),
    ];

    // Cap focused and unfocused FPS at a ceiling high enough to never bind
    args.extend(["-o".to_string(), "999".to_string()]);
    args.extend(["-r".to_string(), "999".to_string()]);

    if profile.splitscreen_mode {
        // Borderless instead of fullscreen so windows can tile
        args.push("-b".to_string());
    } else {
        args.extend(["-f".to_string(), "--adaptive-sync".to_string()]);
    }

    if devices.grab_eligible() {
        info!(
            "Instance {}: Dedicated mouse and keyboard present, grabbing input exclusively",
            instance_num
        );
        args.extend(["--grab".to_string(), "--force-grab-cursor".to_string()]);
    }

    args
}

/// Separator between gamescope's own flags and the wrapped command.
pub fn separator() -> String {
    "--".to_string()
}
