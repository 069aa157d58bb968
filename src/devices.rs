//! Per-instance input/audio device resolution
//!
//! Devices configured in the profile are validated (must exist and be
//! character devices) before they are allowed anywhere near the sandbox.
//! Validation failures drop the device with a warning; they never abort a
//! launch. The result is resolved exactly once per instance and threaded
//! through command construction.

use std::os::unix::fs::FileTypeExt;
use std::path::Path;

use tracing::{info, warn};

use crate::profile::GameProfile;

/// Resolved devices for one instance.
#[derive(Clone, Default, PartialEq, Debug)]
pub struct DeviceAssignment {
    pub mouse_path: Option<String>,
    pub keyboard_path: Option<String>,
    pub joystick_path: Option<String>,
    /// Opaque audio sink id, no filesystem validation
    pub audio_device_id: Option<String>,
}

impl DeviceAssignment {
    pub fn has_dedicated_mouse(&self) -> bool {
        self.mouse_path.is_some()
    }

    pub fn has_dedicated_keyboard(&self) -> bool {
        self.keyboard_path.is_some()
    }

    /// Exclusive input grab requires both a validated mouse and keyboard.
    pub fn grab_eligible(&self) -> bool {
        self.has_dedicated_mouse() && self.has_dedicated_keyboard()
    }

    /// Device paths to bind into the sandbox, in a stable order.
    pub fn bind_paths(&self) -> Vec<&str> {
        [&self.joystick_path, &self.mouse_path, &self.keyboard_path]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .collect()
    }
}

/// Resolve the device assignment for a zero-based player index.
pub fn resolve_devices(profile: &GameProfile, instance_idx: usize) -> DeviceAssignment {
    let instance_num = instance_idx + 1;
    let Some(player) = profile.players.get(instance_idx) else {
        return DeviceAssignment::default();
    };

    let mut assignment = DeviceAssignment {
        mouse_path: validate_char_device(&player.mouse_event_path, "mouse", instance_num),
        keyboard_path: validate_char_device(&player.keyboard_event_path, "keyboard", instance_num),
        joystick_path: validate_char_device(&player.physical_device_id, "joystick", instance_num),
        audio_device_id: None,
    };

    if !player.audio_device_id.trim().is_empty() {
        info!(
            "Instance {}: Audio device '{}' assigned",
            instance_num, player.audio_device_id
        );
        assignment.audio_device_id = Some(player.audio_device_id.clone());
    }

    assignment
}

/// Validate that a configured device path exists and is a character device.
///
/// Returns None (device dropped) on any failure; the instance still
/// launches without it.
fn validate_char_device(path_str: &str, kind: &str, instance_num: usize) -> Option<String> {
    let path_str = path_str.trim();
    if path_str.is_empty() {
        return None;
    }

    let path = Path::new(path_str);
    let is_char_device = std::fs::metadata(path)
        .map(|md| md.file_type().is_char_device())
        .unwrap_or(false);

    if !is_char_device {
        warn!(
            "Instance {}: {} device '{}' specified in profile but not found or not a char device",
            instance_num, kind, path_str
        );
        return None;
    }

    match evdev_display_name(path) {
        Some(name) => info!(
            "Instance {}: {} device '{}' validated ({})",
            instance_num, kind, path_str, name
        ),
        None => info!(
            "Instance {}: {} device '{}' validated",
            instance_num, kind, path_str
        ),
    }

    Some(path_str.to_string())
}

/// Human-readable device name for diagnostics, when the node is readable.
fn evdev_display_name(path: &Path) -> Option<String> {
    let device = evdev::Device::open(path).ok()?;
    device.name().map(str::to_string)
}
