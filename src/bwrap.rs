//! Bubblewrap sandbox stage
//!
//! Wraps the whole instance command in a bwrap container. The container
//! sees the full host filesystem (the game reaches its mirror through it)
//! but gets a private /dev/input: only the devices resolved for this
//! instance are bound in. No resolved devices means an empty /dev/input,
//! never host-wide device visibility.

use tracing::info;

use crate::devices::DeviceAssignment;

/// Build the bwrap invocation for one instance.
pub fn build_bwrap_args(devices: &DeviceAssignment, instance_num: usize) -> Vec<String> {
    let mut args: Vec<String> = [
        "bwrap",
        "--die-with-parent",
        "--dev-bind",
        "/",
        "/",
        "--proc",
        "/proc",
        "--tmpfs",
        "/tmp",
        "--cap-add",
        "all",
    ]
    .into_iter()
    .map(str::to_string)
    .collect();

    // Always replace /dev/input, even when nothing gets bound back in
    args.extend(["--tmpfs".to_string(), "/dev/input".to_string()]);

    let bind_paths = devices.bind_paths();
    if bind_paths.is_empty() {
        info!(
            "Instance {}: No input devices to bind, /dev/input stays empty",
            instance_num
        );
    }
    for path in bind_paths {
        info!("Instance {}: bwrap will bind '{}'", instance_num, path);
        args.extend(["--dev-bind".to_string(), path.to_string(), path.to_string()]);
    }

    args
}
