//! Instance orchestration
//!
//! Top-level coordinator for a run: validates host dependencies, computes
//! CPU partitions, creates and launches instances in ascending order, owns
//! the live process registry, monitors liveness and kills everything on
//! shutdown. Single control thread; concurrency exists only at the OS
//! process level once instances are spawned.

use std::fs::File;
use std::path::PathBuf;
use std::process::{Child, Command};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use sysinfo::{CpuRefreshKind, System};
use tracing::{error, info, warn};

use crate::cpu::partition_cores;
use crate::deps::{DependencyPreparer, command_on_path, validate_required_commands};
use crate::devices::resolve_devices;
use crate::error::{Error, Result};
use crate::instance::GameInstance;
use crate::launch::build_launch_argv;
use crate::mirror::build_game_mirror;
use crate::paths::PATH_COOP;
use crate::profile::GameProfile;
use crate::proton::{ProtonRuntime, build_env};

// Out-of-band cancellation: a signal handler flips this and the monitor
// loop reacts on its next poll.
static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// Signal-safe shutdown request, callable from a signal handler.
pub fn request_shutdown() {
    SHUTDOWN.store(true, Ordering::SeqCst);
}

fn shutdown_requested() -> bool {
    SHUTDOWN.load(Ordering::SeqCst)
}

/// Timing and dependency knobs for a run.
///
/// The stagger serializes first-run prefix initialization between spawns;
/// the poll interval paces the liveness loop. Both default to the values
/// tuned on desktop hardware.
pub struct LaunchTuning {
    pub stagger: Duration,
    pub poll_interval: Duration,
    /// Commands that must resolve on $PATH before any run, regardless of
    /// profile features
    pub required_commands: Vec<String>,
}

impl Default for LaunchTuning {
    fn default() -> Self {
        Self {
            stagger: Duration::from_secs(5),
            poll_interval: Duration::from_secs(5),
            required_commands: Vec::new(),
        }
    }
}

pub struct Orchestrator {
    data_dir: PathBuf,
    tuning: LaunchTuning,
    cpu_count: usize,
    /// Live process registry, owned by the single control thread
    children: Vec<(u32, Child)>,
}

impl Orchestrator {
    pub fn new() -> Self {
        Self::with_data_dir(PATH_COOP.clone(), LaunchTuning::default())
    }

    pub fn with_data_dir(data_dir: PathBuf, tuning: LaunchTuning) -> Self {
        let mut system = System::new();
        system.refresh_cpu_specifics(CpuRefreshKind::everything());
        let cpu_count = system.cpus().len().max(1);

        Self {
            data_dir,
            tuning,
            cpu_count,
            children: Vec::new(),
        }
    }

    /// PIDs currently tracked in the live registry.
    pub fn pids(&self) -> Vec<u32> {
        self.children.iter().map(|(pid, _)| *pid).collect()
    }

    fn logs_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }

    fn prefix_base_dir(&self, game_name: &str) -> PathBuf {
        self.data_dir.join("prefixes").join(game_name)
    }

    /// Confirm every hard external command is present before any instance
    /// is touched. Conditionally required tools are checked only when the
    /// profile enables the matching feature.
    pub fn validate_dependencies(&self, profile: &GameProfile) -> Result<()> {
        info!("Validating dependencies...");
        validate_required_commands(&self.tuning.required_commands)?;

        if profile.use_gamescope && !command_on_path("gamescope") {
            return Err(Error::Dependency(
                "gamescope is enabled for this profile but 'gamescope' was not found; \
                 install gamescope or disable it in the profile"
                    .into(),
            ));
        }
        if !profile.disable_bwrap && !command_on_path("bwrap") {
            return Err(Error::Dependency(
                "'bwrap' is required but not found; install bubblewrap or set \
                 disable_bwrap in the profile (not recommended)"
                    .into(),
            ));
        }
        info!("Dependencies validated successfully");
        Ok(())
    }

    /// Launch every selected instance of the profile.
    ///
    /// Fatal dependency and root-level filesystem errors unwind from here;
    /// per-instance failures are logged and skipped so siblings still
    /// launch. `runtime` must be supplied for non-native games.
    pub fn launch_instances(
        &mut self,
        profile: &GameProfile,
        runtime: Option<&ProtonRuntime>,
        preparer: Option<&dyn DependencyPreparer>,
    ) -> Result<()> {
        self.validate_dependencies(profile)?;

        if !profile.is_native && runtime.is_none() {
            return Err(Error::Dependency(format!(
                "'{}' needs a Proton runtime but none was located",
                profile.game_name
            )));
        }

        std::fs::create_dir_all(self.logs_dir())?;
        std::fs::create_dir_all(self.prefix_base_dir(&profile.game_name))?;

        let mut instances = self.create_instances(profile, preparer)?;
        if instances.is_empty() {
            info!("No instances to launch");
            return Ok(());
        }

        let core_assignments = partition_cores(self.cpu_count, instances.len());

        let game_root = profile
            .exe_path
            .parent()
            .ok_or_else(|| {
                Error::Profile(format!(
                    "executable {} has no parent directory",
                    profile.exe_path.display()
                ))
            })?
            .to_path_buf();

        info!(
            "Launching {} instance(s) of '{}'...",
            profile.effective_num_players(),
            profile.game_name
        );

        let count = instances.len();
        for (i, instance) in instances.iter_mut().enumerate() {
            if let Err(e) = self.launch_single(instance, profile, runtime, &game_root, &core_assignments[i])
            {
                error!("Instance {} will not launch: {}", instance.instance_num, e);
            }
            if i + 1 < count {
                std::thread::sleep(self.tuning.stagger);
            }
        }

        info!("All {} instance(s) processed", count);
        info!("PIDs: {:?}", self.pids());
        info!("Press CTRL+C to terminate all instances");
        Ok(())
    }

    /// Create instance state for every selected player, in index order.
    ///
    /// Directory creation is idempotent. Prefix preparation failures abort
    /// only the affected instance.
    pub(crate) fn create_instances(
        &self,
        profile: &GameProfile,
        preparer: Option<&dyn DependencyPreparer>,
    ) -> Result<Vec<GameInstance>> {
        let prefix_base = self.prefix_base_dir(&profile.game_name);
        let mut instances = Vec::new();

        for (i, player_config) in profile.players.iter().enumerate() {
            let instance_num = i + 1;

            if !profile.is_selected(instance_num) {
                info!("Skipping instance {} (not selected)", instance_num);
                continue;
            }

            let prefix_dir = prefix_base.join(format!("instance_{instance_num}"));
            let log_file = self
                .logs_dir()
                .join(format!("{}_instance_{}.log", profile.game_name, instance_num));
            std::fs::create_dir_all(&prefix_dir)?;
            std::fs::create_dir_all(prefix_dir.join("pfx"))?;

            if let Some(preparer) = preparer {
                if let Err(e) = Self::prepare_prefix(preparer, profile, &prefix_dir) {
                    error!(
                        "Instance {}: prefix preparation failed, instance skipped: {}",
                        instance_num, e
                    );
                    continue;
                }
            }

            instances.push(GameInstance {
                instance_num,
                profile_name: profile.game_name.clone(),
                prefix_dir,
                log_file,
                player_config: player_config.clone(),
                pid: None,
            });
        }

        Ok(instances)
    }

    fn prepare_prefix(
        preparer: &dyn DependencyPreparer,
        profile: &GameProfile,
        prefix_dir: &std::path::Path,
    ) -> Result<()> {
        // First-run initialization must finish before anything else touches
        // the prefix
        preparer.initialize_prefix(prefix_dir)?;
        if profile.apply_dxvk_vkd3d {
            preparer.apply_runtime_libraries(prefix_dir)?;
        }
        if !profile.winetricks_verbs.is_empty() {
            preparer.apply_extra_setup(prefix_dir, &profile.winetricks_verbs)?;
        }
        Ok(())
    }

    /// Mirror, resolve, compose and spawn one instance.
    ///
    /// A spawn failure is logged and leaves the instance out of the
    /// registry; only isolation errors propagate to the caller.
    fn launch_single(
        &mut self,
        instance: &mut GameInstance,
        profile: &GameProfile,
        runtime: Option<&ProtonRuntime>,
        game_root: &std::path::Path,
        cpu_cores: &str,
    ) -> Result<()> {
        info!(
            "Preparing instance {} (CPU cores: {})",
            instance.instance_num, cpu_cores
        );

        let report = build_game_mirror(instance, game_root, &profile.exe_path)?;
        let devices = resolve_devices(profile, instance.instance_num - 1);
        let env = build_env(instance, profile, runtime, &devices);
        let argv = build_launch_argv(
            profile,
            runtime,
            &devices,
            &report.exe_path,
            instance.instance_num,
        );

        let cwd = report.exe_path.parent().ok_or_else(|| Error::Isolation {
            instance: instance.instance_num,
            reason: format!("mirrored executable {} has no parent", report.exe_path.display()),
        })?;

        info!(
            "Launching instance {} (log: {}): {}",
            instance.instance_num,
            instance.log_file.display(),
            argv.join(" ")
        );

        let log = File::create(&instance.log_file)?;
        let log_err = log.try_clone()?;

        let mut cmd = Command::new(&argv[0]);
        cmd.args(&argv[1..])
            .env_clear()
            .envs(&env)
            .current_dir(cwd)
            .stdout(log)
            .stderr(log_err);

        match cmd.spawn() {
            Ok(child) => {
                let pid = child.id();
                instance.pid = Some(pid);
                self.children.push((pid, child));
                info!("Instance {} started with PID {}", instance.instance_num, pid);
            }
            Err(e) => {
                error!("Failed to launch instance {}: {}", instance.instance_num, e);
            }
        }
        Ok(())
    }

    /// Drop registry entries whose process has exited.
    fn prune_dead(&mut self) {
        self.children.retain_mut(|(pid, child)| match child.try_wait() {
            Ok(Some(status)) => {
                info!("PID {} exited ({})", pid, status);
                false
            }
            Ok(None) => true,
            Err(e) => {
                warn!("PID {} could not be polled, dropping: {}", pid, e);
                false
            }
        });
    }

    /// Block until every tracked instance has exited.
    ///
    /// Polls the registry at the configured interval; reacts to an
    /// out-of-band shutdown request by killing everything.
    pub fn monitor_and_wait(&mut self) {
        loop {
            self.prune_dead();
            if self.children.is_empty() {
                break;
            }
            if shutdown_requested() {
                self.terminate_all();
                continue;
            }
            std::thread::sleep(self.tuning.poll_interval);
        }
        info!("All instances have terminated");
    }

    /// Kill every tracked instance, unconditionally and without waiting.
    ///
    /// Killing a bwrap wrapper takes down everything inside its namespace.
    /// A PID that is already gone is not an error. Idempotent.
    pub fn terminate_all(&mut self) {
        if self.children.is_empty() {
            return;
        }

        info!("Terminating PIDs with SIGKILL: {:?}", self.pids());
        for (pid, _) in &self.children {
            // ESRCH (already gone) is expected, everything else is logged
            let ret = unsafe { libc::kill(*pid as libc::pid_t, libc::SIGKILL) };
            if ret == 0 {
                info!("Sent SIGKILL to PID {}", pid);
            } else {
                let errno = std::io::Error::last_os_error();
                if errno.raw_os_error() == Some(libc::ESRCH) {
                    info!("PID {} not found, likely already terminated", pid);
                } else {
                    error!("Failed to kill PID {}: {}", pid, errno);
                }
            }
        }
        self.children.clear();
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}
