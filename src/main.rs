mod bwrap;
mod cpu;
mod deps;
mod devices;
mod error;
mod gamescope;
mod instance;
mod launch;
mod mirror;
mod orchestrator;
mod paths;
mod profile;
mod proton;

use std::path::PathBuf;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::deps::{DependencyPreparer, ProtonPreparer};
use crate::error::Result;
use crate::orchestrator::{LaunchTuning, Orchestrator};
use crate::profile::load_profile;
use crate::proton::ProtonRuntime;

extern "C" fn handle_sigint(_: libc::c_int) {
    orchestrator::request_shutdown();
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|arg| arg == "--help") {
        println!("{}", USAGE_TEXT);
        std::process::exit(0);
    }

    let mut profile_path = None;
    if let Some(profile_index) = args.iter().position(|arg| arg == "--profile") {
        if let Some(next_arg) = args.get(profile_index + 1) {
            profile_path = Some(PathBuf::from(next_arg));
        } else {
            eprintln!("{}", USAGE_TEXT);
            std::process::exit(1);
        }
    }
    let Some(profile_path) = profile_path else {
        eprintln!("{}", USAGE_TEXT);
        std::process::exit(1);
    };

    let mut selected_players = Vec::new();
    if let Some(players_index) = args.iter().position(|arg| arg == "--players") {
        if let Some(next_arg) = args.get(players_index + 1) {
            selected_players = next_arg
                .split(',')
                .filter_map(|p| p.trim().parse::<usize>().ok())
                .collect();
        } else {
            eprintln!("{}", USAGE_TEXT);
            std::process::exit(1);
        }
    }

    // Out-of-band cancellation: CTRL+C asks the monitor loop to kill
    // everything on its next poll
    let handler = handle_sigint as extern "C" fn(libc::c_int);
    unsafe {
        libc::signal(libc::SIGINT, handler as libc::sighandler_t);
        libc::signal(libc::SIGTERM, handler as libc::sighandler_t);
    }

    if let Err(e) = run(&profile_path, selected_players) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run(profile_path: &std::path::Path, selected_players: Vec<usize>) -> Result<()> {
    let mut profile = load_profile(profile_path)?;
    if !selected_players.is_empty() {
        profile.selected_players = selected_players;
    }

    // Proton discovery happens up front; the orchestrator only consumes the
    // located runtime
    let runtime: Option<ProtonRuntime> = if profile.is_native {
        None
    } else {
        let version = profile.proton_version.as_deref().unwrap_or("Experimental");
        Some(proton::find_proton(version)?)
    };
    let preparer: Option<ProtonPreparer> =
        runtime.as_ref().map(|r| ProtonPreparer::new(r.clone()));

    let mut orch = Orchestrator::with_data_dir(paths::PATH_COOP.clone(), LaunchTuning::default());
    orch.launch_instances(
        &profile,
        runtime.as_ref(),
        preparer.as_ref().map(|p| p as &dyn DependencyPreparer),
    )?;
    orch.monitor_and_wait();
    orch.terminate_all();

    info!("Run finished");
    Ok(())
}

static USAGE_TEXT: &str = r#"
Usage: coopscope --profile <path> [OPTIONS]

Options:
    --profile <path>      Game profile (JSON) to launch
    --players <list>      Comma-separated 1-based instance numbers to launch
                          (e.g. "2,4"). Defaults to every player in the profile.
    --help                Show this help
"#;
