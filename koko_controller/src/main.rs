//! # Koko Joint Controller
//!
//! Runs the joint torque controller against the simulated arm.
//!
//! Loads and validates the controller TOML, activates on the arm's current
//! pose, applies an optional target, performs RT setup and enters the cycle
//! loop. The config file is watched; gain and zero-gravity changes are
//! hot-reloaded, structural changes are rejected.

use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, SystemTime};

use clap::Parser;
use koko_common::consts::DEFAULT_CONFIG_PATH;
use koko_controller::config::{LoadedConfig, ReloadResult, atomic_config_swap, load_config};
use koko_controller::cycle::{CycleRunner, JointController, rt_setup};
use koko_controller::diagnostics::LogDiagnostics;
use koko_controller::error::ControllerError;
use koko_controller::sim::SimulatedArm;
use koko_controller::state::inputs::ControllerHandle;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Config file poll period for hot reload.
const RELOAD_POLL: Duration = Duration::from_millis(500);

/// Koko joint controller (simulated arm)
#[derive(Parser, Debug)]
#[command(name = "koko_controller")]
#[command(version)]
#[command(about = "PD + compensation joint torque controller")]
struct Args {
    /// Path to the controller configuration TOML.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Stop after this many cycles (default: run until Ctrl-C).
    #[arg(long)]
    cycles: Option<u64>,

    /// Initial position target per joint [rad], comma separated.
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    target: Vec<f64>,

    /// Start in zero-gravity mode regardless of the config file.
    #[arg(long)]
    zero_g: bool,

    /// Gravity load moment of every simulated joint [kg·m].
    #[arg(long, default_value_t = 0.05)]
    load_moment: f64,

    /// Initial position of every simulated joint [rad].
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    start: f64,

    /// Report an extra joint the controller does not know about.
    #[arg(long, value_name = "NAME")]
    stray_joint: Option<String>,

    /// CPU core to pin the cycle thread to.
    #[arg(long, default_value_t = 1)]
    cpu_core: usize,

    /// SCHED_FIFO priority.
    #[arg(long, default_value_t = 80)]
    rt_priority: i32,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();

    let loaded = load_config(&args.config);
    let level = match (&loaded, args.verbose) {
        (_, true) => "debug",
        (Ok(l), false) => l.config.log_level.as_directive(),
        (Err(_), false) => "info",
    };
    setup_tracing(level, args.json);

    info!("koko controller v{} starting", env!("CARGO_PKG_VERSION"));

    let result = loaded
        .map_err(ControllerError::from)
        .and_then(|loaded| run(&args, loaded));
    if let Err(e) = result {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("koko controller shutdown complete");
}

fn run(args: &Args, loaded: LoadedConfig) -> Result<(), ControllerError> {
    info!(
        cycle_time_us = loaded.config.cycle_time_us,
        joints = loaded.model.len(),
        pairs = loaded.pairs.len(),
        "config OK"
    );

    let n = loaded.model.len();
    let mut arm = SimulatedArm::from_config(&loaded.config)
        .with_positions(&vec![args.start; n])
        .with_load_moments(&vec![args.load_moment; n]);
    if let Some(name) = &args.stray_joint {
        arm = arm.with_stray_joint(name.clone());
    }

    let controller = JointController::activate(&loaded, &mut arm)?;
    let handle = controller.handle();
    if args.zero_g {
        handle.set_zero_gravity(true);
    }
    if !args.target.is_empty() {
        handle.set_commands(&args.target)?;
        info!(targets = ?args.target, "initial target applied");
    }

    rt_setup(args.cpu_core, args.rt_priority)?;
    info!(
        cpu_core = args.cpu_core,
        priority = args.rt_priority,
        "RT setup complete"
    );

    let mut runner = CycleRunner::new(controller, &loaded, arm, LogDiagnostics);
    if let Some(cycles) = args.cycles {
        runner = runner.with_max_cycles(cycles);
    }

    let running = runner.running_flag();
    let r = running.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("received shutdown signal");
        r.store(false, Ordering::Release);
    }) {
        warn!(error = %e, "no signal handler installed");
    }

    let watcher = spawn_reload_watcher(args.config.clone(), loaded, handle, running.clone());

    let result = runner.run();
    running.store(false, Ordering::Release);
    if watcher.join().is_err() {
        warn!("config watcher panicked");
    }
    result?;

    let joints = runner.controller().joints();
    for (spec, joint) in runner.controller().model().iter().zip(joints) {
        info!(
            joint = %spec.name,
            position = joint.position,
            commanded = joint.commanded_position,
            torque = joint.torque,
            "final state"
        );
    }
    let counters = runner.controller().counters();
    info!(
        clamped = counters.clamped,
        scaled_pairs = counters.scaled_pairs,
        forced_zero = counters.forced_zero,
        unmatched = counters.unmatched_samples,
        "saturation totals"
    );
    Ok(())
}

/// Poll the config file and hot-reload gains when it changes.
fn spawn_reload_watcher(
    path: PathBuf,
    mut active: LoadedConfig,
    handle: ControllerHandle,
    running: Arc<AtomicBool>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut last_modified = modified(&path);
        while running.load(Ordering::Acquire) {
            thread::sleep(RELOAD_POLL);
            let current = modified(&path);
            if current.is_none() || current == last_modified {
                continue;
            }
            last_modified = current;

            match std::fs::read_to_string(&path) {
                Ok(src) => match atomic_config_swap(&mut active, &src, &handle) {
                    ReloadResult::Success => info!(path = %path.display(), "gains hot-reloaded"),
                    ReloadResult::ValidationFailed(reason) => {
                        warn!(%reason, "hot reload rejected, keeping active config")
                    }
                },
                Err(e) => warn!(error = %e, "config re-read failed"),
            }
        }
    })
}

fn modified(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Setup tracing subscriber. `RUST_LOG` overrides `default_level`.
fn setup_tracing(default_level: &str, json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}
