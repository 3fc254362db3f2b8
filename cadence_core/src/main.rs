//! # Cadence Simulation Host
//!
//! Loads a `CoreConfig`, builds the state-change hub and the demo subsystems,
//! and drives them from the scripted mode timeline in `[sim]` until the
//! timeline is exhausted or Ctrl-C.

mod demo;

use std::cell::RefCell;
use std::path::PathBuf;
use std::process;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use cadence_common::config::{ConfigLoader, CoreConfig, LogLevel};
use cadence_common::topic::Topic;
use cadence_core::cycle::{CycleDriver, rt_setup};
use cadence_core::hub::StateChangeHub;
use cadence_core::sim::ScriptedModeSource;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Cadence: state-change hub and subsystem state machines on a fixed cycle
#[derive(Parser, Debug)]
#[command(name = "cadence_core")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Runs the Cadence control core against a scripted mode timeline")]
struct Args {
    /// Path to the configuration TOML.
    #[arg(default_value = cadence_common::consts::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Stop after this many cycles even if the timeline continues.
    #[arg(long)]
    max_cycles: Option<u64>,

    /// Skip mlockall / affinity / SCHED_FIFO even when built with `rt`.
    #[arg(long)]
    no_rt: bool,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();
    let config = CoreConfig::load(&args.config);
    setup_tracing(&args, config.as_ref().ok().map(|c| c.shared.log_level));

    info!("Cadence v{} starting...", env!("CARGO_PKG_VERSION"));

    let result = config
        .map_err(|e| -> Box<dyn std::error::Error> {
            format!("{}: {e}", args.config.display()).into()
        })
        .and_then(|config| run(&args, config));
    if let Err(e) = result {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("Cadence shutdown complete");
}

fn run(args: &Args, config: CoreConfig) -> Result<(), Box<dyn std::error::Error>> {
    config.validate()?;
    info!(
        service = %config.shared.service_name,
        team = config.robot.team_number,
        variant = ?config.robot.variant(),
        period_us = config.cycle.period_us,
        "config OK"
    );

    let mut hub = StateChangeHub::new();
    let phase_logger = Rc::new(RefCell::new(demo::PhaseLogger::default()));
    hub.register_for_state_changes(&phase_logger, Topic::GamePhase)?;

    let subsystems = demo::build_subsystems(&config.subsystems, &mut hub, config.cycle.period())?;
    if subsystems.is_empty() {
        warn!("no subsystems enabled; only the phase will be tracked");
    }

    let mut driver = CycleDriver::new(hub, config.cycle.clone());
    for subsystem in subsystems {
        driver.add_subsystem(subsystem);
    }

    if args.no_rt {
        info!("RT setup skipped");
    } else {
        rt_setup(config.cycle.cpu_core, config.cycle.rt_priority)?;
        info!(
            cpu_core = config.cycle.cpu_core,
            priority = config.cycle.rt_priority,
            "RT setup complete"
        );
    }

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    })?;

    let mut source = ScriptedModeSource::from_config(&config.sim);
    info!(cycles = config.sim.total_cycles(), "running sim timeline");
    let executed = driver.run(&mut source, &running, args.max_cycles)?;

    let stats = driver.stats();
    info!(
        executed,
        phase = %driver.hub().phase(),
        phase_changes = phase_logger.borrow().changes,
        published = driver.hub().published(),
        dropped = driver.hub().dropped(),
        avg_us = stats.avg_cycle_ns() / 1_000,
        max_us = stats.max_cycle_ns / 1_000,
        overruns = stats.overruns,
        "run finished"
    );
    Ok(())
}

/// Install the global subscriber.
///
/// `--verbose` forces DEBUG; otherwise `RUST_LOG` wins over the configured
/// level.
fn setup_tracing(args: &Args, configured: Option<LogLevel>) {
    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        let default = configured.unwrap_or_default().as_directive();
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
    };

    if args.json {
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
