//! Fixed-period cycle driver: hub first, then every subsystem.
//!
//! ## Cycle Body
//! 1. `hub.run(signals)`: derive the operating phase, publish it on change.
//! 2. Only when the signals resolve to a run mode (enabled, autonomous or
//!    manual): every registered subsystem's `run_for_mode`, in registration
//!    order. Disabled and test cycles run no subsystem.
//!
//! ## Pacing
//! Absolute-deadline sleep: the next wake time advances by exactly one period
//! per cycle. A cycle that overruns its period is counted in [`CycleStats`]
//! and the deadline resynchronises to "now"; the loop never tries to catch
//! up with back-to-back cycles. With the `rt` feature the sleep is
//! `clock_nanosleep(TIMER_ABSTIME)` on `CLOCK_MONOTONIC`.
//!
//! ## RT Setup
//! [`rt_setup`] locks memory, prefaults the stack, pins the thread and
//! switches to `SCHED_FIFO`. Every step is a no-op without the `rt` feature.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use cadence_common::config::CycleConfig;
use cadence_common::phase::{ModeSignals, OperatingPhase, RunMode};
use tracing::{debug, info, warn};

use crate::error::{CycleError, StateError};
use crate::hub::StateChangeHub;

/// Overruns between two overrun warnings after the first one.
const OVERRUN_LOG_EVERY: u64 = 100;

// ─── Seams ──────────────────────────────────────────────────────────

/// A unit of control logic run once per enabled cycle.
///
/// Implemented by every [`StateMachineManager`](crate::state::manager::StateMachineManager).
pub trait Subsystem {
    fn name(&self) -> &str;

    fn run_for_mode(&mut self, mode: RunMode, hub: &StateChangeHub) -> Result<(), StateError>;
}

/// Host-side mode reporting, sampled once at the start of every cycle.
pub trait ModeSource {
    fn signals(&mut self) -> ModeSignals;

    /// A finite source (scripted timeline) reports `true` once it has no
    /// more cycles to give; the driver then stops.
    fn finished(&self) -> bool {
        false
    }
}

impl<F> ModeSource for F
where
    F: FnMut() -> ModeSignals,
{
    fn signals(&mut self) -> ModeSignals {
        self()
    }
}

// ─── Cycle Statistics ───────────────────────────────────────────────

/// O(1) per-cycle timing statistics.
#[derive(Debug, Clone)]
pub struct CycleStats {
    /// Total cycles executed.
    pub cycle_count: u64,
    /// Last cycle duration [ns].
    pub last_cycle_ns: u64,
    /// Minimum cycle duration [ns].
    pub min_cycle_ns: u64,
    /// Maximum cycle duration [ns].
    pub max_cycle_ns: u64,
    /// Running sum for average computation.
    pub sum_cycle_ns: u128,
    /// Cycles whose body took longer than the period.
    pub overruns: u64,
}

impl CycleStats {
    pub const fn new() -> Self {
        Self {
            cycle_count: 0,
            last_cycle_ns: 0,
            min_cycle_ns: u64::MAX,
            max_cycle_ns: 0,
            sum_cycle_ns: 0,
            overruns: 0,
        }
    }

    /// Record a cycle duration against `budget_ns`. Returns `true` on overrun.
    #[inline]
    pub fn record(&mut self, duration_ns: u64, budget_ns: u64) -> bool {
        self.cycle_count += 1;
        self.last_cycle_ns = duration_ns;
        self.min_cycle_ns = self.min_cycle_ns.min(duration_ns);
        self.max_cycle_ns = self.max_cycle_ns.max(duration_ns);
        self.sum_cycle_ns += u128::from(duration_ns);
        let overrun = duration_ns > budget_ns;
        if overrun {
            self.overruns += 1;
        }
        overrun
    }

    /// Average cycle time [ns] (0 if no cycles).
    #[inline]
    pub fn avg_cycle_ns(&self) -> u64 {
        if self.cycle_count == 0 {
            0
        } else {
            (self.sum_cycle_ns / u128::from(self.cycle_count)) as u64
        }
    }
}

impl Default for CycleStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of one [`CycleDriver::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    /// 1-based number of this cycle.
    pub cycle: u64,
    /// Phase after the hub update.
    pub phase: OperatingPhase,
    /// Whether the phase changed (and was published) this cycle.
    pub phase_changed: bool,
    /// Mode handed to the subsystems; `None` when none ran.
    pub mode: Option<RunMode>,
    /// Subsystems run this cycle.
    pub subsystems_run: usize,
    /// Time spent in the cycle body.
    pub duration: Duration,
    /// Body took longer than the configured period.
    pub overrun: bool,
}

// ─── Cycle Driver ───────────────────────────────────────────────────

/// Owns the hub and the subsystems and invokes them once per period.
pub struct CycleDriver {
    hub: StateChangeHub,
    subsystems: Vec<Box<dyn Subsystem>>,
    config: CycleConfig,
    stats: CycleStats,
}

impl CycleDriver {
    pub fn new(hub: StateChangeHub, config: CycleConfig) -> Self {
        Self {
            hub,
            subsystems: Vec::new(),
            config,
            stats: CycleStats::new(),
        }
    }

    /// Append a subsystem; subsystems run in the order they were added.
    pub fn add_subsystem(&mut self, subsystem: Box<dyn Subsystem>) {
        debug!(subsystem = subsystem.name(), "subsystem added");
        self.subsystems.push(subsystem);
    }

    pub fn hub(&self) -> &StateChangeHub {
        &self.hub
    }

    /// Mutable hub access for late subscriber registration.
    pub fn hub_mut(&mut self) -> &mut StateChangeHub {
        &mut self.hub
    }

    pub fn stats(&self) -> &CycleStats {
        &self.stats
    }

    pub fn subsystem_count(&self) -> usize {
        self.subsystems.len()
    }

    /// Execute one cycle body for `signals`.
    ///
    /// # Errors
    /// - `CycleError::Hub` if publishing the phase change failed.
    /// - `CycleError::Subsystem` with the first subsystem fault; later
    ///   subsystems do not run this cycle.
    pub fn step(&mut self, signals: ModeSignals) -> Result<CycleReport, CycleError> {
        let start = Instant::now();

        let phase_change = self.hub.run(signals)?;

        let mode = signals.run_mode();
        let mut subsystems_run = 0;
        if let Some(mode) = mode {
            for subsystem in &mut self.subsystems {
                subsystem
                    .run_for_mode(mode, &self.hub)
                    .map_err(|source| CycleError::Subsystem {
                        name: subsystem.name().to_string(),
                        source,
                    })?;
                subsystems_run += 1;
            }
        }

        let duration = start.elapsed();
        let budget_ns = u64::from(self.config.period_us) * 1_000;
        let overrun = self.stats.record(duration.as_nanos() as u64, budget_ns);

        Ok(CycleReport {
            cycle: self.stats.cycle_count,
            phase: self.hub.phase(),
            phase_changed: phase_change.is_some(),
            mode,
            subsystems_run,
            duration,
            overrun,
        })
    }

    /// Run the fixed-period loop.
    ///
    /// Stops when `running` clears, when `source` reports it is finished, or
    /// after `max_cycles` cycles. Returns the number of cycles executed by
    /// this call.
    ///
    /// # Errors
    /// The first error of [`step`](Self::step); the loop stops on it.
    pub fn run(
        &mut self,
        source: &mut dyn ModeSource,
        running: &AtomicBool,
        max_cycles: Option<u64>,
    ) -> Result<u64, CycleError> {
        let mut pacer = Pacer::start(self.config.period())?;
        let stats_interval = u64::from(self.config.stats_interval);
        let mut executed = 0u64;

        info!(
            period_us = self.config.period_us,
            subsystems = self.subsystems.len(),
            "cycle loop started"
        );

        while running.load(Ordering::SeqCst) {
            if max_cycles.is_some_and(|max| executed >= max) || source.finished() {
                break;
            }

            let report = self.step(source.signals())?;
            executed += 1;

            if report.phase_changed {
                info!(cycle = report.cycle, phase = %report.phase, "phase changed");
            }

            if report.overrun {
                let overruns = self.stats.overruns;
                if overruns == 1 || overruns % OVERRUN_LOG_EVERY == 0 {
                    warn!(
                        cycle = report.cycle,
                        duration_us = report.duration.as_micros() as u64,
                        budget_us = self.config.period_us,
                        overruns,
                        "cycle overrun"
                    );
                }
            }

            if stats_interval != 0 && report.cycle % stats_interval == 0 {
                info!(
                    cycles = self.stats.cycle_count,
                    min_us = self.stats.min_cycle_ns / 1_000,
                    avg_us = self.stats.avg_cycle_ns() / 1_000,
                    max_us = self.stats.max_cycle_ns / 1_000,
                    overruns = self.stats.overruns,
                    "cycle stats"
                );
            }

            pacer.wait()?;
        }

        info!(executed, total = self.stats.cycle_count, "cycle loop stopped");
        Ok(executed)
    }
}

// ─── Pacing ─────────────────────────────────────────────────────────

/// Absolute-deadline sleeper on the monotonic clock.
#[cfg(not(feature = "rt"))]
struct Pacer {
    period: Duration,
    next_wake: Instant,
}

#[cfg(not(feature = "rt"))]
impl Pacer {
    fn start(period: Duration) -> Result<Self, CycleError> {
        Ok(Self {
            period,
            next_wake: Instant::now(),
        })
    }

    fn wait(&mut self) -> Result<(), CycleError> {
        self.next_wake += self.period;
        let now = Instant::now();
        match self.next_wake.checked_duration_since(now) {
            Some(remaining) => std::thread::sleep(remaining),
            None => self.next_wake = now,
        }
        Ok(())
    }
}

#[cfg(feature = "rt")]
struct Pacer {
    period_ns: i64,
    next_wake: nix::sys::time::TimeSpec,
}

#[cfg(feature = "rt")]
impl Pacer {
    const CLOCK: nix::time::ClockId = nix::time::ClockId::CLOCK_MONOTONIC;

    fn now() -> Result<nix::sys::time::TimeSpec, CycleError> {
        nix::time::clock_gettime(Self::CLOCK)
            .map_err(|e| CycleError::RtSetup(format!("clock_gettime: {e}")))
    }

    fn start(period: Duration) -> Result<Self, CycleError> {
        Ok(Self {
            period_ns: period.as_nanos() as i64,
            next_wake: Self::now()?,
        })
    }

    fn wait(&mut self) -> Result<(), CycleError> {
        use nix::time::{ClockNanosleepFlags, clock_nanosleep};

        self.next_wake = timespec_add_ns(self.next_wake, self.period_ns);
        let now = Self::now()?;
        if timespec_diff_ns(&self.next_wake, &now) <= 0 {
            self.next_wake = now;
            return Ok(());
        }
        let _ = clock_nanosleep(Self::CLOCK, ClockNanosleepFlags::TIMER_ABSTIME, &self.next_wake);
        Ok(())
    }
}

/// Add nanoseconds to a TimeSpec.
#[cfg(feature = "rt")]
fn timespec_add_ns(ts: nix::sys::time::TimeSpec, ns: i64) -> nix::sys::time::TimeSpec {
    let total = ts.tv_nsec() + ns;
    let secs = ts.tv_sec() + total.div_euclid(1_000_000_000);
    let nanos = total.rem_euclid(1_000_000_000);
    nix::sys::time::TimeSpec::new(secs, nanos)
}

/// Difference (a - b) in nanoseconds.
#[cfg(feature = "rt")]
fn timespec_diff_ns(a: &nix::sys::time::TimeSpec, b: &nix::sys::time::TimeSpec) -> i64 {
    (a.tv_sec() - b.tv_sec()) * 1_000_000_000 + (a.tv_nsec() - b.tv_nsec())
}

// ─── RT Setup ───────────────────────────────────────────────────────

/// Lock all current and future memory pages.
#[cfg(feature = "rt")]
fn rt_mlockall() -> Result<(), CycleError> {
    use nix::sys::mman::{MlockallFlags, mlockall};
    mlockall(MlockallFlags::MCL_CURRENT | MlockallFlags::MCL_FUTURE)
        .map_err(|e| CycleError::RtSetup(format!("mlockall failed: {e}")))
}

#[cfg(not(feature = "rt"))]
fn rt_mlockall() -> Result<(), CycleError> {
    Ok(())
}

/// Touch 256 KiB of stack so the control thread does not fault pages in later.
#[cfg(feature = "rt")]
fn prefault_stack() {
    let mut buf = [0u8; 256 * 1024];
    for byte in buf.iter_mut() {
        // SAFETY: `byte` is a valid, exclusive reference into `buf`.
        unsafe { core::ptr::write_volatile(byte, 0xFF) };
    }
    core::hint::black_box(&buf);
}

#[cfg(not(feature = "rt"))]
fn prefault_stack() {}

/// Pin the current thread to `cpu`.
#[cfg(feature = "rt")]
fn rt_set_affinity(cpu: usize) -> Result<(), CycleError> {
    use nix::sched::{CpuSet, sched_setaffinity};
    use nix::unistd::Pid;

    let mut cpuset = CpuSet::new();
    cpuset
        .set(cpu)
        .map_err(|e| CycleError::RtSetup(format!("CpuSet::set({cpu}) failed: {e}")))?;
    sched_setaffinity(Pid::from_raw(0), &cpuset)
        .map_err(|e| CycleError::RtSetup(format!("sched_setaffinity failed: {e}")))
}

#[cfg(not(feature = "rt"))]
fn rt_set_affinity(_cpu: usize) -> Result<(), CycleError> {
    Ok(())
}

/// Switch to SCHED_FIFO at `priority`.
#[cfg(feature = "rt")]
fn rt_set_scheduler(priority: i32) -> Result<(), CycleError> {
    let param = libc::sched_param {
        sched_priority: priority,
    };
    // SAFETY: `param` outlives the call; pid 0 is the calling thread.
    let ret = unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) };
    if ret != 0 {
        let err = std::io::Error::last_os_error();
        return Err(CycleError::RtSetup(format!(
            "sched_setscheduler(SCHED_FIFO, {priority}) failed: {err}"
        )));
    }
    Ok(())
}

#[cfg(not(feature = "rt"))]
fn rt_set_scheduler(_priority: i32) -> Result<(), CycleError> {
    Ok(())
}

/// Prepare the calling thread for the control loop.
///
/// Call once, before [`CycleDriver::run`]. All steps are no-ops without the
/// `rt` feature.
pub fn rt_setup(cpu_core: usize, rt_priority: i32) -> Result<(), CycleError> {
    rt_mlockall()?;
    prefault_stack();
    rt_set_affinity(cpu_core)?;
    rt_set_scheduler(rt_priority)?;
    debug!(cpu_core, rt_priority, rt = cfg!(feature = "rt"), "rt setup done");
    Ok(())
}

// ─── Tests ──────────────────────────────────────────────────────────
