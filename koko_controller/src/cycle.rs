//! Periodic control cycle: snapshot → read → law → write.
//!
//! ## Activation
//! [`JointController::activate`] reads one joint-state sample and sets every
//! target to the measured position, so the first cycle holds the current
//! pose.
//!
//! ## Cycle Body
//! 1. Copy asynchronous inputs (commands, gains, zero-gravity) into the
//!    pre-allocated snapshot.
//! 2. Read joint state by name, then compensation torques.
//! 3. Law → per-joint clamp → pair budget.
//! 4. Write the full torque vector.
//!
//! Nothing in the body allocates or blocks beyond the short input locks.
//!
//! ## RT Setup
//! With the `rt` feature: `mlockall`, stack prefault, CPU affinity and
//! `SCHED_FIFO`, then `clock_nanosleep(TIMER_ABSTIME)` pacing. Without it the
//! loop sleeps with `std::thread::sleep`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use koko_common::consts::MAX_JOINTS;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::LoadedConfig;
use crate::control::output::{CycleSummary, evaluate_cycle};
use crate::control::pairing::PairTable;
use crate::diagnostics::{DiagnosticsSink, DiagnosticsSnapshot, SaturationCounters};
use crate::error::ControllerError;
use crate::io::{FeedbackFrame, JointStateSource, MatchReport, RobotIo};
use crate::state::inputs::{ControllerHandle, InputSnapshot};
use crate::state::joint::{JointModel, JointRuntimeState};

// ─── Cycle Statistics ───────────────────────────────────────────────

/// O(1) per-cycle timing statistics.
#[derive(Debug, Clone)]
pub struct CycleStats {
    /// Total cycles executed.
    pub cycle_count: u64,
    /// Last cycle duration [ns].
    pub last_cycle_ns: i64,
    /// Minimum cycle duration [ns].
    pub min_cycle_ns: i64,
    /// Maximum cycle duration [ns].
    pub max_cycle_ns: i64,
    /// Running sum for average computation.
    pub sum_cycle_ns: i64,
    /// Cycles that took longer than the period.
    pub overruns: u64,
    /// Maximum wake-up latency [ns].
    pub max_latency_ns: i64,
}

impl Default for CycleStats {
    fn default() -> Self {
        Self::new()
    }
}

impl CycleStats {
    pub const fn new() -> Self {
        Self {
            cycle_count: 0,
            last_cycle_ns: 0,
            min_cycle_ns: i64::MAX,
            max_cycle_ns: 0,
            sum_cycle_ns: 0,
            overruns: 0,
            max_latency_ns: 0,
        }
    }

    /// Record a cycle duration. O(1), no allocation.
    #[inline]
    pub fn record(&mut self, duration_ns: i64, latency_ns: i64) {
        self.cycle_count += 1;
        self.last_cycle_ns = duration_ns;
        self.min_cycle_ns = self.min_cycle_ns.min(duration_ns);
        self.max_cycle_ns = self.max_cycle_ns.max(duration_ns);
        self.sum_cycle_ns += duration_ns;
        self.max_latency_ns = self.max_latency_ns.max(latency_ns);
    }

    /// Average cycle time [ns], 0 before the first cycle.
    #[inline]
    pub fn avg_cycle_ns(&self) -> i64 {
        if self.cycle_count == 0 {
            0
        } else {
            self.sum_cycle_ns / self.cycle_count as i64
        }
    }
}

// ─── RT Setup ───────────────────────────────────────────────────────

/// Errors during RT setup or loop timing.
#[derive(Debug, Clone, Error)]
pub enum CycleError {
    /// RT system call failed.
    #[error("RT setup error: {0}")]
    RtSetup(String),
    /// Monotonic clock unavailable.
    #[error("clock error: {0}")]
    Clock(String),
}

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

/// Touch 256 KiB of stack so the loop never page-faults on it.
fn prefault_stack() {
    let mut buf = [0u8; 256 * 1024];
    for byte in buf.iter_mut() {
        // SAFETY: `byte` is a valid, exclusive reference into `buf`.
        unsafe { core::ptr::write_volatile(byte, 0xFF) };
    }
    core::hint::black_box(&buf);
}

/// Pin the current thread to one CPU core.
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

/// Switch the current thread to SCHED_FIFO.
#[cfg(feature = "rt")]
fn rt_set_scheduler(priority: i32) -> Result<(), CycleError> {
    let param = libc::sched_param {
        sched_priority: priority,
    };
    // SAFETY: `param` is a valid sched_param for the duration of the call.
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

/// Full RT setup sequence. All steps are no-ops without the `rt` feature.
pub fn rt_setup(cpu_core: usize, rt_priority: i32) -> Result<(), CycleError> {
    rt_mlockall()?;
    prefault_stack();
    rt_set_affinity(cpu_core)?;
    rt_set_scheduler(rt_priority)?;
    Ok(())
}

// ─── Joint Controller ───────────────────────────────────────────────

/// The torque law with all of its pre-allocated per-cycle state.
pub struct JointController {
    model: Arc<JointModel>,
    pairs: PairTable,
    handle: ControllerHandle,
    snapshot: InputSnapshot,
    joints: [JointRuntimeState; MAX_JOINTS],
    counters: SaturationCounters,
    last_summary: CycleSummary,
    last_report: MatchReport,
    diagnostics: DiagnosticsSnapshot,
    cycle: u64,
}

impl std::fmt::Debug for JointController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JointController")
            .field("joints", &self.model.len())
            .field("pairs", &self.pairs.len())
            .field("cycle", &self.cycle)
            .finish()
    }
}

impl JointController {
    /// Activate the controller on a validated config.
    ///
    /// Reads one joint-state sample and holds every joint at its measured
    /// position. Fails if any model joint is missing from that sample;
    /// unknown names in the sample are logged and ignored.
    pub fn activate<S>(loaded: &LoadedConfig, state: &mut S) -> Result<Self, ControllerError>
    where
        S: JointStateSource + ?Sized,
    {
        let model = loaded.model.clone();
        let handle = ControllerHandle::new(
            model.clone(),
            &loaded.config.joints,
            loaded.config.zero_g_mode,
        );

        let n = model.len();
        let mut joints = [JointRuntimeState::default(); MAX_JOINTS];
        let report = {
            let mut frame = FeedbackFrame::new(&model, &mut joints[..n]);
            state.read_joint_state(&mut frame);
            frame.report()
        };
        if report.unmatched > 0 {
            error!(
                unmatched = report.unmatched,
                "joint state samples for unknown joints, ignoring them"
            );
        }
        let missing = report.missing(n);
        if missing > 0 {
            return Err(ControllerError::IncompleteFeedback { missing, joints: n });
        }

        let mut positions = [0.0; MAX_JOINTS];
        for (slot, joint) in positions.iter_mut().zip(&joints[..n]) {
            *slot = joint.position;
        }
        handle.hold_positions(&positions[..n])?;
        for joint in &mut joints[..n] {
            joint.commanded_position = joint.position;
        }

        for ((cfg, joint), index) in loaded.config.joints.iter().zip(&joints[..n]).zip(0..) {
            info!(
                index,
                joint = %cfg.name,
                p = cfg.gains.p_gain,
                d = cfg.gains.d_gain,
                compensation_gain = cfg.gains.compensation_gain,
                min_torque = cfg.limits.min_torque,
                max_torque = cfg.limits.max_torque,
                paired = loaded.pairs.is_paired(index),
                hold = joint.position,
                "joint configured"
            );
        }

        info!(
            joints = n,
            pairs = loaded.pairs.len(),
            zero_gravity = loaded.config.zero_g_mode,
            "controller activated, holding current pose"
        );

        Ok(Self {
            model,
            pairs: loaded.pairs.clone(),
            handle,
            snapshot: InputSnapshot::default(),
            joints,
            counters: SaturationCounters::default(),
            last_summary: CycleSummary::default(),
            last_report: report,
            diagnostics: DiagnosticsSnapshot::default(),
            cycle: 0,
        })
    }

    /// Writer for commands, gains and the zero-gravity flag.
    pub fn handle(&self) -> ControllerHandle {
        self.handle.clone()
    }

    pub fn model(&self) -> &JointModel {
        &self.model
    }

    /// Runtime records of the model joints, as of the last cycle.
    pub fn joints(&self) -> &[JointRuntimeState] {
        &self.joints[..self.model.len()]
    }

    /// Cycles run since activation.
    pub fn cycle_count(&self) -> u64 {
        self.cycle
    }

    pub fn counters(&self) -> &SaturationCounters {
        &self.counters
    }

    pub fn last_summary(&self) -> CycleSummary {
        self.last_summary
    }

    pub fn last_report(&self) -> MatchReport {
        self.last_report
    }

    /// Run one control cycle with period `dt` [s].
    pub fn step<I>(&mut self, io: &mut I, dt: f64) -> CycleSummary
    where
        I: RobotIo + ?Sized,
    {
        let n = self.model.len();

        self.handle.snapshot(&mut self.snapshot);

        let report = {
            let mut frame = FeedbackFrame::new(&self.model, &mut self.joints[..n]);
            io.read_joint_state(&mut frame);
            frame.report()
        };
        io.fill_compensation(&self.model, &mut self.joints[..n]);

        let summary = evaluate_cycle(
            &self.model,
            &self.pairs,
            &self.snapshot,
            dt,
            &mut self.joints[..n],
        );

        io.write_torques(&self.model, &self.joints[..n]);

        if summary.forced_zero > 0 && self.last_summary.forced_zero == 0 {
            warn!(
                joints = summary.forced_zero,
                cycle = self.cycle,
                "torque forced to zero (zero period or non-finite error)"
            );
        }
        if report.unmatched > 0 && self.last_report.unmatched == 0 {
            error!(
                unmatched = report.unmatched,
                cycle = self.cycle,
                "joint state samples for unknown joints, ignoring them"
            );
        }
        if report.missing(n) > 0 && self.last_report.missing(n) == 0 {
            warn!(
                missing = report.missing(n),
                cycle = self.cycle,
                "joint state incomplete, holding last feedback"
            );
        }

        self.counters.accumulate(&summary, &report, n);
        self.last_summary = summary;
        self.last_report = report;
        self.cycle += 1;
        summary
    }

    /// Last captured diagnostics sample.
    pub fn diagnostics(&self) -> &DiagnosticsSnapshot {
        &self.diagnostics
    }

    /// Capture the current diagnostics sample.
    pub fn capture_diagnostics(&mut self) -> &DiagnosticsSnapshot {
        let n = self.model.len();
        self.diagnostics.capture(
            self.cycle,
            self.snapshot.zero_gravity,
            &self.joints[..n],
            &self.counters,
        );
        &self.diagnostics
    }
}

// ─── Cycle Runner ───────────────────────────────────────────────────

/// Fixed-rate loop driving a [`JointController`].
pub struct CycleRunner<I, D> {
    controller: JointController,
    io: I,
    diagnostics: D,
    /// Configured cycle time [ns].
    cycle_time_ns: i64,
    /// Diagnostics interval [cycles].
    diagnostics_interval: u64,
    running: Arc<AtomicBool>,
    max_cycles: Option<u64>,
    stats: CycleStats,
}

impl<I: RobotIo, D: DiagnosticsSink> CycleRunner<I, D> {
    pub fn new(
        controller: JointController,
        loaded: &LoadedConfig,
        io: I,
        diagnostics: D,
    ) -> Self {
        Self {
            controller,
            io,
            diagnostics,
            cycle_time_ns: i64::from(loaded.config.cycle_time_us) * 1000,
            diagnostics_interval: u64::from(loaded.config.diagnostics_interval.max(1)),
            running: Arc::new(AtomicBool::new(true)),
            max_cycles: None,
            stats: CycleStats::new(),
        }
    }

    /// Stop after `cycles` cycles.
    pub fn with_max_cycles(mut self, cycles: u64) -> Self {
        self.max_cycles = Some(cycles);
        self
    }

    /// Flag that keeps the loop running; store `false` to stop it.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    pub fn controller(&self) -> &JointController {
        &self.controller
    }

    pub fn io(&self) -> &I {
        &self.io
    }

    pub fn diagnostics(&self) -> &D {
        &self.diagnostics
    }

    pub fn stats(&self) -> &CycleStats {
        &self.stats
    }

    fn dt(&self) -> f64 {
        self.cycle_time_ns as f64 * 1e-9
    }

    fn keep_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
            && self
                .max_cycles
                .is_none_or(|max| self.controller.cycle_count() < max)
    }

    /// One cycle body. Returns true when a diagnostics sample is due.
    ///
    /// The sample is captured in place here; publishing it (which may
    /// serialize and allocate) happens outside the timed window.
    fn cycle_body(&mut self) -> bool {
        let dt = self.dt();
        self.controller.step(&mut self.io, dt);
        let due = self.controller.cycle_count() % self.diagnostics_interval == 0;
        if due {
            self.controller.capture_diagnostics();
        }
        due
    }

    fn publish_diagnostics(&mut self) {
        self.diagnostics.publish(self.controller.diagnostics());
    }

    /// Run cycles back to back without sleeping. For simulation and tests.
    pub fn run_unpaced(&mut self) {
        while self.keep_running() {
            if self.cycle_body() {
                self.publish_diagnostics();
            }
        }
    }

    /// Enter the paced loop until stopped.
    pub fn run(&mut self) -> Result<(), CycleError> {
        info!(
            cycle_time_us = self.cycle_time_ns / 1000,
            "entering control loop"
        );

        #[cfg(feature = "rt")]
        let result = self.run_rt_loop();

        #[cfg(not(feature = "rt"))]
        let result = self.run_sim_loop();

        info!(
            cycles = self.stats.cycle_count,
            avg_ns = self.stats.avg_cycle_ns(),
            max_ns = self.stats.max_cycle_ns,
            overruns = self.stats.overruns,
            "control loop stopped"
        );
        result
    }

    fn record_overrun(&mut self, duration_ns: i64) {
        self.stats.overruns += 1;
        if self.stats.overruns == 1 || self.stats.overruns % 1000 == 0 {
            warn!(
                duration_ns,
                budget_ns = self.cycle_time_ns,
                overruns = self.stats.overruns,
                "cycle overrun"
            );
        }
    }

    /// RT loop using `clock_nanosleep(TIMER_ABSTIME)`.
    #[cfg(feature = "rt")]
    fn run_rt_loop(&mut self) -> Result<(), CycleError> {
        use nix::time::{ClockId, ClockNanosleepFlags, clock_gettime, clock_nanosleep};

        let clock = ClockId::CLOCK_MONOTONIC;
        let mut next_wake =
            clock_gettime(clock).map_err(|e| CycleError::Clock(format!("clock_gettime: {e}")))?;

        while self.keep_running() {
            next_wake = timespec_add_ns(next_wake, self.cycle_time_ns);

            let cycle_start = clock_gettime(clock)
                .map_err(|e| CycleError::Clock(format!("clock_gettime: {e}")))?;

            let publish = self.cycle_body();

            let cycle_end = clock_gettime(clock)
                .map_err(|e| CycleError::Clock(format!("clock_gettime: {e}")))?;
            let duration_ns = timespec_diff_ns(&cycle_end, &cycle_start);
            let latency_ns = timespec_diff_ns(&cycle_start, &next_wake).abs();
            self.stats.record(duration_ns, latency_ns);
            if duration_ns > self.cycle_time_ns {
                self.record_overrun(duration_ns);
            }
            if publish {
                self.publish_diagnostics();
            }

            if let Err(e) = clock_nanosleep(clock, ClockNanosleepFlags::TIMER_ABSTIME, &next_wake)
            {
                error!(error = %e, "clock_nanosleep failed");
            }
        }
        Ok(())
    }

    /// Simulation loop using `std::thread::sleep`.
    #[cfg(not(feature = "rt"))]
    fn run_sim_loop(&mut self) -> Result<(), CycleError> {
        use std::time::{Duration, Instant};

        let period = Duration::from_nanos(self.cycle_time_ns as u64);
        while self.keep_running() {
            let cycle_start = Instant::now();

            let publish = self.cycle_body();

            let duration_ns = cycle_start.elapsed().as_nanos() as i64;
            self.stats.record(duration_ns, 0);
            if duration_ns > self.cycle_time_ns {
                self.record_overrun(duration_ns);
            }
            if publish {
                self.publish_diagnostics();
            }

            if let Some(remaining) = period.checked_sub(cycle_start.elapsed()) {
                std::thread::sleep(remaining);
            }
        }
        tracing::debug!("simulation loop exited");
        Ok(())
    }
}

// ─── Time Helpers ───────────────────────────────────────────────────

#[cfg(feature = "rt")]
fn timespec_add_ns(ts: nix::sys::time::TimeSpec, ns: i64) -> nix::sys::time::TimeSpec {
    use nix::sys::time::TimeSpec;
    let mut secs = ts.tv_sec();
    let mut nanos = ts.tv_nsec() + ns;
    while nanos >= 1_000_000_000 {
        secs += 1;
        nanos -= 1_000_000_000;
    }
    while nanos < 0 {
        secs -= 1;
        nanos += 1_000_000_000;
    }
    TimeSpec::new(secs, nanos)
}

/// `a - b` in nanoseconds.
#[cfg(feature = "rt")]
fn timespec_diff_ns(a: &nix::sys::time::TimeSpec, b: &nix::sys::time::TimeSpec) -> i64 {
    (a.tv_sec() - b.tv_sec()) * 1_000_000_000 + (a.tv_nsec() - b.tv_nsec())
}

// ─── Tests ──────────────────────────────────────────────────────────
