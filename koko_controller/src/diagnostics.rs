//! Tuning diagnostics: commanded, error, compensation and torque vectors.
//!
//! Captured every `diagnostics_interval` cycles into a pre-allocated
//! [`DiagnosticsSnapshot`] and handed to a [`DiagnosticsSink`]. Saturation
//! and fault counters accumulate over the controller's lifetime; clamping and
//! pair scaling are normal operation and only counted here.

use heapless::Vec as HVec;
use koko_common::consts::MAX_JOINTS;
use serde::Serialize;
use tracing::{debug, warn};

use crate::control::output::CycleSummary;
use crate::io::MatchReport;
use crate::state::joint::JointRuntimeState;

// ─── Counters ───────────────────────────────────────────────────────

/// Lifetime saturation and fault counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SaturationCounters {
    /// Joint-cycles where an unpaired torque hit its limit.
    pub clamped: u64,
    /// Pair-cycles where a pair was scaled into its budget.
    pub scaled_pairs: u64,
    /// Joint-cycles where the torque was forced to 0.
    pub forced_zero: u64,
    /// Joint-state samples naming an unknown joint.
    pub unmatched_samples: u64,
    /// Joint-cycles without a fresh sample.
    pub missing_samples: u64,
}

impl SaturationCounters {
    /// Fold one cycle into the totals.
    #[inline]
    pub fn accumulate(&mut self, summary: &CycleSummary, report: &MatchReport, joints: usize) {
        self.clamped += u64::from(summary.clamped);
        self.scaled_pairs += u64::from(summary.scaled_pairs);
        self.forced_zero += u64::from(summary.forced_zero);
        self.unmatched_samples += u64::from(report.unmatched);
        self.missing_samples += u64::from(report.missing(joints));
    }
}

// ─── Snapshot ───────────────────────────────────────────────────────

/// One diagnostics sample. Fixed capacity, refilled in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DiagnosticsSnapshot {
    /// Cycle number the sample was taken after.
    pub cycle: u64,
    pub zero_gravity: bool,
    /// Normalized targets [rad].
    pub commanded: HVec<f64, MAX_JOINTS>,
    /// Tracking errors [rad].
    pub error: HVec<f64, MAX_JOINTS>,
    /// Raw compensation torques, before `compensation_gain` [N·m].
    pub compensation: HVec<f64, MAX_JOINTS>,
    /// Final torque commands [N·m].
    pub torque: HVec<f64, MAX_JOINTS>,
    /// `JointFault` bits per joint.
    pub faults: HVec<u8, MAX_JOINTS>,
    pub counters: SaturationCounters,
}

impl DiagnosticsSnapshot {
    /// Refill from the runtime records. Does not allocate.
    pub fn capture(
        &mut self,
        cycle: u64,
        zero_gravity: bool,
        joints: &[JointRuntimeState],
        counters: &SaturationCounters,
    ) {
        self.cycle = cycle;
        self.zero_gravity = zero_gravity;
        self.counters = *counters;
        self.commanded.clear();
        self.error.clear();
        self.compensation.clear();
        self.torque.clear();
        self.faults.clear();
        for joint in joints.iter().take(MAX_JOINTS) {
            // Capacity equals MAX_JOINTS and `take` bounds the count.
            let _ = self.commanded.push(joint.commanded_position);
            let _ = self.error.push(joint.error);
            let _ = self.compensation.push(joint.compensation_torque);
            let _ = self.torque.push(joint.torque);
            let _ = self.faults.push(joint.fault.bits());
        }
    }
}

// ─── Sinks ──────────────────────────────────────────────────────────

/// Receives diagnostics samples.
pub trait DiagnosticsSink {
    fn publish(&mut self, snapshot: &DiagnosticsSnapshot);
}

/// Drops every sample.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDiagnostics;

impl DiagnosticsSink for NullDiagnostics {
    fn publish(&mut self, _snapshot: &DiagnosticsSnapshot) {}
}

/// Emits each sample as one JSON debug event on `koko::diagnostics`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogDiagnostics;

impl DiagnosticsSink for LogDiagnostics {
    fn publish(&mut self, snapshot: &DiagnosticsSnapshot) {
        match serde_json::to_string(snapshot) {
            Ok(json) => debug!(target: "koko::diagnostics", cycle = snapshot.cycle, %json),
            Err(e) => warn!(error = %e, "diagnostics serialization failed"),
        }
    }
}

/// Keeps the latest sample.
#[derive(Debug, Clone, Default)]
pub struct LastDiagnostics {
    pub last: Option<DiagnosticsSnapshot>,
    pub published: u64,
}

impl DiagnosticsSink for LastDiagnostics {
    fn publish(&mut self, snapshot: &DiagnosticsSnapshot) {
        match &mut self.last {
            Some(last) => last.clone_from(snapshot),
            None => self.last = Some(snapshot.clone()),
        }
        self.published += 1;
    }
}
