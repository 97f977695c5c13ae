//! Asynchronous controller inputs: position commands, gain tuning and the
//! zero-gravity toggle.
//!
//! Producers run on other threads and write through a cloneable
//! [`ControllerHandle`]. The control cycle copies everything it needs into an
//! [`InputSnapshot`] once, at the start of the cycle, so a write that lands
//! mid-cycle takes effect from the next cycle (last value wins, no queue).
//!
//! Each joint's gains are written under one lock, so the cycle can never see
//! the p gain of one update paired with the d gain of another.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use koko_common::consts::MAX_JOINTS;
use koko_common::controller::joint::{JointConfig, JointGains};
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::joint::JointModel;
use crate::command::normalizer::normalize_command;

// ─── Errors ─────────────────────────────────────────────────────────

/// Rejected input message. The active values are left untouched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    /// Message carries more values than there are joints.
    #[error("{kind} carries {got} values for {joints} joints")]
    TooManyValues {
        kind: &'static str,
        got: usize,
        joints: usize,
    },
    /// Joint index outside the model.
    #[error("joint index {index} out of range ({joints} joints)")]
    JointIndex { index: usize, joints: usize },
    /// Joint name not present in the model.
    #[error("unknown joint '{0}'")]
    UnknownJoint(String),
}

// ─── Gain Update ────────────────────────────────────────────────────

/// Live gain change for one joint. `None` keeps the current value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainUpdate {
    pub joint: usize,
    pub p_gain: Option<f64>,
    pub d_gain: Option<f64>,
}

impl GainUpdate {
    pub fn p(joint: usize, p_gain: f64) -> Self {
        Self {
            joint,
            p_gain: Some(p_gain),
            d_gain: None,
        }
    }

    pub fn d(joint: usize, d_gain: f64) -> Self {
        Self {
            joint,
            p_gain: None,
            d_gain: Some(d_gain),
        }
    }

    pub fn pd(joint: usize, p_gain: f64, d_gain: f64) -> Self {
        Self {
            joint,
            p_gain: Some(p_gain),
            d_gain: Some(d_gain),
        }
    }
}

// ─── Snapshot ───────────────────────────────────────────────────────

/// Inputs frozen for one control cycle.
#[derive(Debug, Clone, Copy)]
pub struct InputSnapshot {
    /// Normalized target per joint [rad].
    pub commanded: [f64; MAX_JOINTS],
    /// Gains per joint.
    pub gains: [JointGains; MAX_JOINTS],
    /// Compensation-only mode.
    pub zero_gravity: bool,
}

impl Default for InputSnapshot {
    fn default() -> Self {
        Self {
            commanded: [0.0; MAX_JOINTS],
            gains: [JointGains::default(); MAX_JOINTS],
            zero_gravity: false,
        }
    }
}

// ─── Handle ─────────────────────────────────────────────────────────

struct SharedInputs {
    model: Arc<JointModel>,
    commands: Mutex<[f64; MAX_JOINTS]>,
    gains: Mutex<[JointGains; MAX_JOINTS]>,
    zero_gravity: AtomicBool,
}

/// Cloneable writer for controller inputs.
#[derive(Clone)]
pub struct ControllerHandle {
    inner: Arc<SharedInputs>,
}

impl std::fmt::Debug for ControllerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerHandle")
            .field("joints", &self.inner.model.len())
            .field("zero_gravity", &self.zero_gravity())
            .finish()
    }
}

impl ControllerHandle {
    /// Create the shared input store with the configured gains.
    ///
    /// Commands start at zero; [`hold_positions`](Self::hold_positions) is
    /// expected before the first cycle.
    pub fn new(model: Arc<JointModel>, joints: &[JointConfig], zero_gravity: bool) -> Self {
        let mut gains = [JointGains::default(); MAX_JOINTS];
        for (slot, joint) in gains.iter_mut().zip(joints.iter().take(model.len())) {
            *slot = joint.gains;
        }
        Self {
            inner: Arc::new(SharedInputs {
                model,
                commands: Mutex::new([0.0; MAX_JOINTS]),
                gains: Mutex::new(gains),
                zero_gravity: AtomicBool::new(zero_gravity),
            }),
        }
    }

    #[inline]
    pub fn model(&self) -> &JointModel {
        &self.inner.model
    }

    fn check_len(&self, kind: &'static str, got: usize) -> Result<(), InputError> {
        let joints = self.inner.model.len();
        if got > joints {
            return Err(InputError::TooManyValues { kind, got, joints });
        }
        Ok(())
    }

    fn check_index(&self, index: usize) -> Result<(), InputError> {
        let joints = self.inner.model.len();
        if index >= joints {
            return Err(InputError::JointIndex { index, joints });
        }
        Ok(())
    }

    // ── Commands ──

    /// Accept a position command message: one raw angle per leading joint.
    ///
    /// Every value is wrapped and clamped before it is stored. Joints beyond
    /// the end of `raw` keep their current target.
    pub fn set_commands(&self, raw: &[f64]) -> Result<(), InputError> {
        self.check_len("command", raw.len())?;

        let mut normalized = [0.0; MAX_JOINTS];
        for (index, (out, &value)) in normalized.iter_mut().zip(raw).enumerate() {
            if let Some(limits) = self.inner.model.limits(index) {
                *out = normalize_command(value, limits);
            }
        }

        let mut commands = self.inner.commands.lock();
        commands[..raw.len()].copy_from_slice(&normalized[..raw.len()]);
        drop(commands);

        debug!(joints = raw.len(), "position command accepted");
        Ok(())
    }

    /// Accept a raw target for a single joint.
    pub fn set_command(&self, joint: usize, raw: f64) -> Result<(), InputError> {
        self.check_index(joint)?;
        let limits = self
            .inner
            .model
            .limits(joint)
            .ok_or(InputError::JointIndex {
                index: joint,
                joints: self.inner.model.len(),
            })?;
        let normalized = normalize_command(raw, limits);
        self.inner.commands.lock()[joint] = normalized;
        Ok(())
    }

    /// Accept a raw target for a joint addressed by name.
    pub fn set_command_by_name(&self, name: &str, raw: f64) -> Result<(), InputError> {
        let joint = self
            .inner
            .model
            .index_of(name)
            .ok_or_else(|| InputError::UnknownJoint(name.to_string()))?;
        self.set_command(joint, raw)
    }

    /// Set every target to the measured position ("hold current pose").
    ///
    /// Used once at activation. Values are stored as measured, without
    /// wrapping or clamping, so the first cycle produces no position error.
    pub fn hold_positions(&self, positions: &[f64]) -> Result<(), InputError> {
        self.check_len("hold", positions.len())?;
        let mut commands = self.inner.commands.lock();
        commands[..positions.len()].copy_from_slice(positions);
        Ok(())
    }

    /// Current normalized target of one joint.
    pub fn commanded(&self, joint: usize) -> Option<f64> {
        (joint < self.inner.model.len()).then(|| self.inner.commands.lock()[joint])
    }

    // ── Gains ──

    /// Apply a p and/or d gain change to one joint, atomically.
    ///
    /// Values are not validated.
    pub fn update_gains(&self, update: GainUpdate) -> Result<(), InputError> {
        self.check_index(update.joint)?;
        let mut gains = self.inner.gains.lock();
        let slot = &mut gains[update.joint];
        if let Some(p) = update.p_gain {
            slot.p_gain = p;
        }
        if let Some(d) = update.d_gain {
            slot.d_gain = d;
        }
        let applied = *slot;
        drop(gains);

        warn!(
            joint = update.joint,
            p = applied.p_gain,
            d = applied.d_gain,
            "joint gains updated"
        );
        Ok(())
    }

    /// Apply a flat p-gain array; element i targets joint i.
    pub fn set_p_gains(&self, values: &[f64]) -> Result<(), InputError> {
        self.check_len("p-gain update", values.len())?;
        let mut gains = self.inner.gains.lock();
        for (slot, &p) in gains.iter_mut().zip(values) {
            slot.p_gain = p;
        }
        drop(gains);
        warn!(joints = values.len(), "p gains updated");
        Ok(())
    }

    /// Apply a flat d-gain array; element i targets joint i.
    pub fn set_d_gains(&self, values: &[f64]) -> Result<(), InputError> {
        self.check_len("d-gain update", values.len())?;
        let mut gains = self.inner.gains.lock();
        for (slot, &d) in gains.iter_mut().zip(values) {
            slot.d_gain = d;
        }
        drop(gains);
        warn!(joints = values.len(), "d gains updated");
        Ok(())
    }

    /// Replace all gains (p, d and compensation) from a reloaded config.
    pub fn load_gains(&self, joints: &[JointConfig]) -> Result<(), InputError> {
        self.check_len("gain reload", joints.len())?;
        let mut gains = self.inner.gains.lock();
        for (slot, joint) in gains.iter_mut().zip(joints) {
            *slot = joint.gains;
        }
        drop(gains);
        info!(joints = joints.len(), "gains reloaded");
        Ok(())
    }

    /// Current gains of one joint.
    pub fn gains(&self, joint: usize) -> Option<JointGains> {
        (joint < self.inner.model.len()).then(|| self.inner.gains.lock()[joint])
    }

    // ── Mode ──

    /// Toggle compensation-only output for all joints.
    pub fn set_zero_gravity(&self, enabled: bool) {
        let previous = self.inner.zero_gravity.swap(enabled, Ordering::AcqRel);
        if previous != enabled {
            warn!(enabled, "zero-gravity mode changed");
        }
    }

    #[inline]
    pub fn zero_gravity(&self) -> bool {
        self.inner.zero_gravity.load(Ordering::Acquire)
    }

    // ── Cycle side ──

    /// Copy all inputs into `out`. Called once at the start of each cycle.
    pub fn snapshot(&self, out: &mut InputSnapshot) {
        out.commanded = *self.inner.commands.lock();
        out.gains = *self.inner.gains.lock();
        out.zero_gravity = self.zero_gravity();
    }
}
