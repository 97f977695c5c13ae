//! Feedforward compensation torque sources.
//!
//! The controller treats compensation as opaque: once per cycle, after
//! feedback has been read, a source writes one torque per joint into
//! `compensation_torque`. The law scales it by the joint's
//! `compensation_gain`.

use std::sync::Arc;

use koko_common::consts::MAX_JOINTS;
use parking_lot::Mutex;
use tracing::debug;

use crate::state::joint::{JointModel, JointRuntimeState};

/// Standard gravity along −z [m/s²].
pub const STANDARD_GRAVITY: [f64; 3] = [0.0, 0.0, -9.81];

/// Supplies one compensation torque per joint per cycle.
pub trait CompensationSource {
    /// Write `compensation_torque` for every joint in `joints`.
    ///
    /// Feedback (position, velocity) is already current when this runs.
    fn fill_compensation(&mut self, model: &JointModel, joints: &mut [JointRuntimeState]);
}

/// No feedforward: pure PD.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroCompensation;

impl CompensationSource for ZeroCompensation {
    fn fill_compensation(&mut self, _model: &JointModel, joints: &mut [JointRuntimeState]) {
        for joint in joints {
            joint.compensation_torque = 0.0;
        }
    }
}

/// Fixed per-joint torques, e.g. a measured static load.
#[derive(Debug, Clone, Copy)]
pub struct ConstantCompensation {
    torques: [f64; MAX_JOINTS],
}

impl ConstantCompensation {
    /// Joints past the end of `torques` get 0.
    pub fn new(torques: &[f64]) -> Self {
        let mut fixed = [0.0; MAX_JOINTS];
        for (slot, &t) in fixed.iter_mut().zip(torques) {
            *slot = t;
        }
        Self { torques: fixed }
    }
}

impl CompensationSource for ConstantCompensation {
    fn fill_compensation(&mut self, _model: &JointModel, joints: &mut [JointRuntimeState]) {
        for (joint, &t) in joints.iter_mut().zip(&self.torques) {
            joint.compensation_torque = t;
        }
    }
}

// ─── Gravity ────────────────────────────────────────────────────────

/// Writer for the gravity vector seen by a [`GravityCompensation`].
///
/// Cloneable; updates are picked up on the next cycle.
#[derive(Debug, Clone)]
pub struct GravityInput {
    vector: Arc<Mutex<[f64; 3]>>,
}

impl GravityInput {
    /// Replace the gravity vector [m/s²] in the base frame.
    pub fn set(&self, x: f64, y: f64, z: f64) {
        *self.vector.lock() = [x, y, z];
        debug!(x, y, z, "gravity vector updated");
    }

    pub fn get(&self) -> [f64; 3] {
        *self.vector.lock()
    }
}

/// Gravity holding torque for joints that pitch about horizontal axes.
///
/// Each joint carries a static load moment `m·r` [kg·m]; the holding torque
/// is `m·r · g_down · cos(position)`, where `g_down` is the downward
/// component of the current gravity vector. Tilting the base (a gravity
/// vector with less −z) reduces the compensation accordingly.
#[derive(Debug, Clone)]
pub struct GravityCompensation {
    load_moments: [f64; MAX_JOINTS],
    gravity: GravityInput,
}

impl GravityCompensation {
    pub fn new(load_moments: &[f64]) -> Self {
        let mut loads = [0.0; MAX_JOINTS];
        for (slot, &m) in loads.iter_mut().zip(load_moments) {
            *slot = m;
        }
        Self {
            load_moments: loads,
            gravity: GravityInput {
                vector: Arc::new(Mutex::new(STANDARD_GRAVITY)),
            },
        }
    }

    /// Handle for asynchronous gravity updates.
    pub fn gravity_input(&self) -> GravityInput {
        self.gravity.clone()
    }
}

impl CompensationSource for GravityCompensation {
    fn fill_compensation(&mut self, _model: &JointModel, joints: &mut [JointRuntimeState]) {
        let g_down = -self.gravity.get()[2];
        for (joint, &moment) in joints.iter_mut().zip(&self.load_moments) {
            joint.compensation_torque = moment * g_down * joint.position.cos();
        }
    }
}
