//! PD + compensation torque law for one joint.
//!
//! ```text
//! error  = shortest_angular_distance(position, commanded)
//! torque = p·error + d·(−velocity) + id·compensation
//! ```
//!
//! The derivative term damps measured velocity directly; there is no error
//! history. Zero-gravity mode outputs `id·compensation` only.
//!
//! A zero cycle period or a non-finite error forces the torque to 0 for
//! that joint, regardless of mode.

use koko_common::controller::fault::JointFault;
use koko_common::controller::joint::JointGains;

use crate::command::normalizer::shortest_angular_distance;

/// Inputs of the law for one joint in one cycle.
#[derive(Debug, Clone, Copy)]
pub struct LawInput {
    /// Normalized target [rad].
    pub commanded: f64,
    /// Measured position [rad].
    pub position: f64,
    /// Measured velocity [rad/s].
    pub velocity: f64,
    /// External feedforward torque [N·m], before `compensation_gain`.
    pub compensation: f64,
    /// Cycle period [s].
    pub dt: f64,
}

/// Result of the law for one joint: raw (unclamped) torque.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LawOutput {
    /// Raw torque command [N·m].
    pub torque: f64,
    /// Tracking error [rad]; reported even when the torque is forced to 0.
    pub error: f64,
    /// `ZERO_DT` and/or `NON_FINITE_ERROR` when the torque was forced to 0.
    pub fault: JointFault,
}

/// Evaluate the law for one joint.
///
/// Only an exact zero `dt` forces the torque to 0; the law does not use
/// `dt` otherwise.
#[inline]
pub fn compute_joint_torque(gains: &JointGains, input: &LawInput, zero_gravity: bool) -> LawOutput {
    let error = shortest_angular_distance(input.position, input.commanded);

    let mut fault = JointFault::empty();
    if input.dt == 0.0 {
        fault |= JointFault::ZERO_DT;
    }
    if !error.is_finite() {
        fault |= JointFault::NON_FINITE_ERROR;
    }
    if fault.forced_zero() {
        return LawOutput {
            torque: 0.0,
            error,
            fault,
        };
    }

    let feedforward = input.compensation * gains.compensation_gain;
    let torque = if zero_gravity {
        feedforward
    } else {
        let p_term = gains.p_gain * error;
        let d_term = gains.d_gain * -input.velocity;
        p_term + d_term + feedforward
    };

    LawOutput {
        torque,
        error,
        fault,
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
