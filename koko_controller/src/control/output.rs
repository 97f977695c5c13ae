//! Torque vector assembly for one cycle.
//!
//! Runs the law for every joint, clamps unpaired joints, then scales coupled
//! pairs into their shared budget. Always produces a full vector; a fault on
//! one joint never touches another joint's command.

use crate::state::inputs::InputSnapshot;
use crate::state::joint::{JointModel, JointRuntimeState};
use koko_common::controller::fault::JointFault;

use super::clamp::clamp_joint_torque;
use super::law::{LawInput, compute_joint_torque};
use super::pairing::PairTable;

/// Per-cycle counters of limited or zeroed joints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    /// Unpaired joints clamped to their torque limit.
    pub clamped: u32,
    /// Pairs scaled into their budget.
    pub scaled_pairs: u32,
    /// Joints whose torque was forced to 0.
    pub forced_zero: u32,
}

/// Compute final torques for all joints.
///
/// `joints` must hold one record per model joint with feedback and
/// compensation already filled in for this cycle. Commanded position,
/// error, torque and fault fields are overwritten.
pub fn evaluate_cycle(
    model: &JointModel,
    pairs: &PairTable,
    inputs: &InputSnapshot,
    dt: f64,
    joints: &mut [JointRuntimeState],
) -> CycleSummary {
    let mut summary = CycleSummary::default();

    for (index, (joint, spec)) in joints.iter_mut().zip(model.iter()).enumerate() {
        joint.commanded_position = inputs.commanded[index];

        let law = compute_joint_torque(
            &inputs.gains[index],
            &LawInput {
                commanded: joint.commanded_position,
                position: joint.position,
                velocity: joint.velocity,
                compensation: joint.compensation_torque,
                dt,
            },
            inputs.zero_gravity,
        );
        joint.error = law.error;
        joint.torque = law.torque;
        joint.fault = law.fault;

        if law.fault.forced_zero() {
            summary.forced_zero += 1;
        }

        if !pairs.is_paired(index) {
            let (torque, clamped) = clamp_joint_torque(joint.torque, &spec.limits);
            joint.torque = torque;
            if clamped {
                joint.fault |= JointFault::TORQUE_CLAMPED;
                summary.clamped += 1;
            }
        }
    }

    summary.scaled_pairs = pairs.apply(joints) as u32;
    summary
}

// ─── Tests ──────────────────────────────────────────────────────────
