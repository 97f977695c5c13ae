//! Per-joint torque clamp for joints outside any coupled pair.
//!
//! Paired joints skip this stage; their combined limit is enforced by the
//! pair budget allocator on the raw torques.

use koko_common::controller::joint::JointLimits;

/// Clamp a raw torque into `[min_torque, max_torque]`.
///
/// Returns the clamped value and whether the limit was hit. NaN passes
/// through unflagged.
#[inline]
pub fn clamp_joint_torque(torque: f64, limits: &JointLimits) -> (f64, bool) {
    let clamped = limits.clamp_torque(torque);
    (clamped, clamped != torque && !torque.is_nan())
}
