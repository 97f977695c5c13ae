//! Position command normalizer.
//!
//! Incoming targets are unbounded angles. Each one is wrapped into the
//! canonical range (−π, π] and then clamped to the joint's angle limits.
//! The same wrap is used by the control law to compute the shortest signed
//! tracking error.
//!
//! NaN and ±Inf are not filtered here. They survive normalization and are
//! turned into a zero torque by the control law.

use std::f64::consts::{PI, TAU};

use koko_common::controller::joint::JointLimits;

/// Wrap an angle into (−π, π].
///
/// Shift by +π, reduce modulo 2π into [0, 2π), shift back by −π. `%` keeps
/// the sign of the dividend, so a negative remainder is lifted by 2π first.
/// The lower boundary −π is folded onto +π. In-range angles are returned
/// unchanged, bit for bit.
#[inline]
pub fn wrap_angle(angle: f64) -> f64 {
    if angle > -PI && angle <= PI {
        return angle;
    }
    let mut reduced = (angle + PI) % TAU;
    if reduced < 0.0 {
        reduced += TAU;
    }
    let wrapped = reduced - PI;
    if wrapped <= -PI { wrapped + TAU } else { wrapped }
}

/// Shortest signed angular distance from `from` to `to`, in (−π, π].
#[inline]
pub fn shortest_angular_distance(from: f64, to: f64) -> f64 {
    wrap_angle(to - from)
}

/// Normalize one raw target angle for a joint: wrap, then clamp to limits.
#[inline]
pub fn normalize_command(raw: f64, limits: &JointLimits) -> f64 {
    limits.clamp_angle(wrap_angle(raw))
}
