//! Torque law root.
//!
//! Per cycle: PD + compensation law per joint, per-joint clamp for unpaired
//! joints, proportional budget split for coupled (lift, roll) pairs.

pub mod clamp;
pub mod law;
pub mod output;
pub mod pairing;
