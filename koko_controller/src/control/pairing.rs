//! Coupled (lift, roll) joint pairs sharing one torque budget.
//!
//! A differential mechanism drives two outputs with two motors, so the limit
//! applies to their combined effort. Both raw torques are scaled by one
//! common factor when the combined effort exceeds
//! `max_torque(lift) + max_torque(roll)`, which keeps each sign and the
//! lift/roll ratio.
//!
//! Pairs come from a flat index list read two at a time:
//!
//! ```toml
//! paired_constraints = [4, 5, 6, 7]   # (4 lift, 5 roll), (6 lift, 7 roll)
//! ```

use heapless::Vec as HVec;
use koko_common::consts::MAX_JOINTS;
use koko_common::controller::fault::JointFault;
use thiserror::Error;

use crate::state::joint::{JointModel, JointRuntimeState};

/// Most pairs a model can hold.
pub const MAX_PAIRS: usize = MAX_JOINTS / 2;

// ─── Errors ─────────────────────────────────────────────────────────

/// Invalid pair list. Refuses activation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PairError {
    #[error("paired_constraints has odd length {0}")]
    OddLength(usize),

    #[error("paired_constraints index {index} out of range ({joints} joints)")]
    IndexOutOfRange { index: usize, joints: usize },

    #[error("joint {index} appears in more than one pair")]
    Overlap { index: usize },

    #[error("pair ({lift}, {roll}) has non-positive torque budget {budget}")]
    NonPositiveBudget { lift: usize, roll: usize, budget: f64 },
}

// ─── Pair ───────────────────────────────────────────────────────────

/// One coupled pair with its precomputed budget.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointPair {
    pub lift: usize,
    pub roll: usize,
    /// `max_torque(lift) + max_torque(roll)` [N·m].
    pub budget: f64,
}

/// Combined effort of a (lift, roll) torque pair, by sign quadrant.
#[inline]
pub fn combined_effort(lift: f64, roll: f64) -> f64 {
    match (lift >= 0.0, roll >= 0.0) {
        (true, true) => lift + roll,
        (false, true) => roll - lift,
        (false, false) => -roll - lift,
        (true, false) => lift - roll,
    }
}

/// Common scale factor that brings `combined` within `budget`.
///
/// 1.0 when already within budget. Never divides by zero since the
/// division only runs for `combined > budget > 0`.
#[inline]
pub fn budget_scalar(combined: f64, budget: f64) -> f64 {
    if combined > budget {
        budget / combined
    } else {
        1.0
    }
}

/// Scale a raw (lift, roll) pair into `budget`.
///
/// Returns the scaled torques and whether scaling was applied.
#[inline]
pub fn allocate_pair_budget(lift: f64, roll: f64, budget: f64) -> (f64, f64, bool) {
    let scalar = budget_scalar(combined_effort(lift, roll), budget);
    (lift * scalar, roll * scalar, scalar < 1.0)
}

// ─── Pair Table ─────────────────────────────────────────────────────

/// All declared pairs, validated against the joint model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PairTable {
    pairs: HVec<JointPair, MAX_PAIRS>,
    /// Bit i set when joint i belongs to a pair.
    members: u64,
}

impl PairTable {
    /// Build the table from the flat `paired_constraints` list.
    pub fn from_flat(indices: &[usize], model: &JointModel) -> Result<Self, PairError> {
        if indices.len() % 2 != 0 {
            return Err(PairError::OddLength(indices.len()));
        }

        let joints = model.len();
        let mut table = Self::default();
        for chunk in indices.chunks_exact(2) {
            let (lift, roll) = (chunk[0], chunk[1]);
            let mut budget = 0.0;
            for index in [lift, roll] {
                let limits = model
                    .limits(index)
                    .ok_or(PairError::IndexOutOfRange { index, joints })?;
                if table.is_paired(index) {
                    return Err(PairError::Overlap { index });
                }
                table.members |= 1 << index;
                budget += limits.max_torque;
            }

            if !(budget > 0.0) {
                return Err(PairError::NonPositiveBudget { lift, roll, budget });
            }

            // Capacity follows from the overlap check: at most MAX_JOINTS/2 disjoint pairs.
            let _ = table.pairs.push(JointPair { lift, roll, budget });
        }
        Ok(table)
    }

    #[inline]
    pub fn is_paired(&self, joint: usize) -> bool {
        joint < 64 && self.members & (1 << joint) != 0
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &JointPair> {
        self.pairs.iter()
    }

    /// Scale every pair's raw torques in place.
    ///
    /// Sets `PAIR_SCALED` on both members of a scaled pair and returns the
    /// number of pairs scaled.
    pub fn apply(&self, joints: &mut [JointRuntimeState]) -> usize {
        let mut scaled_pairs = 0;
        for pair in &self.pairs {
            let (lift, roll) = (joints[pair.lift].torque, joints[pair.roll].torque);
            let (lift, roll, scaled) = allocate_pair_budget(lift, roll, pair.budget);
            joints[pair.lift].torque = lift;
            joints[pair.roll].torque = roll;
            if scaled {
                joints[pair.lift].fault |= JointFault::PAIR_SCALED;
                joints[pair.roll].fault |= JointFault::PAIR_SCALED;
                scaled_pairs += 1;
            }
        }
        scaled_pairs
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
