//! Joint-state intake, matched to the model by name.
//!
//! Samples carry joint names; each name is looked up in the model and the
//! sample lands in that joint's record. An unknown name is counted in the
//! cycle's [`MatchReport`] and traced, and the remaining samples are still
//! applied. The cycle raises the error log when unknown names first appear,
//! so a persistent stray joint does not flood the log. Joints absent from a
//! sample keep their last measured values.

use tracing::{trace, warn};

use crate::state::joint::{JointModel, JointRuntimeState};

/// Result of matching one cycle's samples against the model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchReport {
    /// Bit i set when joint i received a sample.
    pub matched: u64,
    /// Samples whose name is not in the model.
    pub unmatched: u32,
}

impl MatchReport {
    /// Model joints that received no sample.
    #[inline]
    pub fn missing(&self, joint_count: usize) -> u32 {
        joint_count as u32 - self.matched.count_ones()
    }

    /// Every joint received a sample and no name was unknown.
    #[inline]
    pub fn is_complete(&self, joint_count: usize) -> bool {
        self.unmatched == 0 && self.missing(joint_count) == 0
    }
}

/// Write access to the runtime records for one cycle's feedback.
pub struct FeedbackFrame<'a> {
    model: &'a JointModel,
    joints: &'a mut [JointRuntimeState],
    report: MatchReport,
}

impl<'a> FeedbackFrame<'a> {
    pub fn new(model: &'a JointModel, joints: &'a mut [JointRuntimeState]) -> Self {
        Self {
            model,
            joints,
            report: MatchReport::default(),
        }
    }

    /// Record position [rad] and velocity [rad/s] for the named joint.
    ///
    /// Returns false, and counts the sample as unmatched, when the name is
    /// not in the model.
    pub fn record(&mut self, name: &str, position: f64, velocity: f64) -> bool {
        match self.model.index_of(name) {
            Some(index) => {
                let joint = &mut self.joints[index];
                joint.position = position;
                joint.velocity = velocity;
                self.report.matched |= 1 << index;
                true
            }
            None => {
                self.report.unmatched += 1;
                trace!(joint = name, "joint state sample for unknown joint");
                false
            }
        }
    }

    #[inline]
    pub fn report(&self) -> MatchReport {
        self.report
    }
}

/// Supplies measured joint state once per cycle.
pub trait JointStateSource {
    /// Record every available sample into `frame`.
    fn read_joint_state(&mut self, frame: &mut FeedbackFrame<'_>);
}

// ─── Batch Message ──────────────────────────────────────────────────

/// A joint-state message in parallel-array form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JointStateMsg {
    pub names: Vec<String>,
    pub positions: Vec<f64>,
    pub velocities: Vec<f64>,
}

impl JointStateSource for JointStateMsg {
    fn read_joint_state(&mut self, frame: &mut FeedbackFrame<'_>) {
        let n = self.names.len();
        if self.positions.len() != n || self.velocities.len() != n {
            warn!(
                names = n,
                positions = self.positions.len(),
                velocities = self.velocities.len(),
                "joint state arrays differ in length, using common prefix"
            );
        }
        for ((name, &position), &velocity) in
            self.names.iter().zip(&self.positions).zip(&self.velocities)
        {
            frame.record(name, position, velocity);
        }
    }
}
