//! Torque command output.

use koko_common::consts::MAX_JOINTS;

use crate::state::joint::{JointModel, JointRuntimeState};

/// Receives the final torque vector once per cycle.
pub trait ActuatorSink {
    /// `joints[i].torque` is the command for model joint `i`.
    fn write_torques(&mut self, model: &JointModel, joints: &[JointRuntimeState]);
}

/// Keeps the most recent torque vector. Useful for bench rigs and tests.
#[derive(Debug, Clone, Copy)]
pub struct LastTorques {
    torques: [f64; MAX_JOINTS],
    len: usize,
    writes: u64,
}

impl Default for LastTorques {
    fn default() -> Self {
        Self {
            torques: [0.0; MAX_JOINTS],
            len: 0,
            writes: 0,
        }
    }
}

impl LastTorques {
    pub fn torques(&self) -> &[f64] {
        &self.torques[..self.len]
    }

    /// Number of vectors written so far.
    pub fn writes(&self) -> u64 {
        self.writes
    }
}

impl ActuatorSink for LastTorques {
    fn write_torques(&mut self, _model: &JointModel, joints: &[JointRuntimeState]) {
        self.len = joints.len().min(MAX_JOINTS);
        for (slot, joint) in self.torques.iter_mut().zip(joints) {
            *slot = joint.torque;
        }
        self.writes += 1;
    }
}
