//! Joint model and per-joint runtime records.
//!
//! The model (names + static limits) is built once at activation and never
//! changes shape. Runtime records live in a fixed-size array indexed by the
//! model's joint order, so the cycle never allocates.

use heapless::Vec as HVec;
use koko_common::consts::MAX_JOINTS;
use koko_common::controller::fault::JointFault;
use koko_common::controller::joint::{JointConfig, JointLimits};

// ─── Joint Model ────────────────────────────────────────────────────

/// Identity and static limits of one joint.
#[derive(Debug, Clone, PartialEq)]
pub struct JointSpec {
    /// Unique joint name.
    pub name: String,
    /// Static limits.
    pub limits: JointLimits,
}

/// Ordered, structurally immutable list of controlled joints.
///
/// The position of a joint in this list is its index in every per-joint
/// array of the controller.
#[derive(Debug, Clone, PartialEq)]
pub struct JointModel {
    joints: HVec<JointSpec, MAX_JOINTS>,
}

impl JointModel {
    /// Build the model from configured joints.
    ///
    /// Rejects empty or oversized lists, duplicate names and invalid limits.
    pub fn from_config(joints: &[JointConfig]) -> Result<Self, String> {
        if joints.is_empty() {
            return Err("no joints configured".to_string());
        }
        let mut model = HVec::new();
        for (index, joint) in joints.iter().enumerate() {
            joint
                .limits
                .validate()
                .map_err(|e| format!("joint '{}': {e}", joint.name))?;
            if joints[..index].iter().any(|j| j.name == joint.name) {
                return Err(format!("duplicate joint name '{}'", joint.name));
            }
            model
                .push(JointSpec {
                    name: joint.name.clone(),
                    limits: joint.limits,
                })
                .map_err(|_| {
                    format!(
                        "{} joints configured, at most {} supported",
                        joints.len(),
                        MAX_JOINTS
                    )
                })?;
        }
        Ok(Self { joints: model })
    }

    /// Number of joints.
    #[inline]
    pub fn len(&self) -> usize {
        self.joints.len()
    }

    /// Always false for a constructed model.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    #[inline]
    pub fn name(&self, index: usize) -> Option<&str> {
        self.joints.get(index).map(|j| j.name.as_str())
    }

    #[inline]
    pub fn limits(&self, index: usize) -> Option<&JointLimits> {
        self.joints.get(index).map(|j| &j.limits)
    }

    /// Index of the joint with this name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.joints.iter().position(|j| j.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &JointSpec> {
        self.joints.iter()
    }
}

// ─── Runtime Record ─────────────────────────────────────────────────

/// Per-joint mutable runtime state, pre-allocated at activation.
///
/// Feedback fields are overwritten by the joint-state source, the command
/// field by the input snapshot, and the output fields by the control law.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointRuntimeState {
    /// Normalized target for this cycle [rad].
    pub commanded_position: f64,
    /// Measured position [rad]. Keeps its last value if a sample omits the joint.
    pub position: f64,
    /// Measured velocity [rad/s].
    pub velocity: f64,
    /// Feedforward compensation torque for this cycle [N·m].
    pub compensation_torque: f64,
    /// Tracking error, shortest distance from position to target [rad].
    pub error: f64,
    /// Final torque command [N·m].
    pub torque: f64,
    /// Conditions raised this cycle.
    pub fault: JointFault,
}

impl Default for JointRuntimeState {
    fn default() -> Self {
        Self {
            commanded_position: 0.0,
            position: 0.0,
            velocity: 0.0,
            compensation_torque: 0.0,
            error: 0.0,
            torque: 0.0,
            fault: JointFault::empty(),
        }
    }
}
