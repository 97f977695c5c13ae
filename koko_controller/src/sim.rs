//! Simulated arm for running the controller without hardware.
//!
//! Each joint is an independent rotational inertia with viscous friction
//! and a gravity load `m·r·g·cos(q)` pulling it down:
//!
//! ```text
//! I·q̈ = τ − b·q̇ − m·r·g·cos(q)
//! ```
//!
//! Integrated with semi-implicit Euler once per torque write. The arm also
//! provides an exact gravity model as its compensation source, and can be
//! told to report an extra joint the controller does not know about.

use heapless::Vec as HVec;
use koko_common::consts::MAX_JOINTS;
use koko_common::controller::config::ControllerConfig;

use crate::command::normalizer::wrap_angle;
use crate::io::{ActuatorSink, CompensationSource, FeedbackFrame, JointStateSource};
use crate::state::joint::{JointModel, JointRuntimeState};

/// Default joint inertia [kg·m²].
pub const DEFAULT_INERTIA: f64 = 0.05;
/// Default viscous friction [N·m·s/rad].
pub const DEFAULT_FRICTION: f64 = 0.1;
/// Gravity [m/s²].
pub const GRAVITY: f64 = 9.81;

/// One simulated joint.
#[derive(Debug, Clone, PartialEq)]
pub struct SimJoint {
    pub name: String,
    pub position: f64,
    pub velocity: f64,
    pub inertia: f64,
    pub friction: f64,
    /// Gravity load moment `m·r` [kg·m].
    pub load_moment: f64,
    /// Last applied torque [N·m].
    pub applied_torque: f64,
}

/// Plant model for every configured joint.
#[derive(Debug, Clone)]
pub struct SimulatedArm {
    joints: HVec<SimJoint, MAX_JOINTS>,
    dt: f64,
    /// Sample reported alongside the real joints (e.g. a gripper on another controller).
    stray_joint: Option<String>,
    steps: u64,
}

impl SimulatedArm {
    /// One sim joint per configured joint, at rest at 0 rad with no load.
    pub fn from_config(config: &ControllerConfig) -> Self {
        let mut joints = HVec::new();
        for joint in config.joints.iter().take(MAX_JOINTS) {
            let _ = joints.push(SimJoint {
                name: joint.name.clone(),
                position: 0.0,
                velocity: 0.0,
                inertia: DEFAULT_INERTIA,
                friction: DEFAULT_FRICTION,
                load_moment: 0.0,
                applied_torque: 0.0,
            });
        }
        Self {
            joints,
            dt: config.cycle_time_s(),
            stray_joint: None,
            steps: 0,
        }
    }

    /// Set initial positions [rad] of the leading joints.
    pub fn with_positions(mut self, positions: &[f64]) -> Self {
        for (joint, &q) in self.joints.iter_mut().zip(positions) {
            joint.position = q;
        }
        self
    }

    /// Set gravity load moments [kg·m] of the leading joints.
    pub fn with_load_moments(mut self, moments: &[f64]) -> Self {
        for (joint, &m) in self.joints.iter_mut().zip(moments) {
            joint.load_moment = m;
        }
        self
    }

    /// Also report a sample for a joint named `name`.
    pub fn with_stray_joint(mut self, name: impl Into<String>) -> Self {
        self.stray_joint = Some(name.into());
        self
    }

    pub fn joints(&self) -> &[SimJoint] {
        &self.joints
    }

    pub fn joint_mut(&mut self, index: usize) -> Option<&mut SimJoint> {
        self.joints.get_mut(index)
    }

    /// Integration steps taken.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    fn gravity_torque(joint: &SimJoint) -> f64 {
        joint.load_moment * GRAVITY * joint.position.cos()
    }

    /// Advance one step with the given torques.
    fn integrate(&mut self) {
        let dt = self.dt;
        for joint in &mut self.joints {
            let accel = (joint.applied_torque
                - joint.friction * joint.velocity
                - Self::gravity_torque(joint))
                / joint.inertia;
            joint.velocity += accel * dt;
            joint.position = wrap_angle(joint.position + joint.velocity * dt);
        }
        self.steps += 1;
    }
}

impl JointStateSource for SimulatedArm {
    fn read_joint_state(&mut self, frame: &mut FeedbackFrame<'_>) {
        for joint in &self.joints {
            frame.record(&joint.name, joint.position, joint.velocity);
        }
        if let Some(name) = &self.stray_joint {
            frame.record(name, 0.0, 0.0);
        }
    }
}

impl CompensationSource for SimulatedArm {
    fn fill_compensation(&mut self, model: &JointModel, joints: &mut [JointRuntimeState]) {
        for (index, joint) in joints.iter_mut().enumerate() {
            let torque = model
                .name(index)
                .and_then(|name| self.joints.iter().find(|j| j.name == name))
                .map(Self::gravity_torque)
                .unwrap_or(0.0);
            joint.compensation_torque = torque;
        }
    }
}

impl ActuatorSink for SimulatedArm {
    fn write_torques(&mut self, model: &JointModel, joints: &[JointRuntimeState]) {
        for (index, joint) in joints.iter().enumerate() {
            if let Some(sim) = model
                .name(index)
                .and_then(|name| self.joints.iter_mut().find(|j| j.name == name))
            {
                sim.applied_torque = joint.torque;
            }
        }
        self.integrate();
    }
}
