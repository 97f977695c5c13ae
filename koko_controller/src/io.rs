//! Boundaries to out-of-scope collaborators.
//!
//! The cycle reads joint state and compensation torques through these traits
//! and writes the final torque vector through [`ActuatorSink`]. Drivers,
//! simulators and test rigs implement them.

pub mod actuator;
pub mod compensation;
pub mod feedback;

pub use actuator::ActuatorSink;
pub use compensation::CompensationSource;
pub use feedback::{FeedbackFrame, JointStateSource, MatchReport};

use crate::state::joint::{JointModel, JointRuntimeState};

/// All three cycle-facing interfaces on one object.
///
/// Blanket-implemented, so a simulator that implements the three traits can
/// be passed to the cycle as a single `&mut`.
pub trait RobotIo: JointStateSource + CompensationSource + ActuatorSink {}

impl<T: JointStateSource + CompensationSource + ActuatorSink> RobotIo for T {}

/// Three separate collaborators bundled as one [`RobotIo`].
#[derive(Debug)]
pub struct IoParts<S, C, A> {
    pub state: S,
    pub compensation: C,
    pub actuator: A,
}

impl<S: JointStateSource, C, A> JointStateSource for IoParts<S, C, A> {
    fn read_joint_state(&mut self, frame: &mut FeedbackFrame<'_>) {
        self.state.read_joint_state(frame);
    }
}

impl<S, C: CompensationSource, A> CompensationSource for IoParts<S, C, A> {
    fn fill_compensation(&mut self, model: &JointModel, joints: &mut [JointRuntimeState]) {
        self.compensation.fill_compensation(model, joints);
    }
}

impl<S, C, A: ActuatorSink> ActuatorSink for IoParts<S, C, A> {
    fn write_torques(&mut self, model: &JointModel, joints: &[JointRuntimeState]) {
        self.actuator.write_torques(model, joints);
    }
}
