//! Controller error root.
//!
//! Only activation and setup can fail. Once running, per-joint faults are
//! flagged in `JointFault` and the cycle always completes.

use thiserror::Error;

use crate::config::ConfigError;
use crate::cycle::CycleError;
use crate::state::inputs::InputError;

/// Top-level error for activation, setup and the binary.
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Cycle(#[from] CycleError),

    /// Activation needs a measured position for every joint.
    #[error("no joint state for {missing} of {joints} joints at activation")]
    IncompleteFeedback { missing: u32, joints: usize },
}
