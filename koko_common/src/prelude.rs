//! Prelude module for common re-exports.
//!
//! ```rust
//! use koko_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, LogLevel};
pub use crate::controller::config::ControllerConfig;
pub use crate::controller::joint::{JointConfig, JointGains, JointLimits};

// ─── Runtime Flags ──────────────────────────────────────────────────
pub use crate::controller::fault::JointFault;

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::{CYCLE_TIME_US, MAX_JOINTS};
