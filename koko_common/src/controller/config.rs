//! Controller configuration structure.
//!
//! Loaded from TOML at startup. Structure (joint list, limits, pair list) is
//! immutable after activation; gains and the zero-gravity default may be
//! hot-reloaded.
//!
//! ```toml
//! cycle_time_us = 1000
//! zero_g_mode = false
//! paired_constraints = [1, 2]
//!
//! [[joints]]
//! name = "shoulder_lift"
//! # ...
//! ```

use serde::{Deserialize, Serialize};

use crate::config::LogLevel;
use crate::consts::{
    CYCLE_TIME_US_MAX, CYCLE_TIME_US_MIN, DIAGNOSTICS_INTERVAL_DEFAULT, MAX_JOINTS,
};

use super::joint::JointConfig;

/// Top-level controller configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Control cycle period in microseconds.
    pub cycle_time_us: u32,

    /// Start in zero-gravity (compensation-only) mode.
    pub zero_g_mode: bool,

    /// Flat list of joint indices, consumed two at a time as (lift, roll).
    pub paired_constraints: Vec<usize>,

    /// Diagnostics publish interval [cycles].
    #[serde(default = "default_diagnostics_interval")]
    pub diagnostics_interval: u32,

    /// Default log verbosity for the controller binary.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Controlled joints, in index order.
    pub joints: Vec<JointConfig>,
}

fn default_diagnostics_interval() -> u32 {
    DIAGNOSTICS_INTERVAL_DEFAULT
}

impl ControllerConfig {
    /// Validate parameter bounds.
    ///
    /// Structural checks (name uniqueness, pair list) live with the loader.
    pub fn validate(&self) -> Result<(), String> {
        if self.cycle_time_us < CYCLE_TIME_US_MIN || self.cycle_time_us > CYCLE_TIME_US_MAX {
            return Err(format!(
                "cycle_time_us {} out of range [{}, {}]",
                self.cycle_time_us, CYCLE_TIME_US_MIN, CYCLE_TIME_US_MAX
            ));
        }
        if self.diagnostics_interval == 0 {
            return Err("diagnostics_interval must be at least 1".to_string());
        }
        if self.joints.is_empty() {
            return Err("no joints configured".to_string());
        }
        if self.joints.len() > MAX_JOINTS {
            return Err(format!(
                "{} joints configured, at most {} supported",
                self.joints.len(),
                MAX_JOINTS
            ));
        }
        for joint in &self.joints {
            if joint.name.is_empty() {
                return Err("joint name cannot be empty".to_string());
            }
            joint
                .limits
                .validate()
                .map_err(|e| format!("joint '{}': {e}", joint.name))?;
        }
        Ok(())
    }

    /// Control cycle period in seconds.
    #[inline]
    pub fn cycle_time_s(&self) -> f64 {
        self.cycle_time_us as f64 / 1_000_000.0
    }
}
