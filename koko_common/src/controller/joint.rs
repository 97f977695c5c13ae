//! Per-joint configuration: identity, static limits and tunable gains.
//!
//! TOML keys follow the controller parameter names used on the robot:
//!
//! ```toml
//! [[joints]]
//! name = "base_roll_joint"
//! p = 10.0
//! d = 0.5
//! id = 1.0
//! min_angle = -3.0
//! max_angle = 3.0
//! min_torque = -5.0
//! max_torque = 5.0
//! ```

use serde::{Deserialize, Serialize};

/// Static joint limits, fixed at activation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointLimits {
    /// Lowest commandable angle [rad].
    pub min_angle: f64,
    /// Highest commandable angle [rad].
    pub max_angle: f64,
    /// Lowest torque command [N·m].
    pub min_torque: f64,
    /// Highest torque command [N·m]. Also this joint's share of a pair budget.
    pub max_torque: f64,
}

impl JointLimits {
    /// Validate that all limits are finite and ordered.
    pub fn validate(&self) -> Result<(), String> {
        let fields = [
            ("min_angle", self.min_angle),
            ("max_angle", self.max_angle),
            ("min_torque", self.min_torque),
            ("max_torque", self.max_torque),
        ];
        for (key, value) in fields {
            if !value.is_finite() {
                return Err(format!("{key} must be finite, got {value}"));
            }
        }
        if self.min_angle > self.max_angle {
            return Err(format!(
                "min_angle {} greater than max_angle {}",
                self.min_angle, self.max_angle
            ));
        }
        if self.min_torque > self.max_torque {
            return Err(format!(
                "min_torque {} greater than max_torque {}",
                self.min_torque, self.max_torque
            ));
        }
        Ok(())
    }

    /// Clamp an angle into `[min_angle, max_angle]`. NaN passes through.
    #[inline]
    pub fn clamp_angle(&self, angle: f64) -> f64 {
        angle.clamp(self.min_angle, self.max_angle)
    }

    /// Clamp a torque into `[min_torque, max_torque]`. NaN passes through.
    #[inline]
    pub fn clamp_torque(&self, torque: f64) -> f64 {
        torque.clamp(self.min_torque, self.max_torque)
    }
}

/// Live-tunable joint gains.
///
/// No bounds are enforced: an invalid gain propagates to the torque output
/// and must be rejected by whoever supplies it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointGains {
    /// Proportional gain [N·m/rad].
    #[serde(rename = "p")]
    pub p_gain: f64,
    /// Velocity damping gain [N·m·s/rad].
    #[serde(rename = "d")]
    pub d_gain: f64,
    /// Scale applied to the external compensation torque.
    #[serde(rename = "id")]
    pub compensation_gain: f64,
}

impl Default for JointGains {
    fn default() -> Self {
        Self {
            p_gain: 0.0,
            d_gain: 0.0,
            compensation_gain: 0.0,
        }
    }
}

/// One controlled joint as read from configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointConfig {
    /// Joint name, matched against joint-state samples.
    pub name: String,
    /// Initial gains.
    #[serde(flatten)]
    pub gains: JointGains,
    /// Static limits.
    #[serde(flatten)]
    pub limits: JointLimits,
}
