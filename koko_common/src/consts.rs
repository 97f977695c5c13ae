//! System-wide constants for the koko workspace.
//!
//! Single source of truth for joint-count limits and cycle timing.

use static_assertions::const_assert;

/// Maximum number of controlled joints.
///
/// Sizes every fixed-capacity per-joint array on the control path.
pub const MAX_JOINTS: usize = 16;

// Pair membership is tracked as a u64 bitmask.
const_assert!(MAX_JOINTS <= 64);

/// Default control cycle time in microseconds (1 kHz).
pub const CYCLE_TIME_US: u32 = 1000;

/// Shortest accepted control cycle [µs].
pub const CYCLE_TIME_US_MIN: u32 = 100;

/// Longest accepted control cycle [µs].
pub const CYCLE_TIME_US_MAX: u32 = 100_000;

/// Default diagnostics publish interval [cycles].
pub const DIAGNOSTICS_INTERVAL_DEFAULT: u32 = 10;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "config/koko_controller.toml";
