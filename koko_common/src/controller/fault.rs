//! Per-joint fault and saturation flags.
//!
//! Raised by the control cycle for one joint in one cycle. None of these
//! abort the cycle: numeric faults force that joint's torque to zero,
//! saturation flags are informational.

use bitflags::bitflags;

bitflags! {
    /// Per-joint, per-cycle condition flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct JointFault: u8 {
        /// Cycle period was exactly zero. Torque forced to 0.
        const ZERO_DT          = 0x01;
        /// Tracking error was NaN or infinite. Torque forced to 0.
        const NON_FINITE_ERROR = 0x02;
        /// Unpaired joint torque hit its [min_torque, max_torque] limit.
        const TORQUE_CLAMPED   = 0x04;
        /// Paired joint torque was scaled down to fit the shared budget.
        const PAIR_SCALED      = 0x08;
    }
}

impl JointFault {
    /// Flags that force the joint's torque command to zero.
    pub const FORCED_ZERO_MASK: Self =
        Self::from_bits_truncate(Self::ZERO_DT.bits() | Self::NON_FINITE_ERROR.bits());

    /// Flags that only report saturation.
    pub const SATURATION_MASK: Self =
        Self::from_bits_truncate(Self::TORQUE_CLAMPED.bits() | Self::PAIR_SCALED.bits());

    /// Returns true if the torque was forced to zero this cycle.
    #[inline]
    pub const fn forced_zero(&self) -> bool {
        self.intersects(Self::FORCED_ZERO_MASK)
    }

    /// Returns true if the torque was limited this cycle.
    #[inline]
    pub const fn saturated(&self) -> bool {
        self.intersects(Self::SATURATION_MASK)
    }
}

impl Default for JointFault {
    fn default() -> Self {
        Self::empty()
    }
}
