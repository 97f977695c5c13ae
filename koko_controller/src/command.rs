//! Command processing root.
//!
//! Angle wrapping and the position-command normalizer.

pub mod normalizer;
