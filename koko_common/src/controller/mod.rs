//! Joint controller shared types.
//!
//! Configuration records for joints and the controller as a whole, plus the
//! per-joint fault flags reported by the control cycle.

pub mod config;
pub mod fault;
pub mod joint;
