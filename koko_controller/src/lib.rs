//! # Koko Joint Controller Library
//!
//! Per-cycle joint torque law for a torque-controlled arm: position commands
//! in, bounded motor torques out, at servo-loop rate.
//!
//! ## Pipeline
//!
//! 1. **Command normalizer**: wrap to (−π, π], clamp to joint limits
//!    (asynchronous, on command receipt)
//! 2. **Control law**: `p·error − d·velocity + id·compensation`, or
//!    compensation only in zero-gravity mode
//! 3. **Per-joint clamp**: unpaired joints only
//! 4. **Pair budget**: coupled (lift, roll) joints scaled together
//!
//! ## Zero-Allocation Cycle
//!
//! The joint model, pair table and all per-joint records are fixed-size and
//! built at activation. Asynchronous producers write through a
//! [`ControllerHandle`](state::inputs::ControllerHandle); the cycle copies
//! their values once per cycle.

#![deny(clippy::disallowed_types)]

pub mod command;
pub mod config;
pub mod control;
pub mod cycle;
pub mod diagnostics;
pub mod error;
pub mod io;
pub mod sim;
pub mod state;
