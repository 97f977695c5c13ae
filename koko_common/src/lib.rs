//! Koko Common Library
//!
//! Shared constants, configuration types and loaders used by the koko
//! joint controller and its tooling.
//!
//! # Module Structure
//!
//! - [`consts`] - Joint-count and cycle-time limits
//! - [`config`] - Generic TOML loading (`ConfigLoader`) and log levels
//! - [`controller`] - Joint and controller configuration, per-joint fault flags
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use koko_common::prelude::*;
//!
//! assert!(MAX_JOINTS > 0);
//! ```

pub mod config;
pub mod consts;
pub mod controller;
pub mod prelude;
