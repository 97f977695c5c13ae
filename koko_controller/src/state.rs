//! Controller state root.
//!
//! Static joint model, per-joint runtime records and the shared input store
//! written by asynchronous producers.

pub mod inputs;
pub mod joint;
