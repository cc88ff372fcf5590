//! State module for tracking link checks
//!
//! # Components
//!
//! - `ProbeState`: lifecycle of one discovered link (queued, probed, terminal)
//! - `ProbeOutcome`: the terminal result a checker reports for a link

mod probe_state;

// Re-export main types
pub use probe_state::{ProbeOutcome, ProbeState};
