//! Single-service lifecycle.
//!
//! - [`ProcessSupervisor`]: launch with liveness and readiness gating, and
//!   escalating termination
//! - [`RunningService`] / [`Termination`]: what those operations produce

mod supervisor;
mod types;

pub use supervisor::*;
pub use types::*;
