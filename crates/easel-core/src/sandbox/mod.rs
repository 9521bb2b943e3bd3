//! Candidate sandbox: capability allow-list, drawing surface and the
//! deadline-bounded executor.
//!
//! This bounds accidental runaway time only. It is not a security boundary.

pub mod capability;
pub mod error;
pub mod execution;
pub mod surface;

pub use capability::{Capabilities, Capability, EngineLimits};
pub use error::{SandboxError, SandboxResult};
pub use execution::{program_seed, SandboxExecutor, SURFACE_VAR};
pub use surface::{Surface, MAX_SURFACE_DIM};
