//! Hardware telemetry acquisition.
//!
//! # AVAILABILITY INVARIANT
//! Capture never fails. A sensor that cannot be read is recorded as
//! `Reading::Unavailable` and its siblings are still read.
//!
//! # HANDLE SCOPE
//! Vendor management handles (NVML, amdgpu_top) are acquired and released
//! inside a single probe call. Static descriptors are read once per monitor.

pub mod amd;
pub mod host;
#[cfg(feature = "nvml")]
pub mod nvidia;
pub mod snapshot;
pub mod source;
pub mod summary;

pub use snapshot::*;
pub use source::*;
pub use summary::render_summary;
