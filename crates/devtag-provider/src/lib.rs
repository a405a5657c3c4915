#![forbid(unsafe_code)]

//! Collaborator contracts shared across devtag.
//!
//! The evaluation core only talks to device metadata through these traits, so
//! probing and cache backends can be swapped without touching the resolution
//! policy.

pub mod cache;
pub mod probe;

pub use cache::DeviceCache;
pub use probe::{DeviceProbe, ProbeField, ProbeRequest, ProbeValues};
