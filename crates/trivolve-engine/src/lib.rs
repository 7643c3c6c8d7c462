//! Trivolve engine crate.
//!
//! This crate owns the platform + GPU runtime pieces used by the evolution
//! layer: device bootstrap, resource allocation, the compute pipeline
//! builder and the single-frame-in-flight lifecycle controller.

pub mod device;
pub mod window;
pub mod time;
pub mod core;

pub mod compute;
pub mod frame;
pub mod logging;
pub mod resources;
pub mod rng;
