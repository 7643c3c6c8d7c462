//! Seed-based deterministic pseudo-random numbers.
//!
//! The WGSL programs carry the same generator (`xorshift32`, `hash_u32`,
//! `rng_stream`, `rng_next_f32`), so a host mirror of a GPU stage draws the
//! same numbers.

mod xorshift;

pub use xorshift::{hash_u32, stream, unit_f32, xorshift32, Xorshift32};
