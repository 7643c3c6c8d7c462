//! Evolution of triangle images on the GPU.
//!
//! Every frame the current generation is rendered into a grid of cells,
//! graded against a reference image, and bred into the next generation:
//!
//! - [`grid_render`]: draws each candidate into its cell
//! - [`grader`]: per-candidate similarity to the reference
//! - [`lottery`]: fitness-proportionate parent selection
//! - [`evolve`]: crossover + mutation into the other generation buffer
//! - [`present`]: shows the grid on the window surface
//!
//! [`pipeline::EvolutionPipeline`] owns the stages and records them in order;
//! [`app::EvolutionApp`] drives it from the runtime's frame callback.

pub mod app;
pub mod config;
pub mod evolve;
pub mod grader;
pub mod grid_render;
pub mod lottery;
pub mod pipeline;
pub mod population;
pub mod present;
pub mod report;
pub mod vertex;

pub use app::EvolutionApp;
pub use config::{ConfigError, EvolutionConfig, DEFAULT_REFERENCE_PATH};
pub use pipeline::EvolutionPipeline;

/// WGSL random number helpers shared by the lottery and evolve programs.
pub(crate) const RNG_WGSL: &str = include_str!("shaders/rng.wgsl");
