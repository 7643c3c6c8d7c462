//! Compute pipeline builder.
//!
//! A [`ComputeProgram`] is built from a WGSL source, a list of numbered
//! resource bindings (each a buffer or an image) and an optional inline
//! parameter block. [`ComputeProgram::bind_resources`] turns caller handles
//! into a bind group after checking every handle against the declared kind.
//!
//! Layout convention shared by all programs:
//! - `@group(0)`: declared resources, by binding index
//! - `@group(1) @binding(0)`: the inline parameter block (uniform), if any

mod binding;
mod error;
mod program;

pub use binding::{resolve_bindings, BoundResource, ResourceKind};
pub use error::BindingError;
pub use program::{ComputeProgram, ComputeProgramDesc, GpuResource, ResourceBinding};
