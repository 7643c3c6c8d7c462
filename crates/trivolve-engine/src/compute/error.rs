use std::fmt;

use super::ResourceKind;

/// A resource binding request that does not match the program's declaration.
///
/// These are programming errors; stages surface them at construction so the
/// frame loop never records a mismatched bind group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingError {
    /// The handle's kind differs from the kind declared at `index`.
    KindMismatch {
        index: u32,
        declared: ResourceKind,
        supplied: &'static str,
    },
    /// `index` was never declared by the program.
    UndeclaredBinding { index: u32 },
    /// A declared index received no handle.
    MissingBinding { index: u32 },
    /// The same index was supplied twice.
    DuplicateBinding { index: u32 },
    /// Inline parameters of the wrong size (or for a program without a block).
    ParamsSizeMismatch { expected: Option<u64>, supplied: u64 },
}

impl fmt::Display for BindingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KindMismatch {
                index,
                declared,
                supplied,
            } => write!(
                f,
                "binding {index}: declared as {declared}, got a {supplied} handle"
            ),
            Self::UndeclaredBinding { index } => {
                write!(f, "binding {index} is not declared by this program")
            }
            Self::MissingBinding { index } => {
                write!(f, "binding {index} is declared but no handle was supplied")
            }
            Self::DuplicateBinding { index } => {
                write!(f, "binding {index} was supplied more than once")
            }
            Self::ParamsSizeMismatch { expected, supplied } => match expected {
                Some(expected) => write!(
                    f,
                    "inline parameter block is {expected} bytes, got {supplied}"
                ),
                None => write!(f, "program has no inline parameter block ({supplied} bytes supplied)"),
            },
        }
    }
}

impl std::error::Error for BindingError {}
