//! Spicebind: binary-compatible SPICE cells and call protocol for the NAIF toolkit
//!
//! This crate provides the pieces a binding to the SPICE toolkit needs
//! between user code and the native routines: cell containers laid out the
//! way the native library expects, converters between host values and
//! native buffers, fixed descriptor records, and a call protocol that turns
//! the native global fault flag and found flags into Rust errors.

pub mod bridge;
pub mod cell;
pub mod config;
pub mod descriptors;
pub mod errors;
pub mod marshal;
pub mod types;

// Re-export commonly used types
pub use bridge::{FoundOutcome, MockToolkit, NativeLibrary, Session};
pub use cell::{Cell, CellKind, CellValue, SpiceCell};
pub use config::{MessageLengths, SessionConfig};
pub use errors::{FaultKind, NativeFault, Result, SpiceError};
