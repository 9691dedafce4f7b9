//! duodok-common: shared error taxonomy and structure types used across the DuoDok crates.

pub mod error;
pub mod entities;

pub use entities::{StructureCategory, StructureFile, StructureOrigin};
pub use error::{DuodokError, ParseError, Result, ToolExecutionError, ToolFailure};
