//! Export functionality
//!
//! Serializes documents back into structure definitions.

pub mod structure;

pub use structure::StructureExporter;
