//! Import functionality
//!
//! Provides the parser that turns a structure definition (YAML, or JSON since
//! it is valid YAML) into a [`Document`](crate::models::Document).

pub mod structure;
mod yaml;

pub use structure::StructureImporter;
