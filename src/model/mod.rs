//! Schema model, reference resolution and name translation
//!
//! [`load_structure`] runs the whole load pipeline: parse, validate, index,
//! resolve references. The result is shared read-only behind an `Arc`.

pub mod loader;
pub mod registry;
pub mod resolver;
pub mod schema;
pub mod translator;

pub use loader::StructureLoader;
pub use registry::SchemaRegistry;
pub use resolver::{ReferenceResolver, Relation};
pub use schema::{FieldDescriptor, SchemaModel, TableDescriptor, TableIndex};
pub use translator::TableTranslator;

use crate::config::ResolverOptions;
use crate::error::Result;
use crate::import::StructureImporter;
use std::sync::Arc;

/// Parse, validate and index a structure definition.
pub fn load_structure(content: &str) -> Result<Arc<SchemaModel>> {
    load_structure_with(content, ResolverOptions::default())
}

/// [`load_structure`] with explicit resolver options.
pub fn load_structure_with(content: &str, options: ResolverOptions) -> Result<Arc<SchemaModel>> {
    let document = StructureImporter::new().parse(content)?;
    Ok(Arc::new(SchemaModel::build_with(document, options)?))
}
