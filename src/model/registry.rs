//! Schema registry
//!
//! Holds the schema currently in force. Readers take an `Arc` snapshot and
//! keep using it for as long as they like; a reload builds a complete new
//! model first and only then swaps the pointer, so no reader ever sees a
//! partly updated schema. The lock is held only for the pointer copy.

use super::schema::SchemaModel;
use super::load_structure_with;
use crate::config::ResolverOptions;
use crate::error::Result;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{info, warn};

/// Current schema plus atomic reload
#[derive(Debug)]
pub struct SchemaRegistry {
    current: RwLock<Arc<SchemaModel>>,
    options: ResolverOptions,
}

impl SchemaRegistry {
    pub fn new(model: Arc<SchemaModel>) -> Self {
        Self::with_options(model, ResolverOptions::default())
    }

    pub fn with_options(model: Arc<SchemaModel>, options: ResolverOptions) -> Self {
        Self {
            current: RwLock::new(model),
            options,
        }
    }

    /// Parse, validate and install a definition.
    pub fn load(content: &str, options: ResolverOptions) -> Result<Self> {
        Ok(Self::with_options(load_structure_with(content, options)?, options))
    }

    /// The schema in force right now.
    pub fn snapshot(&self) -> Arc<SchemaModel> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Build a new schema from `content` and install it.
    ///
    /// On failure the previous schema stays in force.
    pub fn reload(&self, content: &str) -> Result<Arc<SchemaModel>> {
        match load_structure_with(content, self.options) {
            Ok(model) => {
                self.replace(model.clone());
                info!("Reloaded structure definition: {} tables", model.table_count());
                Ok(model)
            }
            Err(e) => {
                warn!("Reload rejected, keeping previous schema: {}", e);
                Err(e)
            }
        }
    }

    /// Install an already-built schema.
    pub fn replace(&self, model: Arc<SchemaModel>) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = model;
    }
}
