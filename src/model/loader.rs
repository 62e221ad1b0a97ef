//! Structure loading functionality
//!
//! Reads structure definitions through a storage backend and runs them through
//! the full load pipeline. Writing goes through the exporter so saved files
//! keep their tab, table and field order.

use super::registry::SchemaRegistry;
use super::schema::SchemaModel;
use super::load_structure_with;
use crate::config::ResolverOptions;
use crate::error::Result;
use crate::export::StructureExporter;
use crate::import::StructureImporter;
use crate::models::Document;
use crate::storage::StorageBackend;
use std::sync::Arc;
use tracing::info;

/// Structure loader that uses a storage backend
pub struct StructureLoader<B: StorageBackend> {
    storage: B,
    options: ResolverOptions,
}

impl<B: StorageBackend> StructureLoader<B> {
    /// Create a new loader with the given storage backend
    pub fn new(storage: B) -> Self {
        Self::with_options(storage, ResolverOptions::default())
    }

    pub fn with_options(storage: B, options: ResolverOptions) -> Self {
        Self { storage, options }
    }

    /// Load, validate and index the definition at `path`.
    pub async fn load(&self, path: &str) -> Result<Arc<SchemaModel>> {
        let content = self.storage.read_text(path).await?;
        let model = load_structure_with(&content, self.options)?;
        info!("Loaded structure definition {} ({} tables)", path, model.table_count());
        Ok(model)
    }

    /// Parse the definition at `path` without validating it.
    pub async fn load_document(&self, path: &str) -> Result<Document> {
        let content = self.storage.read_text(path).await?;
        StructureImporter::new().parse(&content)
    }

    /// Load the definition at `path` into a new registry.
    pub async fn load_registry(&self, path: &str) -> Result<SchemaRegistry> {
        Ok(SchemaRegistry::with_options(self.load(path).await?, self.options))
    }

    /// Re-read `path` and swap it into `registry` if it loads cleanly.
    pub async fn reload(&self, registry: &SchemaRegistry, path: &str) -> Result<Arc<SchemaModel>> {
        let content = self.storage.read_text(path).await?;
        registry.reload(&content)
    }

    /// Write `document` to `path` as YAML.
    pub async fn save(&self, path: &str, document: &Document) -> Result<()> {
        let yaml = StructureExporter::new().to_yaml(document)?;
        self.storage.write_file(path, yaml.as_bytes()).await?;
        info!("Saved structure definition {}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StructureError;
    use crate::storage::StorageError;
    use async_trait::async_trait;
    use std::cell::RefCell;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MapStorage {
        files: RefCell<HashMap<String, Vec<u8>>>,
    }

    #[async_trait(?Send)]
    impl StorageBackend for MapStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>, StorageError> {
            self.files
                .borrow()
                .get(path)
                .cloned()
                .ok_or_else(|| StorageError::FileNotFound(path.to_string()))
        }

        async fn write_file(&self, path: &str, content: &[u8]) -> Result<(), StorageError> {
            self.files.borrow_mut().insert(path.to_string(), content.to_vec());
            Ok(())
        }

        async fn file_exists(&self, path: &str) -> Result<bool, StorageError> {
            Ok(self.files.borrow().contains_key(path))
        }
    }

    fn block_on<F: std::future::Future>(future: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(future)
    }

    const DEFINITION: &str = r#"
tabs:
  A:
    tab_id: a
    tables:
      t:
        table_id: 1
        fields:
          f: { field_id: 1, field_type: text }
"#;

    #[test]
    fn test_load_and_save() {
        block_on(async {
            let storage = MapStorage::default();
            storage.write_file("structure.yaml", DEFINITION.as_bytes()).await.unwrap();
            let loader = StructureLoader::new(storage);

            let model = loader.load("structure.yaml").await.unwrap();
            assert_eq!(model.table_count(), 1);

            loader.save("copy.yaml", model.document()).await.unwrap();
            let copy = loader.load_document("copy.yaml").await.unwrap();
            assert_eq!(&copy, model.document());
        });
    }

    #[test]
    fn test_missing_file() {
        block_on(async {
            let loader = StructureLoader::new(MapStorage::default());
            let result = loader.load("missing.yaml").await;
            assert!(matches!(
                result,
                Err(StructureError::Storage(StorageError::FileNotFound(_)))
            ));
        });
    }

    #[test]
    fn test_invalid_utf8() {
        block_on(async {
            let storage = MapStorage::default();
            storage.write_file("bad.yaml", &[0xff, 0xfe]).await.unwrap();
            let loader = StructureLoader::new(storage);
            assert!(matches!(
                loader.load("bad.yaml").await,
                Err(StructureError::Storage(StorageError::InvalidContent { .. }))
            ));
        });
    }
}
