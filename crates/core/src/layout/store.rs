//! Persisted layout document: instance registrations plus virtual tables.

use crate::error::{LynkuiError, Result};
use crate::util::{to_canonical_json, write_atomic};
use lynkui_api::{DataInstance, VirtualTable};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct LayoutDocument {
    #[serde(default)]
    pub instances: Vec<DataInstance>,
    #[serde(default)]
    pub tables: Vec<VirtualTable>,
}

impl LayoutDocument {
    pub fn instance(&self, name: &str) -> Option<&DataInstance> {
        self.instances.iter().find(|i| i.name == name)
    }

    pub fn table(&self, name: &str) -> Option<&VirtualTable> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Replace the instance with the same name, or append it.
    pub fn upsert_instance(&mut self, instance: DataInstance) {
        match self.instances.iter_mut().find(|i| i.name == instance.name) {
            Some(slot) => *slot = instance,
            None => self.instances.push(instance),
        }
    }

    pub fn upsert_table(&mut self, table: VirtualTable) {
        match self.tables.iter_mut().find(|t| t.name == table.name) {
            Some(slot) => *slot = table,
            None => self.tables.push(table),
        }
    }
}

/// Owner of the layout document and its backing file.
///
/// Every mutation goes through [`LayoutStore::update`]; callers flush
/// explicitly afterwards. A failed flush leaves the in-memory document ahead
/// of disk until the next successful one.
pub struct LayoutStore {
    path: Option<PathBuf>,
    document: Mutex<LayoutDocument>,
}

impl LayoutStore {
    /// Store without a backing file (for testing).
    pub fn in_memory() -> Self {
        Self::with_document(None, LayoutDocument::default())
    }

    pub fn with_document(path: Option<PathBuf>, document: LayoutDocument) -> Self {
        Self {
            path,
            document: Mutex::new(document),
        }
    }

    /// Decode the document at `path`. A missing file yields an empty document.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let document = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| LynkuiError::Decode {
                path: path.clone(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => LayoutDocument::default(),
            Err(e) => return Err(e.into()),
        };
        tracing::debug!(
            "layout {} loaded: {} instances, {} tables",
            path.display(),
            document.instances.len(),
            document.tables.len()
        );
        Ok(Self::with_document(Some(path), document))
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn snapshot(&self) -> LayoutDocument {
        self.lock().clone()
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut LayoutDocument) -> R) -> R {
        f(&mut self.lock())
    }

    /// Serialize the whole document and replace the file atomically.
    pub fn flush(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let doc = self.lock();
        let bytes = to_canonical_json(&*doc)?;
        write_atomic(path, &bytes).map_err(|source| LynkuiError::PersistenceWrite {
            path: path.clone(),
            source,
        })
    }

    fn lock(&self) -> MutexGuard<'_, LayoutDocument> {
        self.document.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
