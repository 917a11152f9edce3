//! Per-kind file loaders feeding the asset store.

use crate::asset::{AssetContent, AssetStore};
use crate::error::{LynkuiError, Result};
use crate::util::{to_canonical_json, write_atomic};
use crate::watch::AssetKind;
use lynkui_api::{Pagelet, Project, TemplateHtml};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded,
    /// Loaded, and the file was rewritten in canonical form.
    Canonicalized,
}

/// What a file on disk contributed to the store.
#[derive(Debug, Clone)]
struct Source {
    rel: String,
    kind: AssetKind,
}

pub struct AssetLoader {
    assets: Arc<AssetStore>,
    write_back: bool,
    sources: Mutex<HashMap<PathBuf, Source>>,
}

impl AssetLoader {
    pub fn new(assets: Arc<AssetStore>) -> Self {
        Self {
            assets,
            write_back: true,
            sources: Mutex::new(HashMap::new()),
        }
    }

    /// Disable canonical write-back (read-only trees).
    pub fn without_write_back(mut self) -> Self {
        self.write_back = false;
        self
    }

    pub fn assets(&self) -> &Arc<AssetStore> {
        &self.assets
    }

    /// Read `path` and register its content. Decode failures leave the
    /// previously loaded state untouched.
    pub fn load(&self, path: &Path, rel: &str, kind: &AssetKind) -> Result<LoadOutcome> {
        let outcome = self.load_kind(path, rel, kind)?;
        self.lock_sources().insert(
            path.to_path_buf(),
            Source {
                rel: rel.to_string(),
                kind: kind.clone(),
            },
        );
        Ok(outcome)
    }

    fn load_kind(&self, path: &Path, rel: &str, kind: &AssetKind) -> Result<LoadOutcome> {
        match kind {
            AssetKind::Project => {
                let bytes = std::fs::read(path)?;
                let project: Project = decode(path, &bytes)?;
                info!(
                    "asset {}, kind {}, name {}",
                    rel, project.kind, project.name
                );
                Ok(self.write_back(path, rel, &bytes, &project))
            }
            AssetKind::Pagelet { name } => {
                let bytes = std::fs::read(path)?;
                let mut pagelet: Pagelet = decode(path, &bytes)?;
                pagelet.name = name.clone();
                if let Some(datalet) = pagelet.datalet.as_mut() {
                    datalet.table_spec = None;
                }
                info!("asset {}, name {}", rel, name);
                self.assets.set_pagelet(name, pagelet.clone());
                Ok(self.write_back(path, rel, &bytes, &pagelet))
            }
            AssetKind::Template => {
                let html = std::fs::read_to_string(path)?;
                self.assets.sync(
                    rel,
                    AssetContent::Template(TemplateHtml {
                        file: rel.to_string(),
                        html,
                    }),
                );
                info!("asset {}", rel);
                Ok(LoadOutcome::Loaded)
            }
        }
    }

    /// Drop whatever was loaded from `path`, or from any file below it when
    /// `path` was a directory. Returns the number of entries removed.
    pub fn unload(&self, path: &Path) -> usize {
        let gone: Vec<Source> = {
            let mut sources = self.lock_sources();
            let hit: Vec<PathBuf> = sources
                .keys()
                .filter(|p| p.starts_with(path))
                .cloned()
                .collect();
            hit.iter().filter_map(|p| sources.remove(p)).collect()
        };
        gone.iter()
            .filter(|source| self.unload_source(source))
            .count()
    }

    fn unload_source(&self, source: &Source) -> bool {
        let removed = match &source.kind {
            AssetKind::Project => false,
            AssetKind::Pagelet { name } => self.assets.remove_pagelet(name),
            AssetKind::Template => self.assets.remove(&source.rel),
        };
        if removed {
            info!("asset {} removed", source.rel);
        }
        removed
    }

    fn lock_sources(&self) -> MutexGuard<'_, HashMap<PathBuf, Source>> {
        self.sources.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_back<T: Serialize>(
        &self,
        path: &Path,
        rel: &str,
        current: &[u8],
        value: &T,
    ) -> LoadOutcome {
        if !self.write_back {
            return LoadOutcome::Loaded;
        }
        let canonical = match to_canonical_json(value) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("asset {}, encode fail {}", rel, e);
                return LoadOutcome::Loaded;
            }
        };
        // Already canonical: rewriting would only trigger another event.
        if canonical == current {
            return LoadOutcome::Loaded;
        }
        match write_atomic(path, &canonical) {
            Ok(()) => {
                info!("asset {}, flush ok", rel);
                LoadOutcome::Canonicalized
            }
            Err(e) => {
                warn!("asset {}, flush fail {}", rel, e);
                LoadOutcome::Loaded
            }
        }
    }
}

fn decode<T: DeserializeOwned>(path: &Path, bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|source| LynkuiError::Decode {
        path: path.to_path_buf(),
        source,
    })
}
