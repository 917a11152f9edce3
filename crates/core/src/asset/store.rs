use crate::util::normalize_key;
use lynkui_api::{Pagelet, TemplateHtml};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

#[derive(Debug, Clone, PartialEq)]
pub enum AssetContent {
    Template(TemplateHtml),
    Pagelet(Pagelet),
}

#[derive(Debug, Clone)]
pub struct AssetEntry {
    pub key: String,
    pub content: Arc<AssetContent>,
    pub updated_at: SystemTime,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssetStats {
    pub items: usize,
    pub pagelets: usize,
}

#[derive(Default)]
struct Assets {
    items: HashMap<String, AssetEntry>,
    pagelets: HashMap<String, Arc<Pagelet>>,
}

/// Thread-safe asset store. A single mutex serializes every access.
#[derive(Default)]
pub struct AssetStore {
    inner: Mutex<Assets>,
}

impl AssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the entry under the normalized `key`.
    pub fn sync(&self, key: &str, content: AssetContent) {
        let key = normalize_key(key);
        let entry = AssetEntry {
            key: key.clone(),
            content: Arc::new(content),
            updated_at: SystemTime::now(),
        };
        self.lock().items.insert(key, entry);
    }

    pub fn get(&self, key: &str) -> Option<Arc<AssetContent>> {
        self.entry(key).map(|e| e.content)
    }

    pub fn entry(&self, key: &str) -> Option<AssetEntry> {
        self.lock().items.get(&normalize_key(key)).cloned()
    }

    /// Raw template stored under `key`, if that entry is a template.
    pub fn template(&self, key: &str) -> Option<TemplateHtml> {
        match self.get(key)?.as_ref() {
            AssetContent::Template(html) => Some(html.clone()),
            AssetContent::Pagelet(_) => None,
        }
    }

    pub fn remove(&self, key: &str) -> bool {
        self.lock().items.remove(&normalize_key(key)).is_some()
    }

    pub fn set_pagelet(&self, name: &str, pagelet: Pagelet) {
        self.lock()
            .pagelets
            .insert(name.to_string(), Arc::new(pagelet));
    }

    pub fn pagelet(&self, name: &str) -> Option<Arc<Pagelet>> {
        self.lock().pagelets.get(name).cloned()
    }

    pub fn remove_pagelet(&self, name: &str) -> bool {
        self.lock().pagelets.remove(name).is_some()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.lock().items.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn pagelet_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.lock().pagelets.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn stats(&self) -> AssetStats {
        let inner = self.lock();
        AssetStats {
            items: inner.items.len(),
            pagelets: inner.pagelets.len(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Assets> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn html(file: &str, body: &str) -> AssetContent {
        AssetContent::Template(TemplateHtml {
            file: file.to_string(),
            html: body.to_string(),
        })
    }

    #[test]
    fn test_sync_normalizes_key() {
        let store = AssetStore::new();
        store.sync("/template/index.html", html("template/index.html", "<p>1</p>"));

        assert!(store.get("template/index.html").is_some());
        assert!(store.get("/template/index.html").is_some());
        assert_eq!(store.keys(), vec!["template/index.html".to_string()]);
    }

    #[test]
    fn test_last_write_wins() {
        let store = AssetStore::new();
        store.sync("a.html", html("a.html", "old"));
        store.sync("a.html", html("a.html", "new"));

        assert_eq!(store.template("a.html").unwrap().html, "new");
        assert_eq!(store.stats().items, 1);
    }

    #[test]
    fn test_pagelets_are_separate_from_items() {
        let store = AssetStore::new();
        store.set_pagelet(
            "main",
            Pagelet {
                name: "main".to_string(),
                ..Default::default()
            },
        );

        assert!(store.get("main").is_none());
        assert_eq!(store.pagelet("main").unwrap().name, "main");
        assert_eq!(
            store.stats(),
            AssetStats {
                items: 0,
                pagelets: 1
            }
        );

        assert!(store.remove_pagelet("main"));
        assert!(store.pagelet("main").is_none());
        assert!(!store.remove_pagelet("main"));
    }

    #[test]
    fn test_concurrent_sync() {
        let store = Arc::new(AssetStore::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for j in 0..50 {
                        let key = format!("template/{}-{}.html", i, j % 5);
                        store.sync(&key, html(&key, "x"));
                        let _ = store.get(&key);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(store.stats().items, 40);
    }
}
