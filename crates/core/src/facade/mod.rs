use std::sync::{Arc, Mutex, PoisonError};

use crate::asset::AssetStore;
use crate::config::{LOCAL_INSTANCE, ServiceConfig};
use crate::error::{LynkuiError, Result};
use crate::layout::{DataLayout, LayoutStore};
use crate::loader::AssetLoader;
use crate::object::{DICT_TABLE, ObjectService};
use crate::watch::{Classifier, WatchPipeline, WatchRoot};
use lynkui_api::{ClientConnector, DataInsert, VirtualTable};
use serde_json::json;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

mod datalet;

/// Composition root: layout router, local data service, asset store and
/// the watchers keeping the asset store current.
pub struct UiService {
    config: ServiceConfig,
    layout: Arc<DataLayout>,
    assets: Arc<AssetStore>,
    main_data: Arc<ObjectService>,
    cancel_token: CancellationToken,
    watchers: Mutex<Vec<JoinHandle<()>>>,
}

pub struct UiServiceBuilder {
    config: ServiceConfig,
    connector: Option<Arc<dyn ClientConnector>>,
    watch: bool,
    write_back: bool,
    seed: Vec<DataInsert>,
}

impl UiServiceBuilder {
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            config,
            connector: None,
            watch: true,
            write_back: true,
            seed: default_dict_rows(),
        }
    }

    pub fn with_connector(mut self, connector: Arc<dyn ClientConnector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Load assets once without subscribing to changes.
    pub fn without_watch(mut self) -> Self {
        self.watch = false;
        self
    }

    /// Never rewrite project files in canonical form.
    pub fn without_write_back(mut self) -> Self {
        self.write_back = false;
        self
    }

    /// Replace the dictionary rows inserted (if absent) at startup.
    pub fn with_seed_rows(mut self, rows: Vec<DataInsert>) -> Self {
        self.seed = rows;
        self
    }

    pub async fn start(self) -> Result<Arc<UiService>> {
        let config = self.config.prepare()?;

        let layout_file = config.layout_file();
        let data_file = config.data_file();
        // An existing layout requires its data document.
        let main_data = if layout_file.exists() {
            ObjectService::open_existing(LOCAL_INSTANCE, &data_file)?
        } else {
            ObjectService::open(LOCAL_INSTANCE, &data_file)?
        };
        let main_data = Arc::new(main_data);

        let store = Arc::new(LayoutStore::load(&layout_file)?);
        let mut layout = DataLayout::new(store);
        if let Some(connector) = self.connector {
            layout = layout.with_connector(connector);
        }
        let layout = Arc::new(layout);

        main_data.table_setup(DICT_TABLE);
        for row in &self.seed {
            if let Err(e) = main_data.igsert(row) {
                warn!("igsert fail {}", e);
            }
        }
        if let Err(e) = main_data.flush() {
            warn!("data flush fail {}", e);
        }
        layout.register_service(main_data.clone())?;
        layout.ensure_table(VirtualTable::new(DICT_TABLE, LOCAL_INSTANCE, DICT_TABLE))?;
        layout.connect_all();

        let assets = Arc::new(AssetStore::new());
        let service = Arc::new(UiService {
            config,
            layout,
            assets,
            main_data,
            cancel_token: CancellationToken::new(),
            watchers: Mutex::new(Vec::new()),
        });
        service.start_assets(self.watch, self.write_back).await?;
        Ok(service)
    }
}

impl UiService {
    pub fn builder(config: ServiceConfig) -> UiServiceBuilder {
        UiServiceBuilder::new(config)
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn layout(&self) -> &Arc<DataLayout> {
        &self.layout
    }

    pub fn assets(&self) -> &Arc<AssetStore> {
        &self.assets
    }

    pub fn main_data(&self) -> &Arc<ObjectService> {
        &self.main_data
    }

    /// Stop every watcher task and wait for them to finish.
    pub async fn shutdown(&self) {
        self.cancel_token.cancel();
        let handles: Vec<_> = self
            .watchers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        for handle in handles {
            let _ = handle.await;
        }
    }

    /// Roots to load, each paired with whether it follows edits.
    fn watch_roots(&self, watch: bool) -> Vec<(WatchRoot, bool)> {
        let mut roots = vec![(
            WatchRoot::new(&self.config.app_project_path, Classifier::project()),
            watch,
        )];
        // Standard assets only follow edits in dev mode.
        if let Some(assets) = &self.config.assets_path {
            roots.push((
                WatchRoot::new(assets, Classifier::standard_assets()),
                watch && self.config.is_dev(),
            ));
        }
        roots
    }

    async fn start_assets(&self, watch: bool, write_back: bool) -> Result<()> {
        let mut loader = AssetLoader::new(self.assets.clone());
        if !write_back {
            loader = loader.without_write_back();
        }
        let loader = Arc::new(loader);
        let pipeline = Arc::new(WatchPipeline::new(loader, self.config.debounce_window()));

        for (root, follow) in self.watch_roots(watch) {
            if follow {
                let handle = pipeline.start(root, self.cancel_token.clone()).await?;
                self.watchers
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(handle);
            } else {
                let pipeline = pipeline.clone();
                tokio::task::spawn_blocking(move || pipeline.load_root(&root))
                    .await
                    .map_err(|e| LynkuiError::Internal(e.to_string()))?;
            }
        }

        let stats = self.assets.stats();
        let totals = pipeline.totals();
        info!(
            "assets ready: {} items, {} pagelets, {} files failed",
            stats.items, stats.pagelets, totals.failed
        );
        Ok(())
    }
}

impl Drop for UiService {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

/// Dictionary rows every project starts with.
pub fn default_dict_rows() -> Vec<DataInsert> {
    let row = |ns: &str, name: &str, display: &str| {
        DataInsert::new(DICT_TABLE)
            .with_field("ns", ns)
            .with_field("name", name)
            .with_field("display_name", display)
    };
    vec![
        row("index", "topnav", "TopNav Menu"),
        row("index", "policynav", "Policy Menu"),
        row("policynav", "policy-allow", "Allow").with_field(
            "ext_fields",
            json!({"pagelet": "nav-policy-list", "default_select": "y"}),
        ),
        row("policynav", "policy-deny", "Deny"),
        row("policynav", "policy-item-hit", "Item Hit"),
        row("policynav", "policy-list-hit", "List Hit"),
    ]
}
