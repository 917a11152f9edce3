use super::classify::Classifier;
use super::debounce::Debouncer;
use crate::error::{LynkuiError, Result};
use crate::loader::AssetLoader;
use notify::event::ModifyKind;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcher};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// A directory tree watched with its own classification rules.
#[derive(Debug, Clone)]
pub struct WatchRoot {
    path: PathBuf,
    classifier: Classifier,
}

impl WatchRoot {
    pub fn new(path: impl Into<PathBuf>, classifier: Classifier) -> Self {
        let path = path.into();
        let path = path.canonicalize().unwrap_or(path);
        Self { path, classifier }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Root-relative path with `/` separators.
    pub fn relative(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.path).ok()?;
        let parts: Vec<_> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect();
        if parts.is_empty() {
            return None;
        }
        Some(parts.join("/"))
    }

    fn is_relevant(&self, path: &Path) -> bool {
        self.relative(path)
            .is_some_and(|rel| self.classifier.matches(&rel))
    }

    /// Every classified file below `dir`.
    fn collect_files(&self, dir: &Path) -> Vec<PathBuf> {
        WalkDir::new(dir)
            .follow_links(false)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("walk {}: {}", dir.display(), e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| self.is_relevant(path))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub loaded: usize,
    pub failed: usize,
    pub removed: usize,
}

impl LoadStats {
    fn add(&mut self, other: LoadStats) {
        self.loaded += other.loaded;
        self.failed += other.failed;
        self.removed += other.removed;
    }
}

struct FsWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::UnboundedReceiver<notify::Result<Event>>,
}

impl FsWatcher {
    fn new(root: &Path) -> notify::Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = tx.send(res);
            },
            Config::default(),
        )?;
        // Recursive mode also picks up directories created later.
        watcher.watch(root, RecursiveMode::Recursive)?;
        Ok(Self {
            _watcher: watcher,
            rx,
        })
    }

    async fn next_event_async(&mut self) -> Option<notify::Result<Event>> {
        self.rx.recv().await
    }
}

/// Keeps the asset store in sync with one or more watched roots.
///
/// Each root gets its own task consuming its events in arrival order;
/// there is no ordering between roots.
pub struct WatchPipeline {
    loader: Arc<AssetLoader>,
    window: Duration,
    totals: Mutex<LoadStats>,
}

impl WatchPipeline {
    pub fn new(loader: Arc<AssetLoader>, window: Duration) -> Self {
        Self {
            loader,
            window,
            totals: Mutex::new(LoadStats::default()),
        }
    }

    pub fn loader(&self) -> &Arc<AssetLoader> {
        &self.loader
    }

    /// Everything loaded, failed and removed since the pipeline was built.
    pub fn totals(&self) -> LoadStats {
        *self.totals.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, stats: LoadStats) {
        self.totals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .add(stats);
    }

    /// Load every classified file under the root.
    pub fn load_root(&self, root: &WatchRoot) -> LoadStats {
        let mut stats = LoadStats::default();
        for path in root.collect_files(root.path()) {
            self.dispatch(root, &path, &mut stats);
        }
        self.record(stats);
        info!(
            "root {} loaded: {} ok, {} failed",
            root.path().display(),
            stats.loaded,
            stats.failed
        );
        stats
    }

    /// Bring the store in line with `path` as it is now: a directory has
    /// every classified file below it loaded, a file is loaded when it
    /// classifies, and a missing path unloads whatever came from it or
    /// from below it.
    pub fn dispatch(&self, root: &WatchRoot, path: &Path, stats: &mut LoadStats) {
        if path.is_dir() {
            for file in root.collect_files(path) {
                self.dispatch(root, &file, stats);
            }
            return;
        }
        if !path.exists() {
            stats.removed += self.loader.unload(path);
            return;
        }

        let Some(rel) = root.relative(path) else {
            return;
        };
        let Some(kind) = root.classifier().classify(&rel) else {
            return;
        };
        match self.loader.load(path, &rel, &kind) {
            Ok(_) => stats.loaded += 1,
            Err(e) => {
                warn!("asset {}, err {}", rel, e);
                stats.failed += 1;
            }
        }
    }

    /// Start watching `root`: subscribe first, run the initial load, then
    /// hand the event stream to a background task that runs until
    /// `cancel_token` fires or the event channel closes.
    pub async fn start(
        self: &Arc<Self>,
        root: WatchRoot,
        cancel_token: CancellationToken,
    ) -> Result<JoinHandle<()>> {
        let watcher = FsWatcher::new(root.path())?;
        info!("watch {}", root.path().display());

        let initial = {
            let pipeline = self.clone();
            let root = root.clone();
            tokio::task::spawn_blocking(move || pipeline.load_root(&root))
                .await
                .map_err(|e| LynkuiError::Internal(e.to_string()))?
        };
        debug!("initial load of {}: {:?}", root.path().display(), initial);

        let pipeline = self.clone();
        Ok(tokio::spawn(async move {
            pipeline.run(root, watcher, cancel_token).await;
        }))
    }

    async fn run(self: Arc<Self>, root: WatchRoot, mut watcher: FsWatcher, cancel_token: CancellationToken) {
        let root = Arc::new(root);
        let mut debouncer: Debouncer<PathBuf> = Debouncer::new(self.window);

        loop {
            let deadline = debouncer.next_deadline();
            tokio::select! {
                _ = cancel_token.cancelled() => {
                    break;
                }
                event = watcher.next_event_async() => {
                    match event {
                        Some(Ok(event)) => self.accept(&root, event, &mut debouncer),
                        Some(Err(e)) => warn!("fsnotify err {}", e),
                        None => break,
                    }
                }
                _ = sleep_until_deadline(deadline), if deadline.is_some() => {
                    let due = debouncer.drain_due(Instant::now());
                    if due.is_empty() {
                        continue;
                    }
                    let pipeline = self.clone();
                    let root = root.clone();
                    let result = tokio::task::spawn_blocking(move || {
                        let mut stats = LoadStats::default();
                        for path in due {
                            pipeline.dispatch(&root, &path, &mut stats);
                        }
                        stats
                    })
                    .await;
                    match result {
                        Ok(stats) => {
                            debug!("reload {:?}", stats);
                            self.record(stats);
                        }
                        Err(e) => warn!("reload task failed: {}", e),
                    }
                }
            }
        }
        info!("File watcher task ended for {}", root.path().display());
    }

    fn accept(&self, root: &WatchRoot, event: Event, debouncer: &mut Debouncer<PathBuf>) {
        let now = Instant::now();
        match event.kind {
            EventKind::Create(_)
            | EventKind::Remove(_)
            | EventKind::Modify(ModifyKind::Data(_))
            | EventKind::Modify(ModifyKind::Any)
            // Both sides of a move: the source is gone, the destination is new.
            | EventKind::Modify(ModifyKind::Name(_)) => {}
            _ => return,
        }

        for path in event.paths {
            if root.relative(&path).is_none() {
                continue;
            }
            // A directory is rescanned when it fires: files written into a
            // fresh directory before its watch is in place raise no events.
            // A missing path may have been a directory holding loaded files.
            if path.is_dir() || !path.exists() || root.is_relevant(&path) {
                debug!("fsnotify event {:?}, path {}", event.kind, path.display());
                debouncer.push(path, now);
            }
        }
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    if let Some(deadline) = deadline {
        tokio::time::sleep_until(deadline).await;
    }
}
