//! End-to-end file watching: edits on disk show up in the asset store.

use lynkui_core::asset::AssetStore;
use lynkui_core::loader::AssetLoader;
use lynkui_core::watch::{Classifier, WatchPipeline, WatchRoot};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const WINDOW: Duration = Duration::from_millis(100);

fn write(path: &Path, body: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, body).unwrap();
}

/// Poll `check` until it holds or the timeout elapses.
async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    check()
}

struct Watched {
    pipeline: Arc<WatchPipeline>,
    assets: Arc<AssetStore>,
    cancel: CancellationToken,
    handle: tokio::task::JoinHandle<()>,
}

impl Watched {
    async fn stop(self) {
        self.cancel.cancel();
        self.handle.await.unwrap();
    }
}

async fn watch(dir: &Path, window: Duration) -> Watched {
    let assets = Arc::new(AssetStore::new());
    let loader = Arc::new(AssetLoader::new(assets.clone()));
    let pipeline = Arc::new(WatchPipeline::new(loader, window));
    let cancel = CancellationToken::new();
    let handle = pipeline
        .start(WatchRoot::new(dir, Classifier::project()), cancel.clone())
        .await
        .unwrap();
    Watched {
        pipeline,
        assets,
        cancel,
        handle,
    }
}

async fn start(dir: &Path) -> (Arc<AssetStore>, CancellationToken, tokio::task::JoinHandle<()>) {
    let w = watch(dir, WINDOW).await;
    (w.assets, w.cancel, w.handle)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_initial_load_and_reload() {
    let dir = tempfile::tempdir().unwrap();
    write(
        &dir.path().join("pagelet/nav-policy-list.json"),
        r#"{"datalet":{"table_name":"lynk_dict"}}"#,
    );
    write(&dir.path().join("template/index.html"), "<p>v1</p>");
    write(&dir.path().join("notes.txt"), "ignored");

    let (assets, cancel, handle) = start(dir.path()).await;

    let pagelet = assets.pagelet("nav-policy-list").unwrap();
    assert_eq!(pagelet.name, "nav-policy-list");
    assert_eq!(assets.template("template/index.html").unwrap().html, "<p>v1</p>");
    assert!(assets.get("notes.txt").is_none());

    write(&dir.path().join("template/index.html"), "<p>v2</p>");
    assert!(
        eventually(|| {
            assets
                .template("template/index.html")
                .is_some_and(|t| t.html == "<p>v2</p>")
        })
        .await
    );

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_deleted_pagelet_is_removed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pagelet/main.json");
    write(&path, r#"{"template":{"nav":{"display":"flex-column"}}}"#);

    let (assets, cancel, handle) = start(dir.path()).await;
    assert!(assets.pagelet("main").is_some());

    std::fs::remove_file(&path).unwrap();
    assert!(eventually(|| assets.pagelet("main").is_none()).await);

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_new_directory_is_watched() {
    let dir = tempfile::tempdir().unwrap();
    let (assets, cancel, handle) = start(dir.path()).await;
    assert!(assets.pagelet_names().is_empty());

    // Several files land right behind the directory, before any watch on
    // it can exist.
    let widgets = dir.path().join("pagelet");
    std::fs::create_dir(&widgets).unwrap();
    for name in ["fresh", "other", "third"] {
        std::fs::write(widgets.join(format!("{name}.json")), "{}").unwrap();
    }
    assert!(eventually(|| assets.pagelet_names().len() == 3).await);

    // Files added later to the new directory are picked up as well.
    write(&widgets.join("second.json"), r#"{}"#);
    assert!(eventually(|| assets.pagelet("second").is_some()).await);

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_directory_moved_in_is_loaded() {
    let dir = tempfile::tempdir().unwrap();
    let staging = tempfile::tempdir_in(dir.path().parent().unwrap()).unwrap();
    write(&staging.path().join("pagelet/a.json"), "{}");
    write(&staging.path().join("pagelet/nested/b.json"), "{}");
    write(&staging.path().join("template/index.html"), "<p></p>");

    let (assets, cancel, handle) = start(dir.path()).await;
    std::fs::rename(staging.path().join("pagelet"), dir.path().join("pagelet")).unwrap();
    std::fs::rename(staging.path().join("template"), dir.path().join("template")).unwrap();

    assert!(
        eventually(|| {
            assets.pagelet_names() == ["a", "nested/b"]
                && assets.template("template/index.html").is_some()
        })
        .await
    );

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_file_moved_out_is_removed() {
    let dir = tempfile::tempdir().unwrap();
    let outside = tempfile::tempdir_in(dir.path().parent().unwrap()).unwrap();
    write(&dir.path().join("pagelet/main.json"), "{}");
    write(&dir.path().join("pagelet/old.json"), "{}");
    write(&dir.path().join("template/index.html"), "<p></p>");

    let (assets, cancel, handle) = start(dir.path()).await;
    assert_eq!(assets.pagelet_names(), ["main", "old"]);

    std::fs::rename(
        dir.path().join("pagelet/main.json"),
        outside.path().join("main.json"),
    )
    .unwrap();
    std::fs::rename(
        dir.path().join("template/index.html"),
        outside.path().join("index.html"),
    )
    .unwrap();
    // Renamed inside the root: the old name goes, the new one arrives.
    std::fs::rename(
        dir.path().join("pagelet/old.json"),
        dir.path().join("pagelet/new.json"),
    )
    .unwrap();

    assert!(
        eventually(|| {
            assets.pagelet_names() == ["new"] && assets.template("template/index.html").is_none()
        })
        .await
    );

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_directory_moved_out_is_removed() {
    let dir = tempfile::tempdir().unwrap();
    let outside = tempfile::tempdir_in(dir.path().parent().unwrap()).unwrap();
    write(&dir.path().join("app/pagelet/a.json"), "{}");
    write(&dir.path().join("app/pagelet/sub/b.json"), "{}");
    write(&dir.path().join("app/template/index.html"), "<p></p>");
    write(&dir.path().join("pagelet/kept.json"), "{}");

    let (assets, cancel, handle) = start(dir.path()).await;
    assert_eq!(assets.pagelet_names(), ["a", "kept", "sub/b"]);

    std::fs::rename(dir.path().join("app"), outside.path().join("app")).unwrap();
    assert!(
        eventually(|| {
            assets.pagelet_names() == ["kept"] && assets.template("app/template/index.html").is_none()
        })
        .await
    );

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_bursts_reload_once() {
    let window = Duration::from_millis(300);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("template/index.html");
    write(&path, "<p>0</p>");

    let w = watch(dir.path(), window).await;
    assert_eq!(w.pipeline.totals().loaded, 1);

    for n in 1..=5 {
        std::fs::write(&path, format!("<p>{n}</p>")).unwrap();
    }
    assert!(eventually(|| w.pipeline.totals().loaded == 2).await);
    assert_eq!(w.assets.template("template/index.html").unwrap().html, "<p>5</p>");

    tokio::time::sleep(window * 3).await;
    assert_eq!(w.pipeline.totals().loaded, 2);

    std::fs::write(&path, "<p>6</p>").unwrap();
    assert!(eventually(|| w.pipeline.totals().loaded == 3).await);
    tokio::time::sleep(window * 3).await;
    assert_eq!(w.pipeline.totals().loaded, 3);

    w.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_broken_file_keeps_previous_widget() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pagelet/main.json");
    write(&path, r#"{"datalet":{"table_name":"first"}}"#);

    let (assets, cancel, handle) = start(dir.path()).await;
    write(&path, "{ not json");
    // Give the debouncer time to fire on the broken content.
    tokio::time::sleep(WINDOW * 5).await;
    assert_eq!(
        assets.pagelet("main").unwrap().datalet.as_ref().unwrap().table_name,
        "first"
    );

    write(&path, r#"{"datalet":{"table_name":"second"}}"#);
    assert!(
        eventually(|| {
            assets
                .pagelet("main")
                .and_then(|p| p.datalet.as_ref().map(|d| d.table_name == "second"))
                .unwrap_or(false)
        })
        .await
    );

    cancel.cancel();
    handle.await.unwrap();
}

#[test]
fn test_load_root_without_watching() {
    let dir = tempfile::tempdir().unwrap();
    write(&dir.path().join("lynkui/main.css"), "body{}");
    write(&dir.path().join("lynkui/main.js"), "void 0");
    write(&dir.path().join("lynkui/other.css"), "ignored");

    let assets = Arc::new(AssetStore::new());
    let loader = Arc::new(AssetLoader::new(assets.clone()).without_write_back());
    let pipeline = WatchPipeline::new(loader, WINDOW);
    let stats = pipeline.load_root(&WatchRoot::new(dir.path(), Classifier::standard_assets()));

    assert_eq!(stats.loaded, 2);
    assert_eq!(stats.failed, 0);
    assert_eq!(pipeline.totals(), stats);
    assert!(assets.get("lynkui/main.css").is_some());
    assert!(assets.get("lynkui/other.css").is_none());
}
