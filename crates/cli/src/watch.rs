use lynkui_core::ServiceConfig;
use tracing::info;

pub async fn run(config: ServiceConfig) -> anyhow::Result<()> {
    info!(
        "Loading project at: {}...",
        config.app_project_path.display()
    );
    let service = lynkui_runtime::build_default_service(config, None).await?;

    let stats = service.assets().stats();
    info!("Items: {}", stats.items);
    info!("Pagelets: {}", stats.pagelets);
    for name in service.assets().pagelet_names() {
        info!(" - {}", name);
    }
    info!("File watcher started. Ready for changes.");
    info!("Press Ctrl+C to stop.");

    tokio::signal::ctrl_c().await?;
    service.shutdown().await;
    info!("Watcher stopped.");

    Ok(())
}
