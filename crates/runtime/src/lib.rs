use lynkui_api::ClientConnector;
use lynkui_core::{Result, ServiceConfig, UiService};
use std::sync::Arc;

/// Bootstraps a UiService over a project directory.
///
/// Remote instances found in the layout document are connected through
/// `connector`; without one they stay registered but unreachable, and
/// requests routed to them fail with `BackendNotFound`.
pub async fn build_default_service(
    config: ServiceConfig,
    connector: Option<Arc<dyn ClientConnector>>,
) -> Result<Arc<UiService>> {
    let mut builder = UiService::builder(config);
    if let Some(connector) = connector {
        builder = builder.with_connector(connector);
    }
    let service = builder.start().await?;
    tracing::info!(
        "service ready at {} ({})",
        service.config().url_entry_path,
        service.config().run_mode
    );
    Ok(service)
}

/// Logging for a binary component. A failure to set it up is reported on
/// stderr and leaves the process without a subscriber.
pub fn init_logging(component: &str, to_stderr: bool) -> Option<impl Drop> {
    match lynkui_core::logging::init_logging(component, to_stderr) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("logging disabled: {}", e);
            None
        }
    }
}
