// Main entry point - Dependency injection and a headless page run
use std::sync::Arc;
use std::time::Duration;

use forecast_dashboard::application::dashboard_service::DashboardService;
use forecast_dashboard::infrastructure::config::load_dashboard_config;
use forecast_dashboard::infrastructure::http_gateway::{HttpBackend, SqlColumnOptions};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = load_dashboard_config()?;

    // Adapters (infrastructure layer)
    let backend = Arc::new(HttpBackend::new(
        &config.api.base_url,
        Duration::from_secs(config.api.timeout_secs),
    )?);
    let options = Arc::new(SqlColumnOptions::new(
        backend.clone(),
        config.options.table.clone(),
        config.options.limit,
    ));

    // Use cases (application layer)
    let service = DashboardService::new(backend.clone(), backend, options, config.grid.spec());

    tracing::info!("Opening page {} against {}", config.page.name, config.api.base_url);
    let page = service.open_page(&config.page.name, &config.page.filters).await?;

    for slot in page.filters().slots() {
        tracing::info!(
            "Filter {}: value={:?}, {} options",
            slot.label(),
            slot.value,
            slot.options.len()
        );
    }

    let missing = page.filters().missing();
    if !missing.is_empty() {
        tracing::warn!("Widgets not run, filters without a value: {}", missing.join(", "));
    }

    let mut failed = 0;
    for widget in page.widgets() {
        let Some(state) = page.runtime_state(&widget.id).await else {
            tracing::info!("{} [{}] {}: not run", widget.id, widget.kind.name(), widget.bounds);
            continue;
        };
        match &state.error {
            Some(e) => {
                failed += 1;
                tracing::warn!("{} [{}] {}: {}", widget.id, widget.kind.name(), widget.bounds, e);
            }
            None => tracing::info!(
                "{} [{}] {}: {} rows, columns {:?}",
                widget.id,
                widget.kind.name(),
                widget.bounds,
                state.rows.len(),
                state.columns
            ),
        }
    }

    tracing::info!("Page run finished: {} of {} widgets failed", failed, page.widgets().len());

    Ok(())
}
