use anyhow::{Context, Result};
use pdf_regions_api::{app, AppState, ServerConfig};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "pdf_regions=info,pdf_regions_api=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;
    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .with_context(|| format!("Failed to create {}", config.upload_dir.display()))?;

    let addr = config.addr;
    info!(
        "Serving exports from {} (upload limit {} MB, bounds {})",
        config.upload_dir.display(),
        config.max_upload_mb,
        config.bounds
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("pdf-regions API listening on http://{}", addr);

    axum::serve(listener, app(AppState::new(config))).await?;
    Ok(())
}
