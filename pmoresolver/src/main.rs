use pmoconfig::Config;
use pmoresolver::{ResolverContext, api, logging};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Répertoire de configuration optionnel en premier argument
    let config_dir = std::env::args().nth(1).unwrap_or_default();
    let config = Config::load_config(&config_dir)?;
    logging::init_logging(&config)?;

    info!("🎵 Starting PMOResolver...");
    let context = Arc::new(ResolverContext::bootstrap(config).await?);
    let _notifications = logging::forward_notifications(context.registry().notifier());

    let port = context.config.get_http_port()?;
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;

    info!("🌐 PMOResolver listening on http://{}", addr);
    info!("Press Ctrl+C to stop...");
    axum::serve(listener, api::router(context))
        .with_graceful_shutdown(async {
            let _ = signal::ctrl_c().await;
            info!("Ctrl+C reçu, arrêt gracieux");
        })
        .await?;

    Ok(())
}
