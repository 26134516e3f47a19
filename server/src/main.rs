use tokio::signal::unix::{signal, SignalKind};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::fmt::format::FmtSpan;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_span_events(FmtSpan::CLOSE)
        .init();

    tracing::info!("starting gammonquiz server");

    let db_path = server::config::get_db_path();
    tracing::info!(db_path = %db_path.display(), "using sqlite database");

    let app = server::build_app(&db_path).await?;

    let bind_addr = server::config::get_bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "server listening");

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::select! {
        result = axum::serve(listener, app) => {
            if let Err(e) = result {
                tracing::error!("server error: {}", e);
            }
        }
        _ = sigterm.recv() => {
            tracing::info!("received SIGTERM, shutting down gracefully");
        }
        _ = sigint.recv() => {
            tracing::info!("received SIGINT, shutting down gracefully");
        }
    }

    tracing::info!("server shut down");
    Ok(())
}
