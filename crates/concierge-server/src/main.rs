use concierge_server::{build_app, AppState};
use concierge_types::{config::ConciergeConfig, ConciergeError, Result};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // .env is optional
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run().await {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let config = ConciergeConfig::from_env()?;
    let addr = config.server.listen_addr.clone();
    let app = build_app(AppState::from_config(&config));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ConciergeError::Config(format!("cannot listen on {}: {}", addr, e)))?;
    log::info!("POS concierge listening on http://{}", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| ConciergeError::Other(e.to_string()))
}
