use std::net::{IpAddr, SocketAddr};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use eth_miniapp::{api, config, AppError, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Load configuration
    let config = config::Config::from_env()?;
    info!(
        env = ?config.app_env,
        provider = ?config.price.provider,
        "Configuration loaded"
    );

    // Build shared state and routes
    let state = AppState::from_config(&config)?;
    info!(
        freshness_window = ?state.price_cache.freshness_window(),
        fetch_timeout_secs = config.price.fetch_timeout.num_seconds(),
        "Price cache ready"
    );
    let app = api::router::create_router(state);

    let host: IpAddr = config
        .host
        .parse()
        .map_err(|_| AppError::ConfigError(format!("Invalid HOST: {}", config.host)))?;
    let addr = SocketAddr::new(host, config.port);
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
