use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, Level};

use gavel_server::api;
use gavel_server::config::Config;
use gavel_server::repository::SqliteRepository;
use gavel_server::tracker::TrackerClient;
use gavel_server::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    info!("Starting gavel (version {})", gavel_server::service_version());

    let config = Config::from_env().context("Failed to load configuration")?;

    let db_path = config.state_dir.join("gavel-state.db");
    info!("Using state database: {}", db_path.display());
    let repository =
        SqliteRepository::new(&db_path).context("Failed to initialize SQLite database")?;

    let tracker = match (&config.tracker_base_url, &config.tracker_auth_token) {
        (Some(base_url), Some(token)) => {
            info!("Issue tracker sync enabled: {base_url}");
            Some(TrackerClient::new(base_url.clone(), token)?)
        }
        _ => {
            info!("Issue tracker sync disabled");
            None
        }
    };

    let state = Arc::new(AppState::new(Arc::new(repository), tracker));
    let app = api::router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    info!("Listening on {addr}");
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, app)
        .await
        .context("Server terminated")?;

    Ok(())
}
