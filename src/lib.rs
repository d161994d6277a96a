pub mod api; // REST API router, middleware and server
pub mod config;
pub mod core_state; // Shared state behind every handler
pub mod models;
pub mod db;
pub mod crypto;
pub mod error;
pub mod auth; // Staff login and sessions
pub mod doctor; // Doctor roster
pub mod appointment; // Booking and records
pub mod prescription; // Prescriptions issued per appointment
pub mod prescription_pdf; // A4 prescription rendering

use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber. `RUST_LOG` overrides the
/// default filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();
}

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    #[error(transparent)]
    State(#[from] core_state::CoreError),
    #[error(transparent)]
    Server(#[from] api::ServerError),
}

/// Load configuration, open the database and serve until Ctrl-C/SIGTERM.
pub async fn run() -> Result<(), StartupError> {
    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = config::Config::load()?;
    let (bind, port) = (config.bind, config.port);
    let core = Arc::new(core_state::CoreState::open(config)?);

    let mut server = api::start_api_server(core, bind, port).await?;
    tracing::info!(addr = %server.addr, "Listening");

    api::shutdown_signal().await;
    server.shutdown();
    server.wait().await?;

    tracing::info!("{} stopped", config::APP_NAME);
    Ok(())
}
