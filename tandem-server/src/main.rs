use anyhow::{Context, Result};
use tandem_server::cli::CliArgs;
use tandem_server::config::ServerConfig;
use tandem_server::{serve, AppState};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse_args();

    let filter = match &cli_args.log_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = ServerConfig::from_cli_and_env(cli_args)?;
    info!(
        reciprocal = ?config.policy.reciprocal,
        accepted_direction = ?config.policy.accepted_direction,
        "configuration loaded"
    );
    match &config.data_dir {
        Some(dir) => info!("opening database at {}", dir.display()),
        None => info!("no data dir configured, using a temporary database"),
    }

    let state = AppState::open(config.clone()).context("failed to open database")?;
    let listener = TcpListener::bind(config.bind_address())
        .await
        .with_context(|| format!("failed to bind {}", config.bind_address()))?;
    let store = state.store.clone();
    serve(listener, state, async {
        let _ = tokio::signal::ctrl_c().await;
        info!("shutting down");
    })
    .await?;
    store.flush().await?;
    Ok(())
}
