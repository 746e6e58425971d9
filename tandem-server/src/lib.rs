//! Friend graph and partner recommendations for a language exchange app.

pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod queries;
pub mod recommend;
pub mod requests;
pub mod state;
pub mod store;
pub mod users;

pub use api::create_router;
pub use auth::Viewer;
pub use state::AppState;

use std::future::Future;

use tokio::net::TcpListener;
use tracing::info;

/// Serves the API on an already bound listener until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
