//! HTTP surface: client event ingestion, dashboard reads, liveness and
//! Prometheus exposition.

pub mod responses;
pub mod routes;

use std::net::{IpAddr, SocketAddr};

use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub use routes::{routes, HttpState};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind_address: IpAddr,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::from([0, 0, 0, 0]),
            port: 8080,
        }
    }
}

/// Serve until cancelled; fails only when the address cannot be bound
pub async fn serve(config: HttpConfig, state: HttpState, cancel: CancellationToken) -> Result<(), warp::Error> {
    let address = SocketAddr::new(config.bind_address, config.port);
    let (bound, server) = warp::serve(routes(state)).try_bind_with_graceful_shutdown(address, async move {
        cancel.cancelled().await;
    })?;

    info!("🌐 HTTP server listening on {}", bound);
    server.await;
    info!("🛑 HTTP server stopped");
    Ok(())
}
