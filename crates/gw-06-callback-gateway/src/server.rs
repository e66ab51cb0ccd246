//! Gateway server bootstrap.

use std::net::SocketAddr;

use crate::router::{build_router, GatewayState};

/// Bind `addr` and serve the callback router until the task is aborted.
pub async fn serve(addr: SocketAddr, state: GatewayState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("[gw-06] 🌐 Callback gateway listening on {}", addr);
    axum::serve(listener, build_router(state)).await
}
