//! HTTP server lifecycle: bind → serve → graceful shutdown on Ctrl-C.

use std::future::Future;
use std::net::SocketAddr;

use tokio::net::TcpListener;

use crate::api::router::api_router;
use crate::api::types::ApiContext;

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve(addr: SocketAddr, ctx: ApiContext) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    serve_on(listener, ctx, shutdown_signal()).await
}

/// Serve on an already-bound listener until `shutdown` resolves.
pub async fn serve_on<F>(listener: TcpListener, ctx: ApiContext, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    let app = api_router(ctx);

    tracing::info!(%addr, "Policy risk API listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    tracing::info!("Policy risk API stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => tracing::error!("Failed to listen for shutdown signal: {e}"),
    }
}
