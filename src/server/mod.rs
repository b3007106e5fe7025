// Server module entry point
// Host transport for the router core: listener, accept loop and connections

pub mod connection;
mod handler;
pub mod listener;
pub mod signal;

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::error;

use crate::config::AppState;
use connection::accept_connection;

pub use listener::create_reusable_listener;

/// Accept connections until a shutdown signal arrives.
///
/// Must run inside a `LocalSet`; connections are served with `spawn_local`.
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> std::io::Result<()> {
    let active_connections = Arc::new(AtomicUsize::new(0));
    let shutdown = signal::shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &state, &active_connections);
                    }
                    Err(e) => error!("Failed to accept connection: {e}"),
                }
            }
            () = &mut shutdown => return Ok(()),
        }
    }
}
