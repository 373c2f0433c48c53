// src/reload/server.rs

//! TCP notifier for development servers.
//!
//! Each connected client receives every [`ReloadEvent`] as one line of JSON:
//!
//! ```text
//! {"class":"styles","kind":"style","mode":"inject","paths":["css/main.css"]}
//! ```

use std::net::SocketAddr;

use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::errors::{BuildError, Result};
use crate::reload::ReloadBus;

/// Bind `addr` and forward bus events to every client that connects.
///
/// Returns the bound address (useful with port `0`) and the accept loop's
/// handle.
pub async fn spawn_reload_server(
    addr: SocketAddr,
    bus: ReloadBus,
) -> Result<(SocketAddr, JoinHandle<()>)> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| BuildError::Other(anyhow::anyhow!("binding reload notifier on {addr}: {e}")))?;
    let local = listener
        .local_addr()
        .map_err(|e| BuildError::Other(anyhow::anyhow!("reading reload notifier address: {e}")))?;

    info!(addr = %local, "reload notifier listening");

    let handle = tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    debug!(%peer, "reload client connected");
                    let rx = bus.subscribe();
                    tokio::spawn(serve_client(stream, peer, rx));
                }
                Err(err) => {
                    warn!(error = %err, "reload notifier accept failed");
                }
            }
        }
    });

    Ok((local, handle))
}

async fn serve_client(
    mut stream: TcpStream,
    peer: SocketAddr,
    mut rx: broadcast::Receiver<crate::reload::ReloadEvent>,
) {
    loop {
        let event = match rx.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!(%peer, skipped, "reload client lagged");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };

        let mut line = match serde_json::to_string(&event) {
            Ok(line) => line,
            Err(err) => {
                warn!(error = %err, "could not encode reload event");
                continue;
            }
        };
        line.push('\n');

        if let Err(err) = stream.write_all(line.as_bytes()).await {
            debug!(%peer, error = %err, "reload client went away");
            break;
        }
    }
}
