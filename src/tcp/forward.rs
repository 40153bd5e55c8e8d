//! One TCP forwarding listener.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::broadcast;

use crate::config::TcpProxyConfig;
use crate::net::{ConnectionPermit, ConnectionTracker, Listener, ListenerError};
use crate::observability::metrics;
use crate::sniff::Sniffer;

/// Forwards accepted connections to a fixed backend after sniffing them.
#[derive(Debug, Clone)]
pub struct TcpForwarder {
    name: Arc<str>,
    backend: SocketAddr,
    reject_http: bool,
    connect_timeout: Duration,
    sniffer: Arc<Sniffer>,
    tracker: ConnectionTracker,
}

impl TcpForwarder {
    pub fn new(
        config: &TcpProxyConfig,
        backend: SocketAddr,
        connect_timeout: Duration,
        sniffer: Arc<Sniffer>,
        tracker: ConnectionTracker,
    ) -> Self {
        Self {
            name: Arc::from(config.name.as_str()),
            backend,
            reject_http: config.reject_http,
            connect_timeout,
            sniffer,
            tracker,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Accept until shutdown is signalled.
    pub async fn run(
        self,
        listener: Listener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ListenerError> {
        tracing::info!(
            proxy = %self.name,
            address = ?listener.local_addr().ok(),
            backend = %self.backend,
            reject_http = self.reject_http,
            "TCP proxy starting"
        );

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer, permit)) => {
                            tokio::spawn(self.clone().handle(stream, peer, permit));
                        }
                        Err(ListenerError::Accept(e)) => {
                            tracing::warn!(proxy = %self.name, error = %e, "Accept failed");
                        }
                        Err(e) => return Err(e),
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!(proxy = %self.name, "TCP proxy stopping");
                    return Ok(());
                }
            }
        }
    }

    async fn handle(self, stream: TcpStream, peer: SocketAddr, _permit: ConnectionPermit) {
        let guard = self.tracker.track();
        metrics::record_connection("tcp");

        let (verdict, mut conn) = self.sniffer.classify(stream).await;
        if self.reject_http && verdict.is_http_like {
            tracing::warn!(
                proxy = %self.name,
                connection_id = %guard.id(),
                peer = %peer,
                detector = verdict.detection.map_or("none", |d| d.detector()),
                "Rejecting HTTP-like traffic on TCP proxy"
            );
            let _ = conn.shutdown().await;
            return;
        }

        let mut upstream = match tokio::time::timeout(self.connect_timeout, TcpStream::connect(self.backend)).await {
            Ok(Ok(upstream)) => upstream,
            Ok(Err(e)) => {
                tracing::warn!(proxy = %self.name, backend = %self.backend, error = %e, "Backend connect failed");
                return;
            }
            Err(_) => {
                tracing::warn!(proxy = %self.name, backend = %self.backend, "Backend connect timed out");
                return;
            }
        };

        match tokio::io::copy_bidirectional(&mut conn, &mut upstream).await {
            Ok((to_backend, to_client)) => tracing::debug!(
                proxy = %self.name,
                connection_id = %guard.id(),
                to_backend,
                to_client,
                "TCP session finished"
            ),
            Err(e) => tracing::debug!(proxy = %self.name, connection_id = %guard.id(), error = %e, "TCP session aborted"),
        }
    }
}
