//! Vhost edge server.
//!
//! # Responsibilities
//! - Accept connections with backpressure
//! - Sniff each connection before committing to HTTP
//! - Serve HTTP/1.1 and HTTP/2 over the replayed stream
//! - Apply hot-reloaded rules, threshold and routes
//! - Stop accepting and drain connections on shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::{body::Body, extract::ConnectInfo, http::Request, Router};
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::{TokioExecutor, TokioIo},
    server::conn::auto,
};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceExt;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::EdgeConfig;
use crate::http::proxy::vhost_handler;
use crate::net::{ConnectionPermit, ConnectionTracker, Listener, ListenerError};
use crate::observability::metrics;
use crate::overload::OverloadGuard;
use crate::routing::VhostRouter;
use crate::sniff::Sniffer;

/// How long in-flight requests get to finish after shutdown is signalled.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct EdgeState {
    pub routes: Arc<ArcSwap<VhostRouter>>,
    pub guard: Arc<OverloadGuard>,
    pub client: Client<HttpConnector, Body>,
}

/// The vhost HTTP edge.
pub struct EdgeServer {
    app: Router,
    sniffer: Arc<Sniffer>,
    guard: Arc<OverloadGuard>,
    routes: Arc<ArcSwap<VhostRouter>>,
    tracker: ConnectionTracker,
}

impl EdgeServer {
    /// Build the server. Starts the overload reset schedule, so this must
    /// run inside a Tokio runtime.
    pub fn new(config: EdgeConfig) -> Self {
        let sniffer = Arc::new(Sniffer::new(&config.sniffer));
        let guard = Arc::new(OverloadGuard::new(&config.overload));
        let routes = Arc::new(ArcSwap::from_pointee(VhostRouter::from_config(&config.routes)));

        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(config.timeouts.connect_secs)));
        let client = Client::builder(TokioExecutor::new()).build(connector);

        let state = EdgeState {
            routes: Arc::clone(&routes),
            guard: Arc::clone(&guard),
            client,
        };

        Self {
            app: Self::build_router(&config, state),
            sniffer,
            guard,
            routes,
            tracker: ConnectionTracker::new(),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &EdgeConfig, state: EdgeState) -> Router {
        Router::new()
            .fallback(vhost_handler)
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(TraceLayer::new_for_http())
    }

    pub fn app(&self) -> Router {
        self.app.clone()
    }

    pub fn sniffer(&self) -> Arc<Sniffer> {
        Arc::clone(&self.sniffer)
    }

    pub fn guard(&self) -> Arc<OverloadGuard> {
        Arc::clone(&self.guard)
    }

    pub fn tracker(&self) -> ConnectionTracker {
        self.tracker.clone()
    }

    /// Run the accept loop until shutdown is signalled.
    pub async fn run(
        self,
        listener: Listener,
        mut config_updates: mpsc::UnboundedReceiver<EdgeConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ListenerError> {
        tracing::info!(address = ?listener.local_addr().ok(), "Edge server starting");

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, peer, permit) = match accepted {
                        Ok(accepted) => accepted,
                        Err(ListenerError::Accept(e)) => {
                            tracing::warn!(error = %e, "Accept failed");
                            continue;
                        }
                        Err(e) => return Err(e),
                    };
                    tokio::spawn(serve_connection(
                        stream,
                        peer,
                        permit,
                        Arc::clone(&self.sniffer),
                        self.app.clone(),
                        self.tracker.clone(),
                        shutdown.resubscribe(),
                    ));
                }
                Some(update) = config_updates.recv() => self.apply(update),
                _ = shutdown.recv() => {
                    tracing::info!("Edge server received shutdown signal, no longer accepting");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Apply a reloaded configuration. Listener settings need a restart.
    fn apply(&self, config: EdgeConfig) {
        self.sniffer.update_rules(config.sniffer.rules);
        if config.overload.max_service_unavailable_count != self.guard.threshold() {
            self.guard.set_threshold(config.overload.max_service_unavailable_count);
        }
        let router = VhostRouter::from_config(&config.routes);
        tracing::info!(routes = router.len(), "Configuration reloaded");
        self.routes.store(Arc::new(router));
    }
}

async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    _permit: ConnectionPermit,
    sniffer: Arc<Sniffer>,
    app: Router,
    tracker: ConnectionTracker,
    mut shutdown: broadcast::Receiver<()>,
) {
    let guard = tracker.track();
    metrics::record_connection("vhost");

    let (verdict, conn) = sniffer.classify(stream).await;
    if !verdict.is_http_like {
        tracing::debug!(connection_id = %guard.id(), peer = %peer, "Closing non-HTTP connection");
        return;
    }
    if verdict.is_tls() {
        tracing::debug!(connection_id = %guard.id(), peer = %peer, "TLS is not terminated on the vhost listener, closing");
        return;
    }

    let service = hyper::service::service_fn(move |mut request: Request<Incoming>| {
        request.extensions_mut().insert(ConnectInfo(peer));
        app.clone().oneshot(request)
    });

    let builder = auto::Builder::new(TokioExecutor::new());
    let connection = builder.serve_connection_with_upgrades(TokioIo::new(conn), service);
    tokio::pin!(connection);

    tokio::select! {
        result = connection.as_mut() => {
            if let Err(e) = result {
                tracing::debug!(connection_id = %guard.id(), error = %e, "Connection error");
            }
        }
        _ = shutdown.recv() => {
            connection.as_mut().graceful_shutdown();
            let _ = tokio::time::timeout(DRAIN_TIMEOUT, connection).await;
        }
    }
}
