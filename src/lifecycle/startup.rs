//! Startup orchestration.
//!
//! # Responsibilities
//! - Bind every listener before any traffic is served
//! - Build the shared sniffer and overload guard once
//! - Spawn the vhost server, TCP proxies and admin API
//!
//! # Design Decisions
//! - Fail fast: any bind error aborts startup before tasks are spawned
//! - TCP proxies share the vhost server's sniffer, so one rules update covers all listeners

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::admin::{setup_admin_router, AdminState};
use crate::config::EdgeConfig;
use crate::http::EdgeServer;
use crate::lifecycle::Shutdown;
use crate::net::{Listener, ListenerError};
use crate::overload::OverloadGuard;
use crate::sniff::Sniffer;
use crate::tcp::TcpForwarder;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("{name} listener: {source}")]
    Listener {
        name: String,
        #[source]
        source: ListenerError,
    },

    #[error("tcp proxy {name}: invalid backend {backend:?}")]
    Backend { name: String, backend: String },

    #[error("admin listener: {0}")]
    Admin(#[source] std::io::Error),
}

/// Handles to a started edge.
pub struct RunningEdge {
    pub http_addr: SocketAddr,
    pub admin_addr: Option<SocketAddr>,
    pub tcp_addrs: Vec<(String, SocketAddr)>,
    pub sniffer: Arc<Sniffer>,
    pub guard: Arc<OverloadGuard>,
    tasks: Vec<JoinHandle<()>>,
}

impl RunningEdge {
    /// Wait for every spawned task to stop.
    pub async fn wait(self) {
        for task in self.tasks {
            let _ = task.await;
        }
    }
}

/// Bind and spawn everything `config` describes.
pub async fn start(
    config: EdgeConfig,
    config_updates: mpsc::UnboundedReceiver<EdgeConfig>,
    shutdown: &Shutdown,
) -> Result<RunningEdge, StartupError> {
    let listener = Listener::bind(&config.listener.bind_address, config.listener.max_connections)
        .await
        .map_err(|source| StartupError::Listener { name: "vhost".into(), source })?;
    let http_addr = listener
        .local_addr()
        .map_err(|e| StartupError::Listener { name: "vhost".into(), source: ListenerError::Bind(e) })?;

    let mut tcp_listeners = Vec::new();
    for proxy in &config.tcp_proxies {
        let backend: SocketAddr = proxy.backend.parse().map_err(|_| StartupError::Backend {
            name: proxy.name.clone(),
            backend: proxy.backend.clone(),
        })?;
        let bound = Listener::bind(&proxy.bind_address, config.listener.max_connections)
            .await
            .map_err(|source| StartupError::Listener { name: proxy.name.clone(), source })?;
        tcp_listeners.push((proxy.clone(), backend, bound));
    }

    let admin_listener = if config.admin.enabled {
        Some(
            tokio::net::TcpListener::bind(&config.admin.bind_address)
                .await
                .map_err(StartupError::Admin)?,
        )
    } else {
        None
    };

    let server = EdgeServer::new(config.clone());
    let sniffer = server.sniffer();
    let guard = server.guard();
    let tracker = server.tracker();
    let mut tasks = Vec::new();
    let mut tcp_addrs = Vec::new();

    for (proxy, backend, bound) in tcp_listeners {
        if let Ok(addr) = bound.local_addr() {
            tcp_addrs.push((proxy.name.clone(), addr));
        }
        let forwarder = TcpForwarder::new(
            &proxy,
            backend,
            Duration::from_secs(config.timeouts.connect_secs),
            Arc::clone(&sniffer),
            tracker.clone(),
        );
        let rx = shutdown.subscribe();
        tasks.push(tokio::spawn(async move {
            let name = forwarder.name().to_string();
            if let Err(e) = forwarder.run(bound, rx).await {
                tracing::error!(proxy = %name, error = %e, "TCP proxy stopped");
            }
        }));
    }

    let admin_addr = match admin_listener {
        Some(admin_listener) => {
            let addr = admin_listener.local_addr().map_err(StartupError::Admin)?;
            let app = setup_admin_router(AdminState {
                sniffer: Arc::clone(&sniffer),
                guard: Arc::clone(&guard),
                tracker: tracker.clone(),
                api_key: Arc::from(config.admin.api_key.as_str()),
            });
            let mut rx = shutdown.subscribe();
            tasks.push(tokio::spawn(async move {
                tracing::info!(address = %addr, "Admin API listening");
                let served = axum::serve(admin_listener, app)
                    .with_graceful_shutdown(async move {
                        let _ = rx.recv().await;
                    })
                    .await;
                if let Err(e) = served {
                    tracing::error!(error = %e, "Admin API stopped");
                }
            }));
            Some(addr)
        }
        None => None,
    };

    let rx = shutdown.subscribe();
    tasks.push(tokio::spawn(async move {
        if let Err(e) = server.run(listener, config_updates, rx).await {
            tracing::error!(error = %e, "Edge server stopped");
        }
    }));

    Ok(RunningEdge {
        http_addr,
        admin_addr,
        tcp_addrs,
        sniffer,
        guard,
        tasks,
    })
}
