//! Server lifecycle management
//!
//! Owns the registration store, the health monitor and the HTTP server, and
//! tears them down in order on shutdown: stop accepting requests, drain, then
//! stop the monitor.

use anyhow::{Context, Result};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

use registrar_api::create_router;
use registrar_core::Config;
use registrar_registry::{HealthMonitor, HttpHealthProbe, RegistryService, ServiceStore};

/// Service registry server - the store, its health monitor and the HTTP API
pub struct RegistryServer {
    config: Config,
    registry: RegistryService,
    monitor: Arc<HealthMonitor>,
}

impl RegistryServer {
    pub fn new(config: Config) -> Result<Self> {
        let probe = Arc::new(
            HttpHealthProbe::new(config.health.timeout()).context("Failed to build health probe")?,
        );
        let store = Arc::new(ServiceStore::new());

        let registry = RegistryService::new(
            store.clone(),
            probe.clone(),
            config.health.default_health_path.clone(),
        );
        let monitor = Arc::new(HealthMonitor::new(
            store,
            probe,
            config.health.interval(),
            config.health.failure_threshold,
        ));

        Ok(Self {
            config,
            registry,
            monitor,
        })
    }

    #[must_use]
    pub const fn registry(&self) -> &RegistryService {
        &self.registry
    }

    /// Bind the configured HTTP address
    pub async fn bind(&self) -> Result<TcpListener> {
        let http_addr = self.config.http_address();
        TcpListener::bind(&http_addr)
            .await
            .with_context(|| format!("Failed to bind HTTP address {http_addr}"))
    }

    /// Serve until Ctrl+C or SIGTERM
    pub async fn start(self) -> Result<()> {
        let listener = self.bind().await?;
        self.run(listener, shutdown_signal()).await
    }

    /// Serve on `listener` until `shutdown` completes
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let monitor_handle = self.monitor.start();

        let addr = listener.local_addr().context("Listener has no local address")?;
        info!("HTTP server listening on {}", addr);

        let app = create_router(self.registry.clone());
        let served = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await;

        if let Err(e) = &served {
            error!("HTTP server error: {}", e);
        }
        info!("HTTP server shut down gracefully");

        self.monitor.shutdown();
        if let Err(e) = monitor_handle.await {
            error!("Health monitor task failed: {}", e);
        }
        info!("Health monitor stopped");

        served.context("HTTP server failed")
    }
}

/// Wait for Ctrl+C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C signal");
            }
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
                info!("Received SIGTERM signal");
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
