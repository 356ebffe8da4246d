//! HTTP server implementation.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::service::HashService;
use crate::shutdown::{drain, wait_for_stop};
use crate::worker::DEFAULT_HASH_DELAY;

use super::routes::routes;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Delay before a submitted secret's digest is published.
    pub hash_delay: Duration,
    /// How long open connections get to finish once shutdown starts.
    pub shutdown_grace: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            hash_delay: DEFAULT_HASH_DELAY,
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("Failed to bind listener: {0}")]
    Bind(#[from] std::io::Error),
    #[error("Listener failed to close: {0}")]
    ListenerClose(String),
    #[error("Listener did not close within {0:?}")]
    ShutdownTimeout(Duration),
}

/// Bind `host:port` and serve until shutdown has fully drained.
pub async fn serve(config: ServerConfig, service: Arc<HashService>) -> Result<(), ServeError> {
    let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
    serve_with_listener(listener, config, service).await
}

/// Serve on an already bound listener.
///
/// Returns only after the coordinator reaches `Stopped`, i.e. after every
/// accepted submission has been published. A listener that fails to close
/// cleanly within `shutdown_grace` is aborted and reported as an error, but
/// only once the drain has completed. Stalled requests never extend the drain.
pub async fn serve_with_listener(
    listener: TcpListener,
    config: ServerConfig,
    service: Arc<HashService>,
) -> Result<(), ServeError> {
    let actual_addr = listener.local_addr()?;
    let app = routes(Arc::clone(&service));
    let coordinator = Arc::clone(service.coordinator());

    info!("Starting hashomatic server on {}", actual_addr);

    let stop = {
        let coordinator = Arc::clone(&coordinator);
        async move { wait_for_stop(&coordinator).await }
    };
    let mut server = tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(stop)
        .await
    });

    let outcome = tokio::select! {
        early = &mut server => {
            // Winning the transition here means nobody asked the listener to stop.
            let unprompted = coordinator.request_shutdown();
            match early {
                Ok(Ok(())) if !unprompted => Ok(()),
                Ok(Ok(())) => Err(ServeError::ListenerClose(
                    "listener exited before shutdown was requested".to_string(),
                )),
                Ok(Err(e)) => Err(ServeError::ListenerClose(e.to_string())),
                Err(e) => Err(ServeError::ListenerClose(e.to_string())),
            }
        }
        _ = coordinator.stopping() => {
            info!(grace = ?config.shutdown_grace, "Stopping server...");
            // Open connections and in-flight handlers share the grace window.
            let requests = service.requests();
            let closed = tokio::time::timeout(config.shutdown_grace, async {
                let closed = (&mut server).await;
                requests.drained().await;
                closed
            })
            .await;
            match closed {
                Ok(Ok(Ok(()))) => Ok(()),
                Ok(Ok(Err(e))) => Err(ServeError::ListenerClose(e.to_string())),
                Ok(Err(e)) => Err(ServeError::ListenerClose(e.to_string())),
                Err(_) => {
                    warn!("Open connections did not finish in time, closing listener");
                    server.abort();
                    Err(ServeError::ShutdownTimeout(config.shutdown_grace))
                }
            }
        }
    };

    match &outcome {
        Ok(()) => info!("Server shutdown complete"),
        Err(e) => error!(error = %e, "Error while shutting down listener"),
    }

    // Accepted work always completes, even when the listener misbehaved.
    drain(&coordinator, service.barrier()).await;

    outcome
}
