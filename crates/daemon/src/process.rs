use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::http_server;
use crate::state::{State, StateSetupError};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("state setup failed: {0}")]
    State(#[from] StateSetupError),
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("http server failed: {0}")]
    Serve(#[source] std::io::Error),
    #[error("http server task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// A running service.
#[derive(Debug)]
pub struct ShutdownHandle {
    local_addr: SocketAddr,
    state: State,
    server: JoinHandle<Result<(), ServiceError>>,
}

impl ShutdownHandle {
    /// Address the HTTP server actually bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    /// Stop accepting requests and cancel every upload in flight.
    pub fn shutdown(&self) {
        tracing::info!(active_uploads = self.state.registry().len(), "shutting down");
        self.state.shutdown_token().cancel();
        self.state.registry().cancel_all();
    }

    /// Wait for the server to finish.
    pub async fn wait(self) -> Result<(), ServiceError> {
        self.server.await?
    }
}

/// Bind the listener and start serving in the background.
pub async fn start_service(config: &Config) -> Result<ShutdownHandle, ServiceError> {
    let state = State::from_config(config)?;
    start_with_state(config, state).await
}

/// Like [`start_service`], around an already built state.
pub async fn start_with_state(
    config: &Config,
    state: State,
) -> Result<ShutdownHandle, ServiceError> {
    let listener = TcpListener::bind(config.listen_addr)
        .await
        .map_err(|source| ServiceError::Bind {
            addr: config.listen_addr,
            source,
        })?;
    let local_addr = listener
        .local_addr()
        .map_err(|source| ServiceError::Bind {
            addr: config.listen_addr,
            source,
        })?;
    tracing::info!("http server listening on {}", local_addr);

    let router = http_server::router(state.clone());
    let shutdown = state.shutdown_token().clone();
    let server = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
            .map_err(ServiceError::Serve)
    });

    Ok(ShutdownHandle {
        local_addr,
        state,
        server,
    })
}

/// Run the service until Ctrl-C or SIGTERM.
pub async fn spawn_service(config: &Config) -> Result<(), ServiceError> {
    let _guard = init_tracing(config.log_level);

    let handle = start_service(config).await?;

    tokio::select! {
        _ = shutdown_signal() => {}
        _ = handle.state().shutdown_token().cancelled() => {}
    }
    handle.shutdown();
    handle.wait().await?;

    tracing::info!("service stopped");
    Ok(())
}

/// Install the global subscriber. `RUST_LOG` wins over `level`.
///
/// The returned guard flushes buffered log lines when dropped.
pub fn init_tracing(level: tracing::Level) -> WorkerGuard {
    let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    // Fails only if a subscriber is already installed, e.g. by an embedder
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .try_init();
    guard
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("failed to install SIGTERM handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_start_and_shutdown() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = Config::in_memory(vec![dir.path().to_path_buf()]);

        let handle = start_service(&config).await.unwrap();
        assert_ne!(handle.local_addr().port(), 0);

        let token = handle.state().shutdown_token().clone();
        handle.shutdown();
        assert!(token.is_cancelled());
        handle.wait().await.unwrap();
    }
}
