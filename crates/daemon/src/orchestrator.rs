//! Daemon orchestrator for wiring together all components.
//!
//! This module provides the `DaemonOrchestrator` that builds the file access
//! engine from configuration, binds the HTTP listener and drives the server
//! through start and graceful shutdown.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::router::{build_router, AppState};

/// Daemon orchestrator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    /// Initial state, not started.
    Stopped,
    /// Binding the listener.
    Starting,
    /// Running and accepting connections.
    Running,
    /// Shutting down gracefully.
    ShuttingDown,
}

/// Events emitted by the orchestrator.
#[derive(Debug, Clone)]
pub enum OrchestratorEvent {
    /// Orchestrator state changed.
    StateChanged(OrchestratorState),
    /// The HTTP listener is bound.
    Listening { addr: SocketAddr },
    /// Error occurred.
    Error { message: String },
}

/// Daemon orchestrator that owns the HTTP server.
pub struct DaemonOrchestrator {
    /// Configuration.
    config: Config,
    /// Handles shared by every request.
    app_state: AppState,
    /// Current state.
    state: RwLock<OrchestratorState>,
    /// Bound listener address, once started.
    local_addr: RwLock<Option<SocketAddr>>,
    /// Running server task.
    server_task: RwLock<Option<JoinHandle<()>>>,
    /// Cancellation token for graceful shutdown.
    shutdown_token: RwLock<CancellationToken>,
    /// Event sender.
    event_tx: broadcast::Sender<OrchestratorEvent>,
}

impl DaemonOrchestrator {
    /// Creates a new daemon orchestrator.
    pub fn new(config: Config) -> Result<Self> {
        config.validate().context("Invalid configuration")?;

        let app_state = AppState::from_config(&config);
        info!(
            default_path = %config.file.default_path.display(),
            chunk_size = config.file.chunk_size,
            "File access engine ready"
        );

        let (event_tx, _) = broadcast::channel(256);

        Ok(Self {
            config,
            app_state,
            state: RwLock::new(OrchestratorState::Stopped),
            local_addr: RwLock::new(None),
            server_task: RwLock::new(None),
            shutdown_token: RwLock::new(CancellationToken::new()),
            event_tx,
        })
    }

    /// Returns the current state.
    pub async fn state(&self) -> OrchestratorState {
        *self.state.read().await
    }

    /// Returns the bound address while running.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.read().await
    }

    /// Returns a receiver for orchestrator events.
    pub fn subscribe(&self) -> broadcast::Receiver<OrchestratorEvent> {
        self.event_tx.subscribe()
    }

    /// Starts the HTTP server.
    pub async fn start(&self) -> Result<()> {
        {
            let mut state = self.state.write().await;
            if *state != OrchestratorState::Stopped {
                anyhow::bail!("Orchestrator is already running");
            }
            *state = OrchestratorState::Starting;
        }
        self.emit_event(OrchestratorEvent::StateChanged(OrchestratorState::Starting));

        info!("Starting daemon orchestrator...");

        let (listener, addr) = match self.bind().await {
            Ok(bound) => bound,
            Err(e) => {
                *self.state.write().await = OrchestratorState::Stopped;
                self.emit_event(OrchestratorEvent::Error {
                    message: format!("{e:#}"),
                });
                self.emit_event(OrchestratorEvent::StateChanged(OrchestratorState::Stopped));
                return Err(e);
            }
        };

        *self.local_addr.write().await = Some(addr);
        self.emit_event(OrchestratorEvent::Listening { addr });

        let token = CancellationToken::new();
        *self.shutdown_token.write().await = token.clone();

        let app = build_router(self.app_state.clone());
        let event_tx = self.event_tx.clone();
        let handle = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await;
            if let Err(e) = result {
                error!("HTTP server error: {}", e);
                let _ = event_tx.send(OrchestratorEvent::Error {
                    message: e.to_string(),
                });
            }
        });
        *self.server_task.write().await = Some(handle);

        {
            let mut state = self.state.write().await;
            *state = OrchestratorState::Running;
        }
        self.emit_event(OrchestratorEvent::StateChanged(OrchestratorState::Running));

        info!(addr = %addr, "Daemon orchestrator started successfully");
        Ok(())
    }

    async fn bind(&self) -> Result<(TcpListener, SocketAddr)> {
        let addr = self.config.server.socket_addr()?;
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind HTTP listener on {addr}"))?;
        let bound = listener
            .local_addr()
            .context("Failed to read listener address")?;
        Ok((listener, bound))
    }

    /// Stops the HTTP server gracefully.
    ///
    /// In-flight responses may finish within `shutdown_timeout_secs`.
    /// Connections still open after that are dropped.
    pub async fn stop(&self) -> Result<()> {
        {
            let mut state = self.state.write().await;
            if *state == OrchestratorState::Stopped {
                return Ok(());
            }
            if *state == OrchestratorState::ShuttingDown {
                anyhow::bail!("Orchestrator is already shutting down");
            }
            *state = OrchestratorState::ShuttingDown;
        }
        self.emit_event(OrchestratorEvent::StateChanged(
            OrchestratorState::ShuttingDown,
        ));

        info!("Stopping daemon orchestrator...");

        self.shutdown_token.read().await.cancel();

        let grace = Duration::from_secs(self.config.server.shutdown_timeout_secs);
        if let Some(mut handle) = self.server_task.write().await.take() {
            match tokio::time::timeout(grace, &mut handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("HTTP server task failed: {}", e),
                Err(_) => {
                    warn!(
                        timeout_secs = grace.as_secs(),
                        "Graceful shutdown timed out, dropping open connections"
                    );
                    handle.abort();
                    let _ = handle.await;
                }
            }
        }
        debug!("HTTP server task finished");

        *self.local_addr.write().await = None;
        {
            let mut state = self.state.write().await;
            *state = OrchestratorState::Stopped;
        }
        self.emit_event(OrchestratorEvent::StateChanged(OrchestratorState::Stopped));

        info!("Daemon orchestrator stopped");
        Ok(())
    }

    /// Emits an orchestrator event.
    fn emit_event(&self, event: OrchestratorEvent) {
        let _ = self.event_tx.send(event);
    }

    /// Returns a token that is cancelled when the server is asked to stop.
    pub async fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.read().await.clone()
    }
}
