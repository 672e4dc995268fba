use std::io;
use std::net::Ipv6Addr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use backend_application::queries::event_queries;
use backend_application::{AppError, AppState};
use backend_domain::ports::TicketStore;
use backend_domain::{RuntimeConfig, ServerPhase};
use backend_infrastructure::resolve_lan_address;
use backend_interfaces_http::build_router;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("scan server is already running")]
    AlreadyRunning,
    #[error("failed to bind scan server socket: {0}")]
    Bind(#[source] io::Error),
    #[error(transparent)]
    App(#[from] AppError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopReason {
    Manual,
    Idle,
}

impl StopReason {
    fn as_str(self) -> &'static str {
        match self {
            StopReason::Manual => "manual",
            StopReason::Idle => "idle",
        }
    }
}

struct RunningServer {
    generation: u64,
    base_url: String,
    stop_tx: oneshot::Sender<()>,
    supervisor: JoinHandle<()>,
}

struct ServerInner {
    store: Arc<dyn TicketStore>,
    config: RuntimeConfig,
    phase: watch::Sender<ServerPhase>,
    running: Mutex<Option<RunningServer>>,
    generation: AtomicU64,
}

/// The local scan server for one event at a time.
///
/// `start` binds the socket and serves the scanner and admin surface until
/// `stop` is called or the idle timer fires. Cloning shares the same server.
#[derive(Clone)]
pub struct ScanServer {
    inner: Arc<ServerInner>,
}

impl ScanServer {
    pub fn new(store: Arc<dyn TicketStore>, config: RuntimeConfig) -> Self {
        let (phase, _rx) = watch::channel(ServerPhase::Stopped);
        Self {
            inner: Arc::new(ServerInner {
                store,
                config,
                phase,
                running: Mutex::new(None),
                generation: AtomicU64::new(0),
            }),
        }
    }

    pub fn phase(&self) -> ServerPhase {
        *self.inner.phase.borrow()
    }

    pub async fn wait_for_phase(&self, target: ServerPhase) {
        let mut rx = self.inner.phase.subscribe();
        while *rx.borrow_and_update() != target {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Base URL scanners should open, while running.
    pub async fn base_url(&self) -> Option<String> {
        self.inner
            .running
            .lock()
            .await
            .as_ref()
            .map(|server| server.base_url.clone())
    }

    /// Starts serving `event_id` and returns the base URL.
    pub async fn start(&self, event_id: &str) -> Result<String, ServerError> {
        let mut running = self.inner.running.lock().await;
        if running.is_some() || self.phase() != ServerPhase::Stopped {
            return Err(ServerError::AlreadyRunning);
        }
        self.inner.phase.send_replace(ServerPhase::Starting);

        match self.launch(event_id).await {
            Ok(server) => {
                let base_url = server.base_url.clone();
                *running = Some(server);
                self.inner.phase.send_replace(ServerPhase::Running);
                Ok(base_url)
            }
            Err(err) => {
                warn!("scan server failed to start for event {}: {}", event_id, err);
                self.inner.phase.send_replace(ServerPhase::Stopped);
                Err(err)
            }
        }
    }

    /// Stops the server and drops every session. A no-op when already stopped.
    pub async fn stop(&self) {
        let server = self.inner.running.lock().await.take();
        let Some(server) = server else {
            return;
        };
        let _ = server.stop_tx.send(());
        if let Err(err) = server.supervisor.await {
            warn!("scan server supervisor ended abnormally: {}", err);
        }
        self.inner.phase.send_replace(ServerPhase::Stopped);
    }

    async fn launch(&self, event_id: &str) -> Result<RunningServer, ServerError> {
        let config = &self.inner.config;
        let event = event_queries::scannable_event(self.inner.store.clone(), event_id).await?;

        let listener = TcpListener::bind((config.bind_host.as_str(), config.port))
            .await
            .map_err(ServerError::Bind)?;
        let local_addr = listener.local_addr().map_err(ServerError::Bind)?;
        let host = config
            .public_host
            .clone()
            .or_else(|| resolve_lan_address().map(|ip| ip.to_string()))
            .unwrap_or_else(|| "127.0.0.1".to_string());
        let base_url = base_url(&host, local_addr.port());

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let state = AppState::new(config.clone(), event, self.inner.store.clone(), shutdown_rx.clone());
        let app = build_router_with_layers(state.clone());

        let mut shutdown = shutdown_rx;
        let serve = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    while !*shutdown.borrow_and_update() {
                        if shutdown.changed().await.is_err() {
                            break;
                        }
                    }
                })
                .await
        });

        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let (stop_tx, stop_rx) = oneshot::channel();
        let supervisor = tokio::spawn(supervise(
            self.inner.clone(),
            generation,
            state,
            shutdown_tx,
            serve,
            stop_rx,
        ));

        info!(
            "scan server for event {} listening on {} ({})",
            event_id, local_addr, base_url
        );
        Ok(RunningServer {
            generation,
            base_url,
            stop_tx,
            supervisor,
        })
    }
}

async fn supervise(
    inner: Arc<ServerInner>,
    generation: u64,
    state: AppState,
    shutdown_tx: watch::Sender<bool>,
    mut serve: JoinHandle<io::Result<()>>,
    stop_rx: oneshot::Receiver<()>,
) {
    let reason = tokio::select! {
        _ = stop_rx => StopReason::Manual,
        expired = state.idle_timer.expired() => {
            if expired { StopReason::Idle } else { StopReason::Manual }
        }
    };

    inner.phase.send_replace(ServerPhase::Stopping);
    state.idle_timer.cancel();
    let _ = shutdown_tx.send(true);

    match tokio::time::timeout(SHUTDOWN_GRACE, &mut serve).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(err))) => warn!("scan server exited with error: {}", err),
        Ok(Err(err)) => warn!("scan server task failed: {}", err),
        Err(_) => {
            warn!("scan server did not drain within {:?}, aborting", SHUTDOWN_GRACE);
            serve.abort();
        }
    }
    state.clear_sessions().await;

    if reason == StopReason::Idle {
        let mut running = inner.running.lock().await;
        if running.as_ref().map(|server| server.generation) == Some(generation) {
            running.take();
        }
    }
    info!(
        "scan server for event {} stopped ({})",
        state.event.event_id,
        reason.as_str()
    );
    inner.phase.send_replace(ServerPhase::Stopped);
}

fn base_url(host: &str, port: u16) -> String {
    if host.parse::<Ipv6Addr>().is_ok() {
        format!("http://[{}]:{}", host, port)
    } else {
        format!("http://{}:{}", host, port)
    }
}

fn build_router_with_layers(state: AppState) -> Router {
    build_router(state.clone())
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(
            usize::try_from(state.config.max_body_bytes).unwrap_or(usize::MAX),
        ))
        .layer(TimeoutLayer::new(Duration::from_secs(
            state.config.request_timeout_seconds,
        )))
        .layer(TraceLayer::new_for_http())
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("sigterm handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
