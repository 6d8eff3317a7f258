//! HTTP server setup and lifecycle.
//!
//! # Responsibilities
//! - Collect routes before the server starts
//! - Wire up middleware (panic recovery, request ID, tracing, timeout)
//! - Bind the listener and run the accept loop
//! - Drain connections on shutdown, abort them when the deadline passes
//!
//! # Design Decisions
//! - Every connection runs in its own task inside a `JoinSet`, so a forced
//!   close can abort all of them at once
//! - Graceful drain uses hyper-util's `GracefulShutdown`
//! - `run` and `shutdown` talk through a watch channel; neither holds a lock
//!   across an await

use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use axum::routing::MethodFilter;
use axum::Router;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use hyper_util::server::graceful::GracefulShutdown;
use hyper_util::service::TowerToHyperService;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::config::HttpSettings;
use crate::http::handler::{method_router, HandlerResult};
use crate::http::request::{request_span, MakeRequestUuid, X_REQUEST_ID};
use crate::http::Context;
use crate::lifecycle::shutdown::{self, ShutdownError};
use crate::lifecycle::Server;
use crate::observability::Logger;

/// Instruction from `shutdown` to the running accept loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Serve,
    Drain,
    Close,
}

/// Handle kept while the server runs.
struct Control {
    commands: watch::Sender<Command>,
    finished: watch::Receiver<bool>,
}

enum State {
    /// Accepting routes, not yet started.
    Idle(Router),
    Running(Control),
    Stopped,
}

/// HTTP server built on axum.
pub struct HttpServer {
    host: String,
    port: u16,
    request_timeout: Duration,
    log: Logger,
    state: Mutex<State>,
    local_addr: Mutex<Option<SocketAddr>>,
}

impl HttpServer {
    pub fn new(host: impl Into<String>, port: u16, log: Logger) -> Self {
        Self {
            host: host.into(),
            port,
            request_timeout: Duration::from_secs(30),
            log,
            state: Mutex::new(State::Idle(Router::new())),
            local_addr: Mutex::new(None),
        }
    }

    pub fn from_settings(settings: &HttpSettings, log: Logger) -> Self {
        Self::new(settings.host.clone(), settings.port(), log)
            .with_request_timeout(settings.request_timeout())
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Add a route. Returns `false` (and logs) once the server has started.
    ///
    /// # Panics
    /// Like [`axum::Router::route`], on an invalid path or a method already
    /// registered for the same path.
    pub fn route<H, Fut>(&self, method: MethodFilter, path: &str, handler: H) -> bool
    where
        H: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let mut state = self.lock_state();
        let State::Idle(router) = &mut *state else {
            tracing::warn!(path, "Route registered after HTTP server started, ignoring");
            return false;
        };

        let routes = std::mem::replace(router, Router::new());
        *router = routes.route(path, method_router(method, handler, self.log.clone()));
        true
    }

    /// Address the listener is bound to, once `run` has bound it.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self
            .local_addr
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_app(&self, router: Router) -> Router {
        router
            .layer(TimeoutLayer::new(self.request_timeout))
            .layer(CatchPanicLayer::new())
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(request_span)
                    .on_response(DefaultOnResponse::new().level(Level::INFO)),
            )
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
    }
}

#[async_trait]
impl Server for HttpServer {
    fn name(&self) -> &str {
        "http"
    }

    async fn run(&self) {
        let (commands, mut command_rx) = watch::channel(Command::Serve);
        let (finished_tx, finished) = watch::channel(false);

        let router = {
            let mut state = self.lock_state();
            match std::mem::replace(&mut *state, State::Stopped) {
                State::Idle(router) => {
                    *state = State::Running(Control { commands, finished });
                    router
                }
                other => {
                    let running = matches!(other, State::Running(_));
                    *state = other;
                    drop(state);
                    if running {
                        tracing::warn!(port = self.port, "HTTP server already running");
                    } else {
                        tracing::warn!(port = self.port, "HTTP server already stopped, not starting");
                    }
                    return;
                }
            }
        };

        tracing::info!(host = %self.host, port = self.port, "Starting HTTP server");

        let listener = match TcpListener::bind((self.host.as_str(), self.port)).await {
            Ok(listener) => listener,
            Err(e) => {
                tracing::error!(host = %self.host, port = self.port, error = %e, "Failed to start HTTP server");
                *self.lock_state() = State::Stopped;
                let _ = finished_tx.send(true);
                return;
            }
        };

        let addr = listener.local_addr().ok();
        *self.local_addr.lock().unwrap_or_else(PoisonError::into_inner) = addr;
        if let Some(addr) = addr {
            tracing::info!(address = %addr, "HTTP server listening");
        }

        serve(listener, self.build_app(router), &mut command_rx).await;

        let _ = finished_tx.send(true);
        tracing::info!(port = self.port, "HTTP server stopped");
    }

    async fn shutdown(&self, deadline: Instant) -> Result<(), ShutdownError> {
        let control = match std::mem::replace(&mut *self.lock_state(), State::Stopped) {
            State::Running(control) => control,
            State::Idle(_) => {
                tracing::debug!("HTTP server never started, nothing to shut down");
                return Ok(());
            }
            State::Stopped => return Ok(()),
        };

        tracing::info!(port = self.port, "Shutting down HTTP server");
        let Control {
            commands,
            mut finished,
        } = control;
        let _ = commands.send(Command::Drain);

        shutdown::with_deadline_or_force(
            deadline,
            async move {
                finished.wait_for(|done| *done).await?;
                Ok::<(), watch::error::RecvError>(())
            },
            || {
                // The accept loop may already be gone; nothing left to close then.
                let _ = commands.send(Command::Close);
                Ok::<(), std::io::Error>(())
            },
        )
        .await
    }
}

/// Accept loop. Returns once every connection has finished or been aborted.
async fn serve(listener: TcpListener, app: Router, commands: &mut watch::Receiver<Command>) {
    let builder = auto::Builder::new(TokioExecutor::new());
    let graceful = GracefulShutdown::new();
    let mut connections = JoinSet::new();

    loop {
        if *commands.borrow_and_update() != Command::Serve {
            break;
        }

        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    let service = TowerToHyperService::new(app.clone());
                    let conn = builder.serve_connection_with_upgrades(TokioIo::new(stream), service);
                    let conn = graceful.watch(conn.into_owned());
                    connections.spawn(async move {
                        if let Err(e) = conn.await {
                            tracing::debug!(peer = %peer, error = %e, "Connection closed with error");
                        }
                    });
                }
                Err(e) => {
                    // Usually fd exhaustion; back off instead of spinning.
                    tracing::warn!(error = %e, "Failed to accept connection");
                    tokio::time::sleep(Duration::from_millis(50)).await;
                }
            },
            changed = commands.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            Some(_) = connections.join_next() => {}
        }
    }

    drop(listener);
    tracing::info!(connections = connections.len(), "HTTP server draining");

    if *commands.borrow() == Command::Close {
        connections.abort_all();
    } else {
        tokio::select! {
            _ = graceful.shutdown() => {
                tracing::info!("HTTP connections drained");
            }
            _ = commands.wait_for(|c| *c == Command::Close) => {
                tracing::warn!(connections = connections.len(), "Forcing open HTTP connections closed");
                connections.abort_all();
            }
        }
    }

    while connections.join_next().await.is_some() {}
}
