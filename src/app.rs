//! Application orchestrator.
//!
//! Owns the registered servers, starts each in its own task, listens for
//! SIGINT/SIGTERM and drives a deadline-bounded shutdown of every server.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::routing::MethodFilter;
use futures_util::future::join_all;
use tokio::task::JoinSet;
use tokio::time::Instant;

use crate::config::{AppSettings, Config, ConfigError};
use crate::http::{Context, HandlerResult, HttpServer};
use crate::lifecycle::shutdown::{self, ServerFailure, ShutdownErrors};
use crate::lifecycle::startup::{self, Bootstrap};
use crate::lifecycle::phase::PhaseCell;
use crate::lifecycle::{Phase, Server, TerminationSignal};
use crate::observability::Logger;

/// A configured application: config, logger and the servers it runs.
///
/// Servers are registered through `&mut self`, so none can be added while
/// [`App::run`] borrows the app; registering after `run` has returned is
/// logged and ignored.
pub struct App {
    config: Arc<dyn Config>,
    settings: AppSettings,
    log: Logger,
    http_server: Arc<HttpServer>,
    http_registered: bool,
    servers: Vec<Arc<dyn Server>>,
    phase: PhaseCell,
    shutdown_requested: AtomicBool,
}

impl App {
    /// Load config from `./configs` (or the working directory) and set up
    /// logging. Configuration errors terminate the process.
    pub fn new() -> Self {
        match Self::try_new() {
            Ok(app) => app,
            Err(e) => Logger::default().fatal(format_args!("Failed to load configuration: {e}")),
        }
    }

    /// Like [`App::new`], returning configuration errors instead of exiting.
    pub fn try_new() -> Result<Self, ConfigError> {
        Ok(Self::from_bootstrap(startup::bootstrap()?))
    }

    /// Build an app around an existing config and logger.
    pub fn with_config(config: Arc<dyn Config>, log: Logger) -> Result<Self, ConfigError> {
        Ok(Self::from_bootstrap(startup::from_config(config, log)?))
    }

    fn from_bootstrap(boot: Bootstrap) -> Self {
        let http_server = Arc::new(HttpServer::from_settings(
            &boot.settings.http,
            boot.logger.scoped("http"),
        ));
        Self {
            config: boot.config,
            settings: boot.settings,
            log: boot.logger,
            http_server,
            http_registered: false,
            servers: Vec::new(),
            phase: PhaseCell::new(),
            shutdown_requested: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &dyn Config {
        self.config.as_ref()
    }

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    pub fn logger(&self) -> &Logger {
        &self.log
    }

    /// The built-in HTTP server; registered with the app on the first route.
    pub fn http_server(&self) -> &Arc<HttpServer> {
        &self.http_server
    }

    pub fn phase(&self) -> Phase {
        self.phase.get()
    }

    pub fn server_count(&self) -> usize {
        self.servers.len()
    }

    /// Add a server to be started by [`App::run`].
    pub fn register(&mut self, server: Arc<dyn Server>) {
        if self.phase.transition(&[Phase::Created, Phase::Registering], Phase::Registering).is_err() {
            tracing::warn!(server = server.name(), phase = ?self.phase(), "App already started, server not registered");
            return;
        }
        tracing::debug!(server = server.name(), "Server registered");
        self.servers.push(server);
    }

    fn add_route<H, Fut>(&mut self, method: MethodFilter, path: &str, handler: H)
    where
        H: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        if !self.phase().accepts_registration() {
            tracing::warn!(path, "App already started, route not registered");
            return;
        }
        if !self.http_server.route(method, path, handler) {
            return;
        }
        if !self.http_registered {
            self.http_registered = true;
            let server: Arc<dyn Server> = self.http_server.clone();
            self.register(server);
        }
    }

    pub fn get<H, Fut>(&mut self, path: &str, handler: H)
    where
        H: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.add_route(MethodFilter::GET, path, handler);
    }

    pub fn post<H, Fut>(&mut self, path: &str, handler: H)
    where
        H: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.add_route(MethodFilter::POST, path, handler);
    }

    pub fn put<H, Fut>(&mut self, path: &str, handler: H)
    where
        H: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.add_route(MethodFilter::PUT, path, handler);
    }

    pub fn patch<H, Fut>(&mut self, path: &str, handler: H)
    where
        H: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.add_route(MethodFilter::PATCH, path, handler);
    }

    pub fn delete<H, Fut>(&mut self, path: &str, handler: H)
    where
        H: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.add_route(MethodFilter::DELETE, path, handler);
    }

    /// Start every registered server and wait until all of them return.
    ///
    /// A termination signal triggers [`App::shutdown`] with a deadline of
    /// `SHUTDOWN_TIMEOUT` from the moment the signal arrived. Only the first
    /// call runs anything.
    pub async fn run(&self) {
        if let Err(phase) = self
            .phase
            .transition(&[Phase::Created, Phase::Registering], Phase::Running)
        {
            tracing::warn!(?phase, "App cannot be started again");
            return;
        }

        let signal = match TerminationSignal::install() {
            Ok(signal) => Some(signal),
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handlers");
                None
            }
        };

        let mut tasks = JoinSet::new();
        for server in &self.servers {
            let server = Arc::clone(server);
            tasks.spawn(async move {
                server.run().await;
                server.name().to_owned()
            });
        }
        tracing::info!(servers = self.servers.len(), "App started");

        let signalled = AtomicBool::new(false);
        let watcher = async {
            let name = match signal {
                Some(mut signal) => signal.recv().await,
                None => std::future::pending::<&'static str>().await,
            };
            signalled.store(true, Ordering::SeqCst);
            tracing::info!(signal = name, "Termination signal received");

            let deadline = shutdown::deadline_after(self.shutdown_timeout());
            if let Err(errors) = self.shutdown(deadline).await {
                tracing::error!(error = %errors, "Shutdown finished with errors");
            }
        };
        tokio::pin!(watcher);
        let mut watcher_done = false;

        while !tasks.is_empty() {
            tokio::select! {
                _ = &mut watcher, if !watcher_done => watcher_done = true,
                Some(joined) = tasks.join_next() => match joined {
                    Ok(name) => tracing::info!(server = %name, "Server returned"),
                    Err(e) => tracing::error!(error = %e, "Server task failed"),
                },
            }
        }

        if signalled.load(Ordering::SeqCst) && !watcher_done {
            watcher.await;
        }

        self.phase.advance(Phase::Stopped);
        tracing::info!("App stopped");
    }

    /// Shut down every registered server by `deadline`.
    ///
    /// All servers are asked concurrently and every failure is collected.
    /// Calls after the first return `Ok(())` without touching the servers.
    pub async fn shutdown(&self, deadline: Instant) -> Result<(), ShutdownErrors> {
        if self.shutdown_requested.swap(true, Ordering::SeqCst) {
            tracing::debug!("Shutdown already requested");
            return Ok(());
        }
        self.phase.advance(Phase::ShuttingDown);
        tracing::info!(servers = self.servers.len(), "Shutting down");

        let results = join_all(self.servers.iter().map(|server| async move {
            (server.name(), server.shutdown(deadline).await)
        }))
        .await;

        let mut failures = Vec::new();
        for (name, result) in results {
            match result {
                Ok(()) => tracing::info!(server = name, "Server shut down gracefully"),
                Err(error) => {
                    if error.is_forced() {
                        tracing::warn!(server = name, error = %error, "Server force closed");
                    } else {
                        tracing::error!(server = name, error = %error, "Server shutdown failed");
                    }
                    failures.push(ServerFailure {
                        server: name.to_owned(),
                        error,
                    });
                }
            }
        }

        ShutdownErrors::check(failures)
    }

    fn shutdown_timeout(&self) -> Duration {
        self.settings.shutdown.timeout()
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}
