//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ipa::config::MapConfig;
use ipa::lifecycle::shutdown::{self, ShutdownError};
use ipa::{App, HttpServer, Logger, Server};
use tokio::sync::watch;
use tokio::time::Instant;

/// App bound to an ephemeral localhost port.
pub fn test_app() -> App {
    test_app_with(MapConfig::new())
}

pub fn test_app_with(config: MapConfig) -> App {
    let config = config.with("HTTP_HOST", "127.0.0.1").with("HTTP_PORT", "0");
    App::with_config(Arc::new(config), Logger::default()).unwrap()
}

/// How a [`MockServer`] behaves.
#[derive(Debug, Clone)]
pub struct MockBehavior {
    /// `run` returns right away, as after a bind failure.
    pub exit_immediately: bool,
    /// Time the graceful shutdown path takes.
    pub drain_time: Duration,
    /// The graceful path reports an error.
    pub fail_drain: bool,
    /// Whether a force-close fallback exists.
    pub fallback: bool,
}

impl Default for MockBehavior {
    fn default() -> Self {
        Self {
            exit_immediately: false,
            drain_time: Duration::ZERO,
            fail_drain: false,
            fallback: true,
        }
    }
}

/// Server that records every lifecycle call.
pub struct MockServer {
    name: String,
    behavior: MockBehavior,
    stop: watch::Sender<bool>,
    pub runs: AtomicUsize,
    pub runs_returned: AtomicUsize,
    pub shutdowns: AtomicUsize,
    pub forced: AtomicUsize,
}

impl MockServer {
    pub fn new(name: &str) -> Arc<Self> {
        Self::with_behavior(name, MockBehavior::default())
    }

    pub fn with_behavior(name: &str, behavior: MockBehavior) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            behavior,
            stop: watch::Sender::new(false),
            runs: AtomicUsize::new(0),
            runs_returned: AtomicUsize::new(0),
            shutdowns: AtomicUsize::new(0),
            forced: AtomicUsize::new(0),
        })
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    pub fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }

    pub fn forced(&self) -> usize {
        self.forced.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Server for MockServer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self) {
        self.runs.fetch_add(1, Ordering::SeqCst);
        if !self.behavior.exit_immediately {
            let mut stop = self.stop.subscribe();
            let _ = stop.wait_for(|stopped| *stopped).await;
        }
        self.runs_returned.fetch_add(1, Ordering::SeqCst);
    }

    async fn shutdown(&self, deadline: Instant) -> Result<(), ShutdownError> {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);

        let graceful = async {
            tokio::time::sleep(self.behavior.drain_time).await;
            self.stop.send_replace(true);
            if self.behavior.fail_drain {
                Err(io::Error::other("drain failed"))
            } else {
                Ok(())
            }
        };

        if self.behavior.fallback {
            shutdown::with_deadline_or_force(deadline, graceful, || {
                self.forced.fetch_add(1, Ordering::SeqCst);
                self.stop.send_replace(true);
                Ok::<(), io::Error>(())
            })
            .await
        } else {
            shutdown::with_deadline(deadline, graceful).await
        }
    }
}

pub fn deadline_in(duration: Duration) -> Instant {
    Instant::now() + duration
}

/// Poll until `check` holds, panicking after five seconds.
pub async fn eventually(mut check: impl FnMut() -> bool) {
    let started = std::time::Instant::now();
    while !check() {
        assert!(started.elapsed() < Duration::from_secs(5), "condition not met in time");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Wait until the HTTP server has bound its listener.
pub async fn wait_for_addr(server: &HttpServer) -> SocketAddr {
    eventually(|| server.local_addr().is_some()).await;
    server.local_addr().unwrap()
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
