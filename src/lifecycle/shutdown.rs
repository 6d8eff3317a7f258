//! Deadline-bounded shutdown.
//!
//! Every server's `shutdown` goes through [`with_deadline_or_force`]: the
//! graceful future races the deadline, and the force-close fallback runs only
//! when the deadline wins.

use std::fmt::Write as _;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure of a single server's shutdown.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// The graceful path finished before the deadline but reported an error.
    #[error("graceful shutdown failed: {0}")]
    Graceful(#[source] BoxError),

    /// The graceful path missed the deadline.
    #[error("shutdown deadline exceeded (forced close: {forced})")]
    DeadlineExceeded { forced: bool },

    /// The graceful path missed the deadline and the forced close failed too.
    #[error("shutdown deadline exceeded, forced close failed: {0}")]
    ForceClose(#[source] BoxError),
}

impl ShutdownError {
    /// Whether the force-close fallback ran.
    pub fn is_forced(&self) -> bool {
        matches!(
            self,
            ShutdownError::DeadlineExceeded { forced: true } | ShutdownError::ForceClose(_)
        )
    }
}

/// Roughly thirty years, the same horizon tokio uses for "never".
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// `now + timeout`, saturating to a far-future instant instead of panicking
/// on overflow.
pub fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

/// Run `graceful` until `deadline`, reporting a timeout as an error.
pub async fn with_deadline<G, E>(deadline: Instant, graceful: G) -> Result<(), ShutdownError>
where
    G: Future<Output = Result<(), E>>,
    E: Into<BoxError>,
{
    race(deadline, graceful, None::<fn() -> Result<(), BoxError>>).await
}

/// Run `graceful` until `deadline`; if it does not finish in time, run
/// `force_close` instead.
pub async fn with_deadline_or_force<G, E, F, FE>(
    deadline: Instant,
    graceful: G,
    force_close: F,
) -> Result<(), ShutdownError>
where
    G: Future<Output = Result<(), E>>,
    E: Into<BoxError>,
    F: FnOnce() -> Result<(), FE>,
    FE: Into<BoxError>,
{
    race(deadline, graceful, Some(force_close)).await
}

async fn race<G, E, F, FE>(
    deadline: Instant,
    graceful: G,
    force_close: Option<F>,
) -> Result<(), ShutdownError>
where
    G: Future<Output = Result<(), E>>,
    E: Into<BoxError>,
    F: FnOnce() -> Result<(), FE>,
    FE: Into<BoxError>,
{
    match tokio::time::timeout_at(deadline, graceful).await {
        Ok(result) => result.map_err(|e| ShutdownError::Graceful(e.into())),
        Err(_) => {
            let Some(force_close) = force_close else {
                return Err(ShutdownError::DeadlineExceeded { forced: false });
            };
            tracing::warn!("Graceful shutdown missed its deadline, forcing close");
            match force_close() {
                Ok(()) => Err(ShutdownError::DeadlineExceeded { forced: true }),
                Err(e) => Err(ShutdownError::ForceClose(e.into())),
            }
        }
    }
}

/// A named server's shutdown failure.
#[derive(Debug, Error)]
#[error("{server}: {error}")]
pub struct ServerFailure {
    pub server: String,
    #[source]
    pub error: ShutdownError,
}

/// Every server shutdown failure from one `App::shutdown` call.
#[derive(Debug, Error)]
#[error("{} server(s) failed to shut down: {}", .failures.len(), list(.failures))]
pub struct ShutdownErrors {
    failures: Vec<ServerFailure>,
}

impl ShutdownErrors {
    /// `Ok(())` when there are no failures.
    pub fn check(failures: Vec<ServerFailure>) -> Result<(), Self> {
        if failures.is_empty() {
            Ok(())
        } else {
            Err(Self { failures })
        }
    }

    pub fn failures(&self) -> &[ServerFailure] {
        &self.failures
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }
}

fn list(failures: &[ServerFailure]) -> String {
    let mut out = String::new();
    for (i, failure) in failures.iter().enumerate() {
        if i > 0 {
            out.push_str("; ");
        }
        let _ = write!(out, "{failure}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn deadline_in(ms: u64) -> Instant {
        Instant::now() + Duration::from_millis(ms)
    }

    #[tokio::test]
    async fn test_graceful_completion_skips_fallback() {
        let forced = AtomicUsize::new(0);
        let result = with_deadline_or_force(
            deadline_in(500),
            async { Ok::<_, io::Error>(()) },
            || {
                forced.fetch_add(1, Ordering::SeqCst);
                Ok::<_, io::Error>(())
            },
        )
        .await;

        assert!(result.is_ok());
        assert_eq!(forced.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_graceful_error_is_reported() {
        let result = with_deadline(deadline_in(500), async {
            Err::<(), _>(io::Error::other("drain failed"))
        })
        .await;

        let err = result.unwrap_err();
        assert!(matches!(err, ShutdownError::Graceful(_)));
        assert!(!err.is_forced());
        assert!(err.to_string().contains("drain failed"));
    }

    #[tokio::test]
    async fn test_missed_deadline_runs_fallback_once() {
        let forced = AtomicUsize::new(0);
        let started = std::time::Instant::now();

        let result = with_deadline_or_force(
            deadline_in(100),
            async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, io::Error>(())
            },
            || {
                forced.fetch_add(1, Ordering::SeqCst);
                Ok::<_, io::Error>(())
            },
        )
        .await;

        assert!(matches!(result, Err(ShutdownError::DeadlineExceeded { forced: true })));
        assert_eq!(forced.load(Ordering::SeqCst), 1);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_missed_deadline_without_fallback_returns_at_deadline() {
        let started = std::time::Instant::now();

        let result = with_deadline(deadline_in(200), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, io::Error>(())
        })
        .await;

        assert!(matches!(result, Err(ShutdownError::DeadlineExceeded { forced: false })));
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(190));
        assert!(elapsed < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_failed_fallback_is_reported() {
        let result = with_deadline_or_force(
            deadline_in(50),
            std::future::pending::<Result<(), io::Error>>(),
            || Err(io::Error::other("socket already gone")),
        )
        .await;

        let err = result.unwrap_err();
        assert!(matches!(err, ShutdownError::ForceClose(_)));
        assert!(err.is_forced());
    }

    #[test]
    fn test_deadline_after_saturates_instead_of_overflowing() {
        let before = Instant::now();

        let deadline = deadline_after(Duration::MAX);
        assert!(deadline > before + Duration::from_secs(86400 * 365));

        let deadline = deadline_after(Duration::from_secs(2));
        assert!(deadline >= before + Duration::from_secs(2));
        assert!(deadline < Instant::now() + Duration::from_secs(3));
    }

    #[test]
    fn test_aggregate_lists_every_failure() {
        assert!(ShutdownErrors::check(Vec::new()).is_ok());

        let errors = ShutdownErrors::check(vec![
            ServerFailure {
                server: "http".into(),
                error: ShutdownError::DeadlineExceeded { forced: true },
            },
            ServerFailure {
                server: "queue".into(),
                error: ShutdownError::Graceful("broker unreachable".into()),
            },
        ])
        .unwrap_err();

        assert_eq!(errors.len(), 2);
        let message = errors.to_string();
        assert!(message.starts_with("2 server(s) failed to shut down"));
        assert!(message.contains("http: shutdown deadline exceeded"));
        assert!(message.contains("queue: graceful shutdown failed: broker unreachable"));
    }
}
