use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};

use super::yield_now::{YieldNow, yield_now};

/// Error returned when the import observes cancellation at a phase boundary.
///
/// Kernels already scheduled keep running to completion; their results are
/// discarded when the orchestration layer hits the next checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

impl std::fmt::Display for Cancelled {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("import cancelled")
    }
}

impl std::error::Error for Cancelled {}

/// Token that signals cancellation to an in-flight import.
///
/// Cloning a token creates another handle to the same flag; calling
/// [`cancel()`](CancellationToken::cancel) on any clone affects all.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a new token (not cancelled).
    pub fn new() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Signals cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Returns whether cancellation has been signalled.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Returns `Err(Cancelled)` if cancellation has been signalled.
    ///
    /// The synchronous phase-boundary check; async callers await a
    /// [`Checkpoint`] instead.
    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Future that yields once and then checks a cancellation token.
///
/// If the token is cancelled, completes with `Err(Cancelled)` immediately.
/// Otherwise behaves like [`YieldNow`] and completes with `Ok(())`.
pub struct Checkpoint {
    inner: YieldNow,
    token: Option<CancellationToken>,
}

impl Checkpoint {
    /// Creates a checkpoint that only yields (no cancellation).
    pub fn yield_only() -> Self {
        Self {
            inner: yield_now(),
            token: None,
        }
    }

    /// Creates a checkpoint that yields and checks the given token.
    pub fn with_token(token: CancellationToken) -> Self {
        Self {
            inner: yield_now(),
            token: Some(token),
        }
    }
}

impl Future for Checkpoint {
    type Output = Result<(), Cancelled>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Cancelled>> {
        if let Some(token) = &self.token
            && token.is_cancelled()
        {
            return Poll::Ready(Err(Cancelled));
        }

        match Pin::new(&mut self.inner).poll(cx) {
            Poll::Ready(()) => Poll::Ready(Ok(())),
            Poll::Pending => Poll::Pending,
        }
    }
}
