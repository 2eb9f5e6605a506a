use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Future that suspends exactly once, then completes.
///
/// Awaiting this between import phases hands control back to the executor so
/// other tasks (typically the host's frame loop) get a chance to run.
pub struct YieldNow {
    yielded: bool,
}

/// Create a [`YieldNow`] future.
pub fn yield_now() -> YieldNow {
    YieldNow { yielded: false }
}

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            Poll::Ready(())
        } else {
            self.yielded = true;
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    }
}
