use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Suspend the current export once, handing control back to the executor.
///
/// Exporters await this between frames so a single-threaded host can keep painting and
/// handling input while a long job runs.
pub fn yield_now() -> YieldNow {
    YieldNow { yielded: false }
}

/// Future returned by [`yield_now`].
#[derive(Debug)]
#[must_use = "futures do nothing unless awaited"]
pub struct YieldNow {
    yielded: bool,
}

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            return Poll::Ready(());
        }
        self.yielded = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}

#[cfg(test)]
#[path = "../../tests/unit/export/sched.rs"]
mod tests;
