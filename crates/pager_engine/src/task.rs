use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use engine_logging::engine_error;
use tokio::task::JoinHandle;

/// Why a spawned task produced no output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TaskFailure {
    Panicked,
    Cancelled,
}

/// Handle to work spawned on its own task. Dropping it aborts the task.
pub(crate) struct AbortOnDrop<T> {
    handle: JoinHandle<T>,
}

/// Runs `fut` on a separate task so it makes progress (and can be aborted)
/// independently of whoever awaits the result.
pub(crate) fn spawn_abortable<F>(fut: F) -> AbortOnDrop<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    AbortOnDrop {
        handle: tokio::spawn(fut),
    }
}

impl<T> Future for AbortOnDrop<T> {
    type Output = Result<T, TaskFailure>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.handle).poll(cx) {
            Poll::Ready(Ok(value)) => Poll::Ready(Ok(value)),
            Poll::Ready(Err(err)) if err.is_panic() => {
                engine_error!("spawned fetch task panicked: {}", err);
                Poll::Ready(Err(TaskFailure::Panicked))
            }
            Poll::Ready(Err(_)) => Poll::Ready(Err(TaskFailure::Cancelled)),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
