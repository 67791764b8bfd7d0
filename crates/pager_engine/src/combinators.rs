use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::future;
use futures_util::stream::{BoxStream, Stream, StreamExt};

/// Drops items equal to the one emitted just before them.
pub fn distinct_until_changed<St>(stream: St) -> impl Stream<Item = St::Item>
where
    St: Stream,
    St::Item: PartialEq + Clone,
{
    let mut last: Option<St::Item> = None;
    stream.filter_map(move |item| {
        let changed = last.as_ref() != Some(&item);
        if changed {
            last = Some(item.clone());
        }
        future::ready(changed.then_some(item))
    })
}

/// Maps every upstream item to an inner stream and forwards only the newest
/// inner stream. Starting a new inner stream drops the previous one, which
/// cancels whatever it was awaiting.
pub struct SwitchMap<T, U> {
    upstream: Option<BoxStream<'static, T>>,
    project: Box<dyn FnMut(T) -> BoxStream<'static, U> + Send>,
    inner: Option<BoxStream<'static, U>>,
}

pub fn switch_map<St, F, T, U>(upstream: St, project: F) -> SwitchMap<T, U>
where
    St: Stream<Item = T> + Send + 'static,
    F: FnMut(T) -> BoxStream<'static, U> + Send + 'static,
{
    SwitchMap {
        upstream: Some(upstream.boxed()),
        project: Box::new(project),
        inner: None,
    }
}

impl<T, U> Stream for SwitchMap<T, U> {
    type Item = U;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<U>> {
        let this = self.get_mut();

        // Drain upstream first so a newer item always wins over stale output.
        while let Some(upstream) = this.upstream.as_mut() {
            match upstream.poll_next_unpin(cx) {
                Poll::Ready(Some(item)) => this.inner = Some((this.project)(item)),
                Poll::Ready(None) => this.upstream = None,
                Poll::Pending => break,
            }
        }

        if let Some(inner) = this.inner.as_mut() {
            match inner.poll_next_unpin(cx) {
                Poll::Ready(Some(item)) => return Poll::Ready(Some(item)),
                Poll::Ready(None) => this.inner = None,
                Poll::Pending => return Poll::Pending,
            }
        }

        if this.upstream.is_none() && this.inner.is_none() {
            Poll::Ready(None)
        } else {
            Poll::Pending
        }
    }
}
