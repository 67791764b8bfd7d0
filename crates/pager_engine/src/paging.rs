use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::stream::{BoxStream, Stream, StreamExt};

type NextPage<Q, S> = Box<dyn FnMut(&Q, Option<&S>) -> BoxStream<'static, S> + Send>;
type HasNext<S> = Box<dyn Fn(&S) -> bool + Send>;

/// Per-query paging pipeline built by [`PagesExt::map_with_pages`].
///
/// For every query value the first page is requested right away. After that
/// each trigger event requests the next page while `has_next` holds for the
/// latest page state. A new query drops whatever page request is in flight,
/// so a superseded result is never emitted.
pub struct Pages<Q, S> {
    queries: Option<BoxStream<'static, Q>>,
    trigger: Option<BoxStream<'static, ()>>,
    next_page: NextPage<Q, S>,
    has_next: HasNext<S>,
    query: Option<Q>,
    page_state: Option<S>,
    in_flight: Option<BoxStream<'static, S>>,
}

// Fields are only reached through `&mut`; streams are pinned in their boxes.
impl<Q, S> Unpin for Pages<Q, S> {}

pub trait PagesExt: Stream + Sized + Send + 'static {
    /// Pages through results for each query this stream yields.
    ///
    /// `next_page(query, None)` fetches the first page of a query and
    /// `next_page(query, Some(state))` the page after `state`. Only the first
    /// state a page stream yields is used. Triggers are ignored while a page
    /// is in flight or while `has_next` is false. Queries are not
    /// deduplicated; a repeated value restarts paging.
    fn map_with_pages<S, F, H, T>(self, next_page: F, has_next: H, trigger: T) -> Pages<Self::Item, S>
    where
        F: FnMut(&Self::Item, Option<&S>) -> BoxStream<'static, S> + Send + 'static,
        H: Fn(&S) -> bool + Send + 'static,
        T: Stream<Item = ()> + Send + 'static,
    {
        Pages {
            queries: Some(self.boxed()),
            trigger: Some(trigger.boxed()),
            next_page: Box::new(next_page),
            has_next: Box::new(has_next),
            query: None,
            page_state: None,
            in_flight: None,
        }
    }
}

impl<St> PagesExt for St where St: Stream + Sized + Send + 'static {}

impl<Q, S: Clone> Pages<Q, S> {
    fn can_request_more(&self) -> bool {
        self.in_flight.is_none()
            && self
                .page_state
                .as_ref()
                .is_some_and(|state| (self.has_next)(state))
    }

    fn poll_queries(&mut self, cx: &mut Context<'_>) {
        while let Some(queries) = self.queries.as_mut() {
            match queries.poll_next_unpin(cx) {
                Poll::Ready(Some(query)) => {
                    // Dropping the old page stream cancels its fetch.
                    self.page_state = None;
                    self.in_flight = Some((self.next_page)(&query, None));
                    self.query = Some(query);
                }
                Poll::Ready(None) => self.queries = None,
                Poll::Pending => break,
            }
        }
    }

    /// Consumes trigger events, starting a page request for the first one
    /// that arrives while another page may be requested.
    fn poll_trigger(&mut self, cx: &mut Context<'_>) {
        while let Some(trigger) = self.trigger.as_mut() {
            match trigger.poll_next_unpin(cx) {
                Poll::Ready(Some(())) => {
                    if !self.can_request_more() {
                        continue;
                    }
                    if let Some(query) = self.query.as_ref() {
                        self.in_flight = Some((self.next_page)(query, self.page_state.as_ref()));
                        break;
                    }
                }
                Poll::Ready(None) => self.trigger = None,
                Poll::Pending => break,
            }
        }
    }

    fn is_exhausted(&self) -> bool {
        self.queries.is_none()
            && self.in_flight.is_none()
            && (self.trigger.is_none() || !self.can_request_more())
    }
}

impl<Q, S: Clone> Stream for Pages<Q, S> {
    type Item = S;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<S>> {
        let this = self.get_mut();
        loop {
            this.poll_queries(cx);
            if this.in_flight.is_none() {
                this.poll_trigger(cx);
            }

            let Some(in_flight) = this.in_flight.as_mut() else {
                return if this.is_exhausted() {
                    Poll::Ready(None)
                } else {
                    Poll::Pending
                };
            };

            match in_flight.poll_next_unpin(cx) {
                Poll::Ready(Some(state)) => {
                    this.in_flight = None;
                    this.page_state = Some(state.clone());
                    return Poll::Ready(Some(state));
                }
                // Finished without a page; keep the previous state and wait.
                Poll::Ready(None) => this.in_flight = None,
                Poll::Pending => {
                    // Still drain triggers so they do not pile up for later.
                    this.poll_trigger(cx);
                    return Poll::Pending;
                }
            }
        }
    }
}
