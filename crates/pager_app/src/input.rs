use std::time::Duration;

use futures_util::future;
use futures_util::stream::{self, StreamExt};
use pager_core::SearchState;
use pager_engine::{LoadNextPageTrigger, StateStream};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::{LinesStream, UnboundedReceiverStream};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserInput {
    Query(String),
    LoadMore,
    Quit,
}

pub fn parse_line(line: &str) -> UserInput {
    match line.trim() {
        "" | ":more" | ":m" => UserInput::LoadMore,
        ":quit" | ":q" => UserInput::Quit,
        text => UserInput::Query(text.to_string()),
    }
}

/// Routes input lines to the query and load-more channels until `:quit` or
/// end of input. Returns the last query forwarded.
pub async fn forward_lines<R>(
    reader: R,
    queries: mpsc::UnboundedSender<String>,
    load_more: mpsc::UnboundedSender<()>,
) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut last_query = None;
    let mut lines = LinesStream::new(reader.lines());
    while let Some(line) = lines.next().await {
        let sent = match parse_line(&line?) {
            UserInput::Query(text) => {
                last_query = Some(text.clone());
                queries.send(text).is_ok()
            }
            UserInput::LoadMore => load_more.send(()).is_ok(),
            UserInput::Quit => break,
        };
        if !sent {
            break;
        }
    }
    Ok(last_query)
}

/// Waits for the first state of `query` with no page pending, giving up
/// after `limit`.
///
/// A failed state counts as settled: it will not load anything further on
/// its own.
pub async fn wait_until_settled<T>(
    mut states: StateStream<SearchState<T>>,
    query: &str,
    limit: Duration,
) -> Option<SearchState<T>> {
    let settled = async {
        while let Some(state) = states.next().await {
            let idle = !state.should_load_next_page() || state.failure().is_some();
            if state.search_text() == query && idle {
                return Some(state);
            }
        }
        None
    };
    tokio::time::timeout(limit, settled).await.ok().flatten()
}

enum TriggerEvent {
    Loading(bool),
    Requested,
}

/// Load-more trigger that only fires while no page is being loaded, the
/// same gate the scroll-to-bottom trigger applies.
pub fn gated_trigger<T>(requests: mpsc::UnboundedReceiver<()>) -> LoadNextPageTrigger<T>
where
    T: Send + Sync + 'static,
{
    Box::new(move |states: StateStream<SearchState<T>>| {
        let loading = states.map(|state| TriggerEvent::Loading(state.should_load_next_page()));
        let requested = UnboundedReceiverStream::new(requests).map(|()| TriggerEvent::Requested);
        stream::select(loading, requested)
            .scan(false, |loading, event| {
                let fire = match event {
                    TriggerEvent::Loading(now) => {
                        *loading = now;
                        None
                    }
                    TriggerEvent::Requested => (!*loading).then_some(()),
                };
                future::ready(Some(fire))
            })
            .filter_map(future::ready)
            .boxed()
    })
}
