use std::sync::Arc;

use engine_logging::engine_debug;
use futures_util::future;
use futures_util::stream::{self, BoxStream, StreamExt};
use pager_core::{reduce, Command, Page, RequestKey, SearchError, SearchState};

use crate::broadcast::StateStream;
use crate::combinators::{distinct_until_changed, switch_map};
use crate::feedback::{feedback, Feedback, FeedbackLoop};
use crate::fetch::PageFetcher;
use crate::task::{spawn_abortable, TaskFailure};

/// Builds the "load more" event source from the state stream, so it can hold
/// back while a page is already being loaded.
pub type LoadNextPageTrigger<T> =
    Box<dyn FnOnce(StateStream<SearchState<T>>) -> BoxStream<'static, ()> + Send>;

/// Command as it travels through the search feedback loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchCommand<T> {
    /// User input, applied as is.
    Input(Command<T>),
    /// Result of the fetch issued for `key`.
    Answer {
        key: RequestKey,
        result: Result<Page<T>, SearchError>,
    },
}

/// Applies a [`SearchCommand`].
///
/// An answer is only folded while the state still carries the request key it
/// was fetched for. A result that was already queued when a newer query got
/// folded is dropped here instead of landing in the new query's results.
pub fn reduce_search<T>(state: SearchState<T>, command: SearchCommand<T>) -> SearchState<T> {
    match command {
        SearchCommand::Input(command) => reduce(state, command),
        SearchCommand::Answer { key, result } => {
            if state.request_key() == key {
                reduce(state, Command::ResponseReceived(result))
            } else {
                engine_debug!("dropping answer for superseded request {:?}", key);
                state
            }
        }
    }
}

/// Paginated search driven by two feedback loops: one turns state into page
/// fetches, the other turns user input into commands.
pub fn paginated_search<T>(
    search_text: BoxStream<'static, String>,
    load_next_page_trigger: LoadNextPageTrigger<T>,
    fetcher: Arc<dyn PageFetcher<T>>,
) -> FeedbackLoop<SearchState<T>>
where
    T: Clone + Send + Sync + 'static,
{
    FeedbackLoop::run(
        SearchState::initial(),
        reduce_search,
        vec![
            search_performer(fetcher),
            user_input(search_text, load_next_page_trigger),
        ],
    )
}

/// Fetches a page whenever the request key changes to one that wants a page.
///
/// A new key drops the effect of the previous one, aborting its fetch.
pub fn search_performer<T>(
    fetcher: Arc<dyn PageFetcher<T>>,
) -> Feedback<SearchState<T>, SearchCommand<T>>
where
    T: Send + Sync + 'static,
{
    feedback(move |states: StateStream<SearchState<T>>| {
        let keys = distinct_until_changed(states.map(|state| RequestKey::from(&state)));
        switch_map(keys, move |key| request_effect(key, Arc::clone(&fetcher)))
    })
}

/// Commands issued for one request key.
pub fn request_effect<T>(
    key: RequestKey,
    fetcher: Arc<dyn PageFetcher<T>>,
) -> BoxStream<'static, SearchCommand<T>>
where
    T: Send + 'static,
{
    if !key.should_load_next_page {
        return stream::empty().boxed();
    }
    if key.search_text.is_empty() {
        let answer = SearchCommand::Answer {
            key,
            result: Ok(Page::empty()),
        };
        return stream::iter([answer]).boxed();
    }
    let Some(cursor) = key.next_cursor.clone() else {
        return stream::empty().boxed();
    };

    engine_debug!("requesting page {:?} for {:?}", cursor, key.search_text);
    let fetch = spawn_abortable(async move { fetcher.fetch(&cursor).await });
    stream::once(fetch)
        .filter_map(move |outcome| {
            let result = match outcome {
                Ok(result) => Some(result),
                // A crashed fetch still has to settle the request.
                Err(TaskFailure::Panicked) => Some(Err(SearchError::NetworkError)),
                Err(TaskFailure::Cancelled) => None,
            };
            let key = key.clone();
            future::ready(result.map(|result| SearchCommand::Answer { key, result }))
        })
        .boxed()
}

/// Maps query text to `ChangeQuery` and trigger events to `LoadMore`.
pub fn user_input<T>(
    search_text: BoxStream<'static, String>,
    load_next_page_trigger: LoadNextPageTrigger<T>,
) -> Feedback<SearchState<T>, SearchCommand<T>>
where
    T: Send + Sync + 'static,
{
    feedback(move |states: StateStream<SearchState<T>>| {
        let load_more = load_next_page_trigger(states).map(|()| Command::LoadMore);
        let queries = search_text.map(Command::ChangeQuery);
        stream::select(load_more, queries).map(SearchCommand::Input)
    })
}
