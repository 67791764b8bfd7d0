use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use futures_util::stream::StreamExt;
use pager_core::{Cursor, Page, SearchError, SearchState};
use pager_engine::{paginated_search, FeedbackLoop, LoadNextPageTrigger, PageFetcher, StateStream};
use pretty_assertions::assert_eq;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

#[derive(Clone)]
enum Reply {
    Page(Vec<&'static str>, Option<&'static str>),
    Fail(SearchError),
    /// Answers after a delay unless aborted first; flags completion.
    Slow(Vec<&'static str>, Arc<AtomicBool>),
    Crash,
}

#[derive(Default)]
struct ScriptedFetcher {
    replies: Mutex<HashMap<Cursor, Reply>>,
    calls: Mutex<Vec<Cursor>>,
}

impl ScriptedFetcher {
    fn reply(&self, cursor: Cursor, reply: Reply) {
        self.replies.lock().unwrap().insert(cursor, reply);
    }

    fn calls(&self) -> Vec<Cursor> {
        self.calls.lock().unwrap().clone()
    }
}

fn owned(items: &[&'static str]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}

#[async_trait::async_trait]
impl PageFetcher<String> for ScriptedFetcher {
    async fn fetch(&self, cursor: &Cursor) -> Result<Page<String>, SearchError> {
        self.calls.lock().unwrap().push(cursor.clone());
        let reply = self.replies.lock().unwrap().get(cursor).cloned();
        match reply {
            Some(Reply::Page(items, next)) => Ok(Page::new(
                owned(&items),
                next.map(|token| Cursor::Next(token.to_string())),
            )),
            Some(Reply::Fail(err)) => Err(err),
            Some(Reply::Slow(items, completed)) => {
                tokio::time::sleep(Duration::from_millis(100)).await;
                completed.store(true, Ordering::SeqCst);
                Ok(Page::new(owned(&items), None))
            }
            Some(Reply::Crash) => panic!("fetcher crashed on {cursor:?}"),
            None => Err(SearchError::NetworkError),
        }
    }
}

struct Harness {
    queries: mpsc::UnboundedSender<String>,
    load_more: mpsc::UnboundedSender<()>,
    fetcher: Arc<ScriptedFetcher>,
    system: FeedbackLoop<SearchState<String>>,
    states: StateStream<SearchState<String>>,
}

fn start(fetcher: ScriptedFetcher) -> Harness {
    let fetcher = Arc::new(fetcher);
    let (query_tx, query_rx) = mpsc::unbounded_channel();
    let (more_tx, more_rx) = mpsc::unbounded_channel();
    let trigger: LoadNextPageTrigger<String> =
        Box::new(move |_states| UnboundedReceiverStream::new(more_rx).boxed());
    let system = paginated_search::<String>(
        UnboundedReceiverStream::new(query_rx).boxed(),
        trigger,
        fetcher.clone(),
    );
    let states = system.subscribe();
    Harness {
        queries: query_tx,
        load_more: more_tx,
        fetcher,
        system,
        states,
    }
}

impl Harness {
    async fn wait_for(&mut self, pred: impl Fn(&SearchState<String>) -> bool) -> SearchState<String> {
        tokio::time::timeout(Duration::from_secs(2), async {
            while let Some(state) = self.states.next().await {
                if pred(&state) {
                    return state;
                }
            }
            panic!("state stream ended before condition held");
        })
        .await
        .expect("condition reached in time")
    }

    async fn settle(&self) {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

#[tokio::test]
async fn empty_query_resolves_without_fetching() {
    init_logging();
    let mut harness = start(ScriptedFetcher::default());

    let state = harness.wait_for(|s| !s.should_load_next_page()).await;
    assert!(state.results().is_empty());
    assert_eq!(state.next_cursor(), None);
    harness.settle().await;
    assert!(harness.fetcher.calls().is_empty());
}

#[tokio::test]
async fn query_then_load_more_fetches_each_page_once() {
    init_logging();
    let fetcher = ScriptedFetcher::default();
    fetcher.reply(Cursor::Seed("rx".into()), Reply::Page(vec!["A", "B"], Some("page2")));
    fetcher.reply(Cursor::Next("page2".into()), Reply::Page(vec!["C", "D"], None));
    let mut harness = start(fetcher);

    harness.queries.send("rx".into()).unwrap();
    let state = harness
        .wait_for(|s| s.search_text() == "rx" && !s.should_load_next_page())
        .await;
    assert_eq!(state.results(), owned(&["A", "B"]).as_slice());
    assert_eq!(state.next_cursor(), Some(&Cursor::Next("page2".into())));

    harness.load_more.send(()).unwrap();
    let state = harness.wait_for(|s| s.results().len() == 4).await;
    assert_eq!(state.results(), owned(&["A", "B", "C", "D"]).as_slice());

    harness.settle().await;
    assert_eq!(
        harness.fetcher.calls(),
        vec![Cursor::Seed("rx".into()), Cursor::Next("page2".into())]
    );
}

#[tokio::test]
async fn last_page_load_more_does_not_fetch() {
    init_logging();
    let fetcher = ScriptedFetcher::default();
    fetcher.reply(Cursor::Seed("rx".into()), Reply::Page(vec!["A"], None));
    let mut harness = start(fetcher);

    harness.queries.send("rx".into()).unwrap();
    harness.wait_for(|s| s.results().len() == 1).await;
    harness.load_more.send(()).unwrap();
    harness.wait_for(|s| s.should_load_next_page()).await;

    harness.settle().await;
    assert_eq!(harness.fetcher.calls(), vec![Cursor::Seed("rx".into())]);
}

#[tokio::test]
async fn failure_blocks_load_more_until_next_query() {
    init_logging();
    let fetcher = ScriptedFetcher::default();
    fetcher.reply(Cursor::Seed("rx".into()), Reply::Page(vec!["A"], Some("page2")));
    fetcher.reply(
        Cursor::Next("page2".into()),
        Reply::Fail(SearchError::RateLimitExceeded),
    );
    fetcher.reply(Cursor::Seed("swift".into()), Reply::Page(vec!["S"], None));
    let mut harness = start(fetcher);

    harness.queries.send("rx".into()).unwrap();
    harness.wait_for(|s| s.results().len() == 1).await;
    harness.load_more.send(()).unwrap();
    let failed = harness.wait_for(|s| s.is_rate_limited()).await;
    assert_eq!(failed.results(), owned(&["A"]).as_slice());

    harness.load_more.send(()).unwrap();
    harness.load_more.send(()).unwrap();
    harness.settle().await;
    assert_eq!(harness.fetcher.calls().len(), 2);
    assert_eq!(harness.system.latest(), failed);

    harness.queries.send("swift".into()).unwrap();
    let state = harness
        .wait_for(|s| s.search_text() == "swift" && s.failure().is_none())
        .await;
    assert_eq!(state.results(), owned(&["S"]).as_slice());
}

#[tokio::test]
async fn crashed_fetch_is_recorded_as_network_failure() {
    init_logging();
    let fetcher = ScriptedFetcher::default();
    fetcher.reply(Cursor::Seed("rx".into()), Reply::Crash);
    fetcher.reply(Cursor::Seed("swift".into()), Reply::Page(vec!["S"], None));
    let mut harness = start(fetcher);

    harness.queries.send("rx".into()).unwrap();
    let failed = harness.wait_for(|s| s.failure().is_some()).await;
    assert_eq!(failed.search_text(), "rx");
    assert_eq!(failed.failure(), Some(SearchError::NetworkError));
    assert!(failed.results().is_empty());

    harness.load_more.send(()).unwrap();
    harness.settle().await;
    assert_eq!(harness.fetcher.calls(), vec![Cursor::Seed("rx".into())]);

    harness.queries.send("swift".into()).unwrap();
    let state = harness
        .wait_for(|s| s.search_text() == "swift" && s.failure().is_none())
        .await;
    assert_eq!(state.results(), owned(&["S"]).as_slice());
}

#[tokio::test]
async fn superseded_query_is_aborted_and_never_folded() {
    init_logging();
    let slow_completed = Arc::new(AtomicBool::new(false));
    let fetcher = ScriptedFetcher::default();
    fetcher.reply(
        Cursor::Seed("slow".into()),
        Reply::Slow(vec!["stale"], slow_completed.clone()),
    );
    fetcher.reply(Cursor::Seed("fast".into()), Reply::Page(vec!["fresh"], None));
    let mut harness = start(fetcher);

    harness.queries.send("slow".into()).unwrap();
    tokio::time::timeout(Duration::from_secs(1), async {
        while !harness.fetcher.calls().contains(&Cursor::Seed("slow".into())) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("slow fetch started");

    harness.queries.send("fast".into()).unwrap();
    harness.wait_for(|s| s.results().len() == 1).await;

    tokio::time::sleep(Duration::from_millis(200)).await;
    let latest = harness.system.latest();
    assert_eq!(latest.search_text(), "fast");
    assert_eq!(latest.results(), owned(&["fresh"]).as_slice());
    assert!(!slow_completed.load(Ordering::SeqCst));
}
