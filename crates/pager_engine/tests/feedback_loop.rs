use std::sync::Once;
use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use pager_engine::{fallible_feedback, feedback, Feedback, FeedbackError, FeedbackLoop, StateStream};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

async fn wait_for<S: Clone>(states: &mut StateStream<S>, pred: impl Fn(&S) -> bool) -> S {
    tokio::time::timeout(Duration::from_secs(2), async {
        while let Some(state) = states.next().await {
            if pred(&state) {
                return state;
            }
        }
        panic!("state stream ended before condition held");
    })
    .await
    .expect("condition reached in time")
}

fn push(mut state: Vec<u32>, command: u32) -> Vec<u32> {
    state.push(command);
    state
}

fn channel_feedback(rx: mpsc::UnboundedReceiver<u32>) -> Feedback<Vec<u32>, u32> {
    feedback(move |_states: StateStream<Vec<u32>>| UnboundedReceiverStream::new(rx))
}

#[tokio::test]
async fn subscribers_start_from_initial_state() {
    init_logging();
    let system = FeedbackLoop::run(vec![7u32], push, Vec::new());

    let mut first = system.subscribe();
    let mut second = system.subscribe();
    assert_eq!(first.next().await, Some(vec![7]));
    assert_eq!(second.next().await, Some(vec![7]));
    assert_eq!(system.latest(), vec![7]);
}

#[tokio::test]
async fn commands_fold_in_arrival_order() {
    init_logging();
    let (tx, rx) = mpsc::unbounded_channel();
    let system = FeedbackLoop::run(Vec::new(), push, vec![channel_feedback(rx)]);
    let mut states = system.subscribe();

    for n in 1..=5 {
        tx.send(n).unwrap();
    }

    let state = wait_for(&mut states, |s| s.len() == 5).await;
    assert_eq!(state, vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn feedback_reacts_to_its_own_results() {
    init_logging();
    // Emits one increment per observed state until the counter reaches 5.
    let counter = feedback(|states: StateStream<u32>| {
        states.filter_map(|n| async move { (n < 5).then_some(1u32) })
    });
    let system = FeedbackLoop::run(0u32, |n, step| n + step, vec![counter]);
    let mut states = system.subscribe();

    wait_for(&mut states, |n| *n == 5).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(system.latest(), 5);
}

#[tokio::test]
async fn late_feedback_sees_current_state() {
    init_logging();
    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
    let observer = feedback(move |states: StateStream<u32>| {
        states.filter_map(move |n| {
            let _ = seen_tx.send(n);
            async { None::<u32> }
        })
    });
    let _system = FeedbackLoop::run(42u32, |n, step| n + step, vec![observer]);

    let seen = tokio::time::timeout(Duration::from_secs(1), seen_rx.recv())
        .await
        .expect("observer saw a state");
    assert_eq!(seen, Some(42));
}

#[tokio::test]
async fn failing_feedback_is_silenced_without_stopping_others() {
    init_logging();
    let broken = fallible_feedback(|_states: StateStream<Vec<u32>>| {
        stream::iter([Ok(100), Err(FeedbackError::Source("boom".into())), Ok(200)])
    });
    let (tx, rx) = mpsc::unbounded_channel();
    let system = FeedbackLoop::run(Vec::new(), push, vec![broken, channel_feedback(rx)]);
    let mut states = system.subscribe();

    wait_for(&mut states, |s| s.contains(&100)).await;
    tx.send(1).unwrap();
    tx.send(2).unwrap();

    let state = wait_for(&mut states, |s| s.contains(&2)).await;
    assert!(!state.contains(&200));
    assert_eq!(state, vec![100, 1, 2]);
}

#[tokio::test]
async fn panicking_feedback_does_not_take_down_the_loop() {
    init_logging();
    let panicking: Feedback<Vec<u32>, u32> =
        feedback(|_states: StateStream<Vec<u32>>| -> stream::Empty<u32> {
            panic!("feedback construction failed")
        });
    let (tx, rx) = mpsc::unbounded_channel();
    let system = FeedbackLoop::run(Vec::new(), push, vec![panicking, channel_feedback(rx)]);
    let mut states = system.subscribe();

    tx.send(9).unwrap();
    let state = wait_for(&mut states, |s| !s.is_empty()).await;
    assert_eq!(state, vec![9]);
}

#[tokio::test]
async fn shutdown_stops_folding() {
    init_logging();
    let (tx, rx) = mpsc::unbounded_channel();
    let system = FeedbackLoop::run(Vec::new(), push, vec![channel_feedback(rx)]);
    let mut states = system.subscribe();

    tx.send(1).unwrap();
    wait_for(&mut states, |s| s == &vec![1]).await;

    system.shutdown();
    tokio::time::sleep(Duration::from_millis(20)).await;
    let _ = tx.send(2);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(system.latest(), vec![1]);
}
