use engine_logging::{engine_debug, engine_trace, engine_warn};
use futures_util::stream::{BoxStream, Stream, StreamExt};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::broadcast::{StateBroadcast, StateStream};

/// Fault that ends a feedback's command stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedbackError {
    #[error("feedback source failed: {0}")]
    Source(String),
}

/// Commands produced by one feedback. An `Err` silences that feedback.
pub type CommandStream<C> = BoxStream<'static, Result<C, FeedbackError>>;

/// Maps the broadcast state stream to a stream of commands.
pub type Feedback<S, C> = Box<dyn FnOnce(StateStream<S>) -> CommandStream<C> + Send>;

/// Wraps a feedback whose command stream cannot fail.
pub fn feedback<S, C, F, St>(f: F) -> Feedback<S, C>
where
    F: FnOnce(StateStream<S>) -> St + Send + 'static,
    St: Stream<Item = C> + Send + 'static,
    S: 'static,
    C: 'static,
{
    Box::new(move |states| f(states).map(Ok).boxed())
}

/// Wraps a feedback whose command stream may fail.
pub fn fallible_feedback<S, C, F, St>(f: F) -> Feedback<S, C>
where
    F: FnOnce(StateStream<S>) -> St + Send + 'static,
    St: Stream<Item = Result<C, FeedbackError>> + Send + 'static,
    S: 'static,
    C: 'static,
{
    Box::new(move |states| f(states).boxed())
}

/// A running system of feedback loops folding commands into state.
///
/// Commands from every feedback are merged in arrival order and folded one at
/// a time by a single task. Each new state is published to the replay-latest
/// broadcast before the next command is taken, so feedbacks always react to
/// the state their previous commands produced.
///
/// Must be started from within a tokio runtime. Dropping the handle stops the
/// fold task, every feedback task and any fetch they own.
pub struct FeedbackLoop<S> {
    broadcast: StateBroadcast<S>,
    cancel: CancellationToken,
}

impl<S> FeedbackLoop<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn run<C, R>(initial: S, reducer: R, feedbacks: Vec<Feedback<S, C>>) -> Self
    where
        C: Send + 'static,
        R: FnMut(S, C) -> S + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let broadcast = StateBroadcast::new(initial.clone());
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        for (source, feedback) in feedbacks.into_iter().enumerate() {
            // Subscribe before spawning so the feedback is attached before the
            // first fold step and starts from the initial state.
            let states = broadcast.subscribe();
            let command_tx = command_tx.clone();
            let cancel = cancel.child_token();
            tokio::spawn(async move {
                let commands = feedback(states);
                forward_commands(source, commands, command_tx, cancel).await;
            });
        }
        drop(command_tx);

        tokio::spawn(fold_commands(
            initial,
            reducer,
            command_rx,
            broadcast.clone(),
            cancel.clone(),
        ));

        Self { broadcast, cancel }
    }

    /// Replay-latest state stream: the current state first, then updates.
    pub fn subscribe(&self) -> StateStream<S> {
        self.broadcast.subscribe()
    }

    pub fn latest(&self) -> S {
        self.broadcast.latest()
    }

    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

impl<S> Drop for FeedbackLoop<S> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn forward_commands<C>(
    source: usize,
    mut commands: CommandStream<C>,
    command_tx: mpsc::UnboundedSender<C>,
    cancel: CancellationToken,
) {
    engine_debug!("feedback {} attached", source);
    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => break,
            next = commands.next() => next,
        };
        match next {
            Some(Ok(command)) => {
                if command_tx.send(command).is_err() {
                    break;
                }
            }
            Some(Err(err)) => {
                engine_warn!("feedback {} failed, ignoring it from now on: {}", source, err);
                break;
            }
            None => {
                engine_debug!("feedback {} completed", source);
                break;
            }
        }
    }
}

async fn fold_commands<S, C, R>(
    mut state: S,
    mut reducer: R,
    mut command_rx: mpsc::UnboundedReceiver<C>,
    broadcast: StateBroadcast<S>,
    cancel: CancellationToken,
) where
    S: Clone + Send + Sync + 'static,
    R: FnMut(S, C) -> S,
{
    let mut step: u64 = 0;
    loop {
        let command = tokio::select! {
            _ = cancel.cancelled() => break,
            command = command_rx.recv() => command,
        };
        let Some(command) = command else {
            engine_debug!("all feedbacks finished after {} fold steps", step);
            break;
        };
        state = reducer(state, command);
        step += 1;
        broadcast.publish(state.clone());
        engine_trace!("fold step {} published", step);
    }
}
