use crate::{Command, SearchState};

/// Pure reducer: applies a command to a snapshot and returns the next one.
pub fn reduce<T>(state: SearchState<T>, command: Command<T>) -> SearchState<T> {
    match command {
        // A new query starts a new epoch but keeps showing the last failure
        // until a fetch succeeds.
        Command::ChangeQuery(text) => {
            let failure = state.failure();
            SearchState::new(text).with_failure(failure)
        }
        Command::LoadMore => {
            if state.failure().is_some() {
                state
            } else {
                state.requesting_next_page()
            }
        }
        Command::ResponseReceived(Ok(page)) => state.appending_page(page),
        Command::ResponseReceived(Err(err)) => state.with_failure(Some(err)),
    }
}
