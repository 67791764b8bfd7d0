use crate::{Cursor, SearchState};

/// The part of [`SearchState`] that decides whether a fetch is needed.
///
/// Fetch scheduling watches this key for changes instead of the whole
/// snapshot, so appending results or recording a failure never re-issues a
/// request on its own.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    pub search_text: String,
    pub should_load_next_page: bool,
    pub next_cursor: Option<Cursor>,
}

impl<T> From<&SearchState<T>> for RequestKey {
    fn from(state: &SearchState<T>) -> Self {
        Self {
            search_text: state.search_text().to_owned(),
            should_load_next_page: state.should_load_next_page(),
            next_cursor: state.next_cursor().cloned(),
        }
    }
}
