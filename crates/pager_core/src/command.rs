use crate::{Page, SearchError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command<T> {
    /// The query text changed (debounced upstream).
    ChangeQuery(String),
    /// The presentation asked for the next page.
    LoadMore,
    /// A page fetch finished, successfully or not.
    ResponseReceived(Result<Page<T>, SearchError>),
}
