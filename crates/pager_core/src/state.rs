use crate::{RequestKey, SearchError};

/// Opaque paging token handed to the page fetcher.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Cursor {
    /// First page of a query; carries the query text.
    Seed(String),
    /// Follow-up page token returned by the previous fetch.
    Next(String),
}

/// One fetched page of results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<Cursor>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next_cursor: Option<Cursor>) -> Self {
        Self { items, next_cursor }
    }

    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            next_cursor: None,
        }
    }
}

/// Immutable snapshot of a paginated search.
///
/// Every transition consumes the snapshot and returns a new one; `results`
/// only grows until the next query replaces the whole state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchState<T> {
    search_text: String,
    should_load_next_page: bool,
    results: Vec<T>,
    next_cursor: Option<Cursor>,
    failure: Option<SearchError>,
}

impl<T> SearchState<T> {
    /// Fresh state for `search_text`: nothing loaded yet, first page wanted.
    pub fn new(search_text: impl Into<String>) -> Self {
        let search_text = search_text.into();
        Self {
            next_cursor: Some(Cursor::Seed(search_text.clone())),
            search_text,
            should_load_next_page: true,
            results: Vec::new(),
            failure: None,
        }
    }

    /// State the engine starts from: the empty query.
    pub fn initial() -> Self {
        Self::new("")
    }

    pub fn search_text(&self) -> &str {
        &self.search_text
    }

    pub fn should_load_next_page(&self) -> bool {
        self.should_load_next_page
    }

    pub fn results(&self) -> &[T] {
        &self.results
    }

    pub fn next_cursor(&self) -> Option<&Cursor> {
        self.next_cursor.as_ref()
    }

    pub fn failure(&self) -> Option<SearchError> {
        self.failure
    }

    pub fn is_rate_limited(&self) -> bool {
        self.failure == Some(SearchError::RateLimitExceeded)
    }

    pub fn is_offline(&self) -> bool {
        self.failure == Some(SearchError::NetworkError)
    }

    pub fn request_key(&self) -> RequestKey {
        RequestKey::from(self)
    }

    pub(crate) fn with_failure(self, failure: Option<SearchError>) -> Self {
        Self { failure, ..self }
    }

    pub(crate) fn requesting_next_page(self) -> Self {
        Self {
            should_load_next_page: true,
            ..self
        }
    }

    pub(crate) fn appending_page(self, page: Page<T>) -> Self {
        let mut results = self.results;
        results.extend(page.items);
        Self {
            results,
            should_load_next_page: false,
            next_cursor: page.next_cursor,
            failure: None,
            ..self
        }
    }
}

impl<T> Default for SearchState<T> {
    fn default() -> Self {
        Self::initial()
    }
}
