use crate::{SearchError, SearchState};

pub const RATE_LIMIT_ALERT: &str = "Exceeded limit of 10 non authenticated requests per minute for GitHub API. Please wait a minute. :(\nhttps://developer.github.com/v3/#rate-limiting";
pub const NETWORK_ALERT: &str = "Network unavailable, results may be incomplete.";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchViewModel {
    pub search_text: String,
    pub header: String,
    pub result_count: usize,
    pub is_loading: bool,
    pub alert: Option<&'static str>,
}

impl<T> SearchState<T> {
    pub fn view(&self) -> SearchViewModel {
        let result_count = self.results().len();
        let header = if result_count > 0 {
            format!("Repositories ({result_count})")
        } else {
            "No repositories found".to_string()
        };
        let alert = self.failure().map(|failure| match failure {
            SearchError::RateLimitExceeded => RATE_LIMIT_ALERT,
            SearchError::NetworkError => NETWORK_ALERT,
        });

        SearchViewModel {
            search_text: self.search_text().to_owned(),
            header,
            result_count,
            is_loading: self.should_load_next_page() && !self.search_text().is_empty(),
            alert,
        }
    }
}
