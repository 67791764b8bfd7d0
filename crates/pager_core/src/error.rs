use thiserror::Error;

/// Failure of a page fetch. Carried in state as data, never as a stream fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum SearchError {
    #[error("network error")]
    NetworkError,
    #[error("rate limit exceeded")]
    RateLimitExceeded,
}
