//! Pager engine: feedback loops, paging combinators and page fetching.
mod broadcast;
mod combinators;
mod feedback;
mod fetch;
mod paging;
mod search;
mod task;
mod types;

pub use broadcast::{StateBroadcast, StateStream};
pub use combinators::{distinct_until_changed, switch_map, SwitchMap};
pub use feedback::{
    fallible_feedback, feedback, CommandStream, Feedback, FeedbackError, FeedbackLoop,
};
pub use fetch::{FetchSettings, GitHubFetcher, PageFetcher};
pub use paging::{Pages, PagesExt};
pub use search::{
    paginated_search, reduce_search, request_effect, search_performer, user_input,
    LoadNextPageTrigger, SearchCommand,
};
pub use types::Repository;
