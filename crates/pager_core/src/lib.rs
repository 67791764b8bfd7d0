//! Pager core: pure search state, reducer and request-key derivation.
mod command;
mod error;
mod reduce;
mod request_key;
mod state;
mod view_model;

pub use command::Command;
pub use error::SearchError;
pub use reduce::reduce;
pub use request_key::RequestKey;
pub use state::{Cursor, Page, SearchState};
pub use view_model::{SearchViewModel, NETWORK_ALERT, RATE_LIMIT_ALERT};
