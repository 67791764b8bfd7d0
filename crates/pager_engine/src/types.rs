use serde::Deserialize;

/// One repository from a GitHub search page.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Repository {
    pub name: String,
    #[serde(rename = "html_url")]
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponse {
    pub(crate) items: Vec<Repository>,
}
