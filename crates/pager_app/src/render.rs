use pager_core::SearchState;
use pager_engine::Repository;

/// Turns successive states into terminal lines, printing only what changed.
#[derive(Debug, Default)]
pub struct Renderer {
    search_text: Option<String>,
    shown_rows: usize,
    alert: Option<&'static str>,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(&mut self, state: &SearchState<Repository>) -> Vec<String> {
        let view = state.view();
        let mut lines = Vec::new();

        if self.search_text.as_deref() != Some(view.search_text.as_str()) {
            self.search_text = Some(view.search_text.clone());
            self.shown_rows = 0;
            if !view.search_text.is_empty() {
                lines.push(format!("== {}", view.search_text));
            }
        }

        let rows = state.results();
        if rows.len() > self.shown_rows {
            for (index, repo) in rows.iter().enumerate().skip(self.shown_rows) {
                lines.push(format!("{:>4}. {}  {}", index + 1, repo.name, repo.url));
            }
            self.shown_rows = rows.len();
            lines.push(format!("-- {}", view.header));
        } else if !view.is_loading && rows.is_empty() && !view.search_text.is_empty() {
            lines.push(format!("-- {}", view.header));
        }

        // Alert once per transition into a failure.
        if view.alert != self.alert {
            if let Some(alert) = view.alert {
                lines.push(format!("!! {alert}"));
            }
            self.alert = view.alert;
        }

        lines
    }
}
