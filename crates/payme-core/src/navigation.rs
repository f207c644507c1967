//! Named views of the application

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    /// Payment form
    #[default]
    Home,
    /// Payment history with filters
    History,
}

impl View {
    pub const ALL: [View; 2] = [View::Home, View::History];

    pub fn path(&self) -> &'static str {
        match self {
            View::Home => "/",
            View::History => "/history",
        }
    }

    /// Trailing slashes and query strings are ignored
    pub fn from_path(path: &str) -> Option<View> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let trimmed = path.trim_end_matches('/');
        match trimmed {
            "" => Some(View::Home),
            "/history" => Some(View::History),
            _ => None,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            View::Home => "Новый платёж",
            View::History => "История платежей",
        }
    }
}

impl std::fmt::Display for View {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.title())
    }
}
