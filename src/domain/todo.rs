use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier of a todo. Stored data may carry ids minted by other
/// writers, so it is kept as a plain string rather than a parsed UUID.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct TodoId(pub String);

impl TodoId {
    pub fn generate() -> Self { Self(Uuid::new_v4().to_string()) }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl std::fmt::Display for TodoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(&self.0) }
}

impl From<&str> for TodoId {
    fn from(s: &str) -> Self { Self(s.to_string()) }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Todo {
    pub id: TodoId,
    pub title: String,
    pub done: bool,
}

impl Todo {
    /// New pending todo with a freshly generated id.
    pub fn create(title: impl Into<String>) -> Self {
        Self { id: TodoId::generate(), title: title.into(), done: false }
    }

    pub fn toggle(&mut self) { self.done = !self.done; }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TodoFilter {
    #[default]
    All,
    Pending,
    Done,
}

impl TodoFilter {
    pub fn matches(self, todo: &Todo) -> bool {
        match self {
            TodoFilter::All => true,
            TodoFilter::Pending => !todo.done,
            TodoFilter::Done => todo.done,
        }
    }

    /// All -> Pending -> Done -> All
    pub fn next(self) -> Self {
        match self { TodoFilter::All => TodoFilter::Pending, TodoFilter::Pending => TodoFilter::Done, TodoFilter::Done => TodoFilter::All }
    }

    pub fn label(self) -> &'static str {
        match self { TodoFilter::All => "All", TodoFilter::Pending => "Pending", TodoFilter::Done => "Done" }
    }
}
