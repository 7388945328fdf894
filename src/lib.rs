pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;

pub use application::todo_store::{StoreView, SubscriptionId, TodoStore, WeakTodoStore};
pub use domain::todo::{Todo, TodoFilter, TodoId};
pub use error::StoreError;
