mod persistence;
pub mod todo_store;
