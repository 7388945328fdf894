pub mod snapshot;
pub mod storage;
pub mod todo;
