use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("title must not be empty")]
    EmptyTitle,
    #[error("snapshot codec: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("storage: {0}")]
    Storage(#[from] anyhow::Error),
    #[error("store has been shut down")]
    Closed,
}
