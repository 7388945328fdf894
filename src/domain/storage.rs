use async_trait::async_trait;

/// Async key-value backend the store persists its snapshot into.
#[async_trait]
pub trait KeyValueStorage: Send + Sync + 'static {
    /// Prepare the backend. Must be safe to call more than once.
    async fn init(&self) -> anyhow::Result<()> { Ok(()) }
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;
}
