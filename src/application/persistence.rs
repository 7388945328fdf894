use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use crate::domain::{snapshot, storage::KeyValueStorage, todo::Todo};
use crate::error::StoreError;

use super::todo_store::Shared;

pub(crate) enum Request {
    Load(Option<oneshot::Sender<()>>),
    /// Snapshot taken at mutation time.
    Save(Vec<Todo>),
    /// Whatever the collection holds when the request is reached.
    SaveCurrent(oneshot::Sender<()>),
    Flush(oneshot::Sender<()>),
    Shutdown(oneshot::Sender<()>),
}

/// Owns the storage backend and handles requests one at a time, so a load
/// never overlaps a save.
pub(crate) struct PersistenceWorker<S: KeyValueStorage> {
    storage: S,
    key: String,
    shared: Arc<Shared>,
    rx: mpsc::UnboundedReceiver<Request>,
}

impl<S: KeyValueStorage> PersistenceWorker<S> {
    pub(crate) fn new(storage: S, key: String, shared: Arc<Shared>, rx: mpsc::UnboundedReceiver<Request>) -> Self {
        Self { storage, key, shared, rx }
    }

    pub(crate) async fn run(mut self) {
        if let Err(error) = self.storage.init().await {
            tracing::error!(key = %self.key, %error, "storage init failed");
        }
        while let Some(request) = self.rx.recv().await {
            match request {
                Request::Load(done) => {
                    self.load().await;
                    if let Some(done) = done { let _ = done.send(()); }
                }
                Request::Save(items) => self.save(&items).await,
                Request::SaveCurrent(done) => {
                    let items = self.shared.lock().items.clone();
                    self.save(&items).await;
                    let _ = done.send(());
                }
                Request::Flush(done) => { let _ = done.send(()); }
                Request::Shutdown(done) => {
                    tracing::info!(key = %self.key, "persistence stopped");
                    let _ = done.send(());
                    return;
                }
            }
        }
        tracing::debug!(key = %self.key, "all store handles dropped");
    }

    async fn load(&self) {
        let loaded = match self.fetch().await {
            Ok(Some(items)) => {
                tracing::info!(key = %self.key, count = items.len(), "todos loaded");
                Some(items)
            }
            Ok(None) => {
                tracing::info!(key = %self.key, "nothing stored yet");
                None
            }
            Err(error) => {
                tracing::error!(key = %self.key, %error, "failed to load todos");
                None
            }
        };
        if let Some(items) = self.shared.finish_load(loaded) {
            self.save(&items).await;
        }
    }

    async fn fetch(&self) -> Result<Option<Vec<Todo>>, StoreError> {
        let Some(blob) = self.storage.get(&self.key).await? else { return Ok(None) };
        Ok(Some(snapshot::decode(&blob)?))
    }

    async fn save(&self, items: &[Todo]) {
        let result = match snapshot::encode(items) {
            Ok(blob) => self.storage.set(&self.key, &blob).await.map_err(StoreError::from),
            Err(error) => Err(error),
        };
        match result {
            Ok(()) => tracing::debug!(key = %self.key, count = items.len(), "todos saved"),
            Err(error) => tracing::error!(key = %self.key, %error, "failed to save todos"),
        }
    }
}
