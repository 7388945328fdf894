use std::sync::{atomic::{AtomicU64, Ordering}, Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::{sync::{mpsc, oneshot}, task::JoinHandle};

use crate::domain::{storage::KeyValueStorage, todo::{Todo, TodoFilter, TodoId}};
use crate::error::StoreError;

use super::persistence::{PersistenceWorker, Request};

/// Read-only picture of the store handed to the presentation layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreView {
    pub items: Vec<Todo>,
    pub is_loading: bool,
}

impl StoreView {
    pub fn completed_count(&self) -> usize { self.items.iter().filter(|t| t.done).count() }

    pub fn remaining_count(&self) -> usize { self.items.len() - self.completed_count() }

    pub fn visible(&self, filter: TodoFilter) -> impl Iterator<Item = &Todo> {
        self.items.iter().filter(move |t| filter.matches(t))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Arc<dyn Fn(&StoreView) + Send + Sync>;

#[derive(Debug, Clone)]
pub(crate) enum Mutation {
    Add(Todo),
    Delete(TodoId),
    Toggle(TodoId),
}

impl Mutation {
    /// Returns whether `items` changed.
    pub(crate) fn apply(&self, items: &mut Vec<Todo>) -> bool {
        match self {
            Mutation::Add(todo) => {
                if items.iter().any(|t| t.id == todo.id) { return false; }
                items.push(todo.clone());
                true
            }
            Mutation::Delete(id) => match items.iter().position(|t| &t.id == id) {
                Some(idx) => { items.remove(idx); true }
                None => false,
            },
            Mutation::Toggle(id) => match items.iter_mut().find(|t| &t.id == id) {
                Some(todo) => { todo.toggle(); true }
                None => false,
            },
        }
    }
}

#[derive(Default)]
pub(crate) struct StoreState {
    pub(crate) items: Vec<Todo>,
    pub(crate) loads_in_flight: usize,
    /// Mutations made while a load was in flight, replayed on the loaded items.
    pub(crate) pending: Vec<Mutation>,
    /// Whether `pending` changed anything that the next save must capture.
    pub(crate) pending_changed: bool,
}

impl StoreState {
    pub(crate) fn is_loading(&self) -> bool { self.loads_in_flight > 0 }

    pub(crate) fn view(&self) -> StoreView { StoreView { items: self.items.clone(), is_loading: self.is_loading() } }
}

/// State shared between store handles and the persistence worker.
#[derive(Default)]
pub(crate) struct Shared {
    state: Mutex<StoreState>,
    listeners: Mutex<Vec<(SubscriptionId, Listener)>>,
    next_subscription: AtomicU64,
}

impl Shared {
    pub(crate) fn lock(&self) -> MutexGuard<'_, StoreState> { self.state.lock().unwrap_or_else(PoisonError::into_inner) }

    pub(crate) fn notify(&self, view: &StoreView) {
        // call outside the lock so listeners may use the store
        let listeners: Vec<Listener> = self.listeners.lock().unwrap_or_else(PoisonError::into_inner).iter().map(|(_, l)| l.clone()).collect();
        for listener in listeners { listener(view); }
    }

    /// Applies the outcome of one load. `loaded` is `None` when the backend
    /// had nothing stored or the load failed; the current items are kept then.
    /// Returns the collection to save when the last in-flight load resolved
    /// and mutations made in the meantime changed the items.
    pub(crate) fn finish_load(&self, loaded: Option<Vec<Todo>>) -> Option<Vec<Todo>> {
        let (view, to_save) = {
            let mut state = self.lock();
            if let Some(mut items) = loaded {
                let mut changed = false;
                for mutation in &state.pending { changed |= mutation.apply(&mut items); }
                state.items = items;
                // earlier in-memory effects were replaced along with the items
                state.pending_changed = changed;
            }
            state.loads_in_flight = state.loads_in_flight.saturating_sub(1);
            let mut to_save = None;
            if !state.is_loading() {
                state.pending.clear();
                if std::mem::take(&mut state.pending_changed) { to_save = Some(state.items.clone()); }
            }
            (state.view(), to_save)
        };
        self.notify(&view);
        to_save
    }
}

struct Inner {
    shared: Arc<Shared>,
    tx: mpsc::UnboundedSender<Request>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

/// Handle to the todo collection. Cheap to clone; all clones share one
/// collection and one persistence queue.
#[derive(Clone)]
pub struct TodoStore {
    inner: Arc<Inner>,
}

/// Non-owning handle, for listeners that call back into the store.
#[derive(Clone)]
pub struct WeakTodoStore {
    inner: Weak<Inner>,
}

impl WeakTodoStore {
    pub fn upgrade(&self) -> Option<TodoStore> { self.inner.upgrade().map(|inner| TodoStore { inner }) }
}

impl TodoStore {
    /// Creates the store and starts loading `storage_key` from `storage`.
    /// Must be called inside a Tokio runtime.
    pub fn open<S: KeyValueStorage>(storage: S, storage_key: impl Into<String>) -> Self {
        let shared = Arc::new(Shared::default());
        shared.lock().loads_in_flight = 1;
        let (tx, rx) = mpsc::unbounded_channel();
        // queued before the worker starts, so it is the first thing processed
        let _ = tx.send(Request::Load(None));
        let worker = PersistenceWorker::new(storage, storage_key.into(), shared.clone(), rx);
        let handle = tokio::spawn(worker.run());
        Self { inner: Arc::new(Inner { shared, tx, worker: Mutex::new(Some(handle)) }) }
    }

    pub fn add_todo(&self, title: &str) -> Result<TodoId, StoreError> {
        let title = title.trim();
        if title.is_empty() { return Err(StoreError::EmptyTitle); }
        let todo = Todo::create(title);
        let id = todo.id.clone();
        self.mutate(Mutation::Add(todo));
        tracing::debug!(%id, "todo added");
        Ok(id)
    }

    /// Returns whether an item was removed.
    pub fn delete_todo(&self, id: &TodoId) -> bool { self.mutate(Mutation::Delete(id.clone())) }

    /// Returns whether an item was toggled.
    pub fn toggle_todo(&self, id: &TodoId) -> bool { self.mutate(Mutation::Toggle(id.clone())) }

    /// Reloads the collection from storage, replacing the in-memory items when
    /// something is stored. Resolves once the load has been applied.
    pub async fn load_todos(&self) -> Result<(), StoreError> {
        let (done, wait) = oneshot::channel();
        let view = {
            let mut state = self.shared().lock();
            self.send(Request::Load(Some(done)))?;
            state.loads_in_flight += 1;
            state.view()
        };
        self.shared().notify(&view);
        wait.await.map_err(|_| StoreError::Closed)
    }

    /// Writes the current collection. Storage failures are logged, not returned.
    pub async fn save_todos(&self) -> Result<(), StoreError> {
        let (done, wait) = oneshot::channel();
        self.send(Request::SaveCurrent(done))?;
        wait.await.map_err(|_| StoreError::Closed)
    }

    /// Waits until everything queued for persistence so far has been handled.
    pub async fn flush(&self) -> Result<(), StoreError> {
        let (done, wait) = oneshot::channel();
        self.send(Request::Flush(done))?;
        wait.await.map_err(|_| StoreError::Closed)
    }

    /// Drains the persistence queue and stops the worker. Later mutations
    /// still change the in-memory collection but are no longer persisted.
    pub async fn shutdown(&self) -> Result<(), StoreError> {
        let (done, wait) = oneshot::channel();
        self.send(Request::Shutdown(done))?;
        wait.await.map_err(|_| StoreError::Closed)?;
        let handle = self.inner.worker.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(handle) = handle {
            if let Err(error) = handle.await { tracing::error!(%error, "persistence worker panicked"); }
        }
        Ok(())
    }

    pub fn items(&self) -> Vec<Todo> { self.shared().lock().items.clone() }

    pub fn view(&self) -> StoreView { self.shared().lock().view() }

    pub fn is_loading(&self) -> bool { self.shared().lock().is_loading() }

    pub fn completed_count(&self) -> usize { self.shared().lock().items.iter().filter(|t| t.done).count() }

    pub fn remaining_count(&self) -> usize { self.shared().lock().items.iter().filter(|t| !t.done).count() }

    /// Registers `listener`, called with a fresh view after every change.
    ///
    /// A listener that needs the store should capture [`TodoStore::downgrade`]
    /// rather than a clone: a strong handle inside a listener keeps the store
    /// and its persistence task alive until `shutdown` is called.
    pub fn subscribe(&self, listener: impl Fn(&StoreView) + Send + Sync + 'static) -> SubscriptionId {
        let shared = self.shared();
        let id = SubscriptionId(shared.next_subscription.fetch_add(1, Ordering::Relaxed));
        shared.listeners.lock().unwrap_or_else(PoisonError::into_inner).push((id, Arc::new(listener)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.shared().listeners.lock().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(sid, _)| *sid != id);
        listeners.len() != before
    }

    pub fn downgrade(&self) -> WeakTodoStore { WeakTodoStore { inner: Arc::downgrade(&self.inner) } }

    fn shared(&self) -> &Shared { &self.inner.shared }

    fn send(&self, request: Request) -> Result<(), StoreError> {
        self.inner.tx.send(request).map_err(|_| StoreError::Closed)
    }

    fn mutate(&self, mutation: Mutation) -> bool {
        let view = {
            let mut state = self.shared().lock();
            let changed = mutation.apply(&mut state.items);
            if state.is_loading() {
                state.pending.push(mutation);
                state.pending_changed |= changed;
            } else if changed {
                // sent under the lock so the queue sees saves in mutation order
                if self.send(Request::Save(state.items.clone())).is_err() {
                    tracing::warn!("store is shut down; change kept in memory only");
                }
            }
            if !changed { return false; }
            state.view()
        };
        self.shared().notify(&view);
        true
    }
}
