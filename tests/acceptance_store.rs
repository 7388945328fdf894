use todo_store::domain::storage::KeyValueStorage;
use todo_store::infrastructure::sqlite_storage::SqliteStorage;
use todo_store::{TodoFilter, TodoStore};

const KEY: &str = "TODO_APP_DATA";

#[tokio::test]
async fn acceptance_add_toggle_delete_reload() {
    // use in-memory sqlite for tests
    let storage = SqliteStorage::connect("sqlite::memory:").await.unwrap();
    let store = TodoStore::open(storage.clone(), KEY);
    store.flush().await.unwrap();
    assert!(!store.is_loading());
    assert!(store.items().is_empty());

    // add
    let milk = store.add_todo("Buy milk").unwrap();
    let bread = store.add_todo("Buy bread").unwrap();
    let eggs = store.add_todo("Buy eggs").unwrap();

    // toggle
    assert!(store.toggle_todo(&bread));

    // delete
    assert!(store.delete_todo(&eggs));

    let view = store.view();
    assert_eq!(view.completed_count(), 1);
    assert_eq!(view.remaining_count(), 1);
    let pending: Vec<_> = view.visible(TodoFilter::Pending).map(|t| t.id.clone()).collect();
    assert_eq!(pending, vec![milk.clone()]);
    store.shutdown().await.unwrap();

    // raw blob
    let blob = storage.get(KEY).await.unwrap().unwrap();
    let json: serde_json::Value = serde_json::from_str(&blob).unwrap();
    assert_eq!(json.as_array().unwrap().len(), 2);
    assert_eq!(json[0]["title"], "Buy milk");
    assert_eq!(json[1]["done"], true);

    // reload in a fresh store
    let reopened = TodoStore::open(storage, KEY);
    reopened.flush().await.unwrap();
    assert_eq!(reopened.items(), view.items);
}

#[tokio::test]
async fn acceptance_file_backed_database_is_created() {
    let path = std::env::temp_dir().join(format!("todo-store-{}.db", uuid::Uuid::new_v4()));
    let url = format!("sqlite://{}", path.display());

    let store = TodoStore::open(SqliteStorage::connect(&url).await.unwrap(), KEY);
    store.add_todo("persist me").unwrap();
    store.flush().await.unwrap();
    store.shutdown().await.unwrap();
    assert!(path.exists());

    let reopened = TodoStore::open(SqliteStorage::connect(&url).await.unwrap(), KEY);
    reopened.flush().await.unwrap();
    let items = reopened.items();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].title, "persist me");
    reopened.shutdown().await.unwrap();
    let _ = std::fs::remove_file(&path);
}
