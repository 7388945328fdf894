pub const DEFAULT_DATABASE_URL: &str = "sqlite://todos.db";
pub const DEFAULT_STORAGE_KEY: &str = "TODO_APP_DATA";
pub const DEFAULT_LOG_FILE: &str = "todo-tui.log";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub database_url: String,
    pub storage_key: String,
    /// Where the terminal shell writes its logs.
    pub log_file: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { database_url: DEFAULT_DATABASE_URL.to_string(), storage_key: DEFAULT_STORAGE_KEY.to_string(), log_file: DEFAULT_LOG_FILE.to_string() }
    }
}

impl StoreConfig {
    /// Reads `.env` (if any) and then the process environment.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();
        Self {
            database_url: non_empty("DATABASE_URL").unwrap_or(defaults.database_url),
            storage_key: non_empty("TODO_STORAGE_KEY").unwrap_or(defaults.storage_key),
            log_file: non_empty("TODO_LOG_FILE").unwrap_or(defaults.log_file),
        }
    }
}
