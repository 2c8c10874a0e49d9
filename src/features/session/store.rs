use crate::shared::errors::{AppError, AppResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// 永続化されたキー・バリュー領域（ブラウザのlocalStorage相当）
pub trait SessionStore: Send + Sync {
    fn get_item(&self, key: &str) -> AppResult<Option<String>>;
    fn set_item(&self, key: &str, value: &str) -> AppResult<()>;
    fn remove_item(&self, key: &str) -> AppResult<()>;
}

/// メモリ上のセッションストア
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    items: Mutex<HashMap<String, String>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn items(&self) -> AppResult<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.items
            .lock()
            .map_err(|e| AppError::concurrency(format!("セッションストアのロック取得に失敗: {e}")))
    }
}

impl SessionStore for InMemorySessionStore {
    fn get_item(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.items()?.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> AppResult<()> {
        self.items()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> AppResult<()> {
        self.items()?.remove(key);
        Ok(())
    }
}

/// SQLiteで永続化するセッションストア
pub struct SqliteSessionStore {
    conn: Mutex<Connection>,
}

impl SqliteSessionStore {
    /// 指定パスのデータベースを開き、テーブルを作成する
    pub fn open<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS local_storage (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;

        log::info!("セッションストアを開きました: {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// アプリケーションデータディレクトリ配下のデフォルトパスで開く
    pub fn open_default() -> AppResult<Self> {
        Self::open(default_database_path()?)
    }

    fn conn(&self) -> AppResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| AppError::concurrency(format!("データベースのロック取得に失敗: {e}")))
    }
}

impl SessionStore for SqliteSessionStore {
    fn get_item(&self, key: &str) -> AppResult<Option<String>> {
        let conn = self.conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM local_storage WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set_item(&self, key: &str, value: &str) -> AppResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO local_storage (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, chrono::Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> AppResult<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM local_storage WHERE key = ?1", params![key])?;
        Ok(())
    }
}

/// セッションデータベースのデフォルトパス
pub fn default_database_path() -> AppResult<PathBuf> {
    let data_dir = dirs::data_dir()
        .ok_or_else(|| AppError::configuration("データディレクトリを取得できません"))?;
    Ok(data_dir.join("billed").join("local_storage.db"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_in_memory_store() {
        let store = InMemorySessionStore::new();
        assert_eq!(store.get_item("user").unwrap(), None);

        store.set_item("user", "a").unwrap();
        store.set_item("user", "b").unwrap();
        assert_eq!(store.get_item("user").unwrap(), Some("b".to_string()));

        store.remove_item("user").unwrap();
        assert_eq!(store.get_item("user").unwrap(), None);
    }

    #[test]
    fn test_sqlite_store_persists_across_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("local_storage.db");

        {
            let store = SqliteSessionStore::open(&path).unwrap();
            store
                .set_item("user", r#"{"type":"Employee","email":"a@a"}"#)
                .unwrap();
            store.set_item("jwt", "token-1").unwrap();
            store.set_item("jwt", "token-2").unwrap();
        }

        let reopened = SqliteSessionStore::open(&path).unwrap();
        assert_eq!(
            reopened.get_item("user").unwrap(),
            Some(r#"{"type":"Employee","email":"a@a"}"#.to_string())
        );
        assert_eq!(reopened.get_item("jwt").unwrap(), Some("token-2".to_string()));

        reopened.remove_item("jwt").unwrap();
        assert_eq!(reopened.get_item("jwt").unwrap(), None);
    }

    #[test]
    fn test_default_database_path() {
        if let Ok(path) = default_database_path() {
            assert!(path.ends_with("billed/local_storage.db"));
        }
    }
}
