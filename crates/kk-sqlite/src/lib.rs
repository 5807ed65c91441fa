//! SQLite persistence for categories and saved images.
//!
//! One connection behind a mutex. Statements run on the blocking pool, so a
//! busy database stalls a blocking thread, never a runtime worker, and callers
//! can bound the wait with a timeout.

use std::{
    path::Path,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::info;

use kk_core::{
    domain::{Category, ImageDescriptor, SavedId, SavedImage, UserId},
    errors::Error,
    ports::{CategoryCatalog, CategoryStore, SavedStore},
    Result,
};

trait StorageContext<T> {
    fn context(self, what: &str) -> Result<T>;
}

impl<T> StorageContext<T> for rusqlite::Result<T> {
    fn context(self, what: &str) -> Result<T> {
        self.map_err(|e| Error::Storage(format!("{what}: {e}")))
    }
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS categories (
    user_id INTEGER PRIMARY KEY,
    category_name TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS saved (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    external_id TEXT NOT NULL,
    image_url TEXT NOT NULL,
    category_name TEXT NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE (user_id, external_id)
);
CREATE INDEX IF NOT EXISTS saved_by_user ON saved (user_id, created_at, id);
";

const SAVED_COLUMNS: &str = "id, user_id, external_id, image_url, category_name, created_at";

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    catalog: Arc<CategoryCatalog>,
}

impl SqliteStore {
    pub fn open(path: &Path, catalog: Arc<CategoryCatalog>) -> Result<Self> {
        let conn = Connection::open(path)
            .context(&format!("Failed to open database {}", path.display()))?;
        Self::with_connection(conn, catalog)
    }

    pub fn open_in_memory(catalog: Arc<CategoryCatalog>) -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::with_connection(conn, catalog)
    }

    fn with_connection(conn: Connection, catalog: Arc<CategoryCatalog>) -> Result<Self> {
        conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)
            .context("Failed to set busy timeout")?;
        conn.execute_batch(SCHEMA)
            .context("Failed to initialize schema")?;
        info!("database schema initialized");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            catalog,
        })
    }

    /// Run `op` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| Error::Storage("connection mutex poisoned".to_string()))?;
            op(&mut guard)
        })
        .await
        .map_err(|e| Error::Storage(format!("storage task failed: {e}")))?
    }

    async fn put_category(&self, user_id: UserId, name: &str) -> Result<Category> {
        let name = name.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO categories (user_id, category_name) VALUES (?1, ?2)
                 ON CONFLICT (user_id) DO UPDATE SET category_name = excluded.category_name",
                params![user_id.0, name],
            )
            .context("Failed to store category")?;
            Ok(Category { user_id, name })
        })
        .await
    }
}

fn saved_from_row(row: &Row<'_>) -> rusqlite::Result<SavedImage> {
    Ok(SavedImage {
        id: SavedId(row.get(0)?),
        user_id: UserId(row.get(1)?),
        external_id: row.get(2)?,
        image_url: row.get(3)?,
        category_name: row.get(4)?,
        created_at: row.get::<_, DateTime<Utc>>(5)?,
    })
}

#[async_trait]
impl CategoryStore for SqliteStore {
    async fn get(&self, user_id: UserId) -> Result<Option<Category>> {
        self.with_conn(move |conn| {
            let name: Option<String> = conn
                .query_row(
                    "SELECT category_name FROM categories WHERE user_id = ?1",
                    params![user_id.0],
                    |row| row.get(0),
                )
                .optional()
                .context("Failed to load category")?;
            Ok(name.map(|name| Category { user_id, name }))
        })
        .await
    }

    async fn set_default(&self, user_id: UserId) -> Result<Category> {
        self.put_category(user_id, self.catalog.default_name())
            .await
    }

    async fn update(&self, user_id: UserId, name: &str) -> Result<Category> {
        self.catalog.validate(name)?;
        self.put_category(user_id, name).await
    }
}

#[async_trait]
impl SavedStore for SqliteStore {
    async fn save(&self, user_id: UserId, image: &ImageDescriptor) -> Result<SavedImage> {
        let image = image.clone();
        self.with_conn(move |conn| {
            let inserted = conn
                .execute(
                    "INSERT INTO saved (user_id, external_id, image_url, category_name, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)
                     ON CONFLICT (user_id, external_id) DO NOTHING",
                    params![
                        user_id.0,
                        image.external_id,
                        image.image_url,
                        image.category_name,
                        Utc::now()
                    ],
                )
                .context("Failed to insert saved image")?;
            if inserted == 0 {
                info!(user_id = %user_id, external_id = %image.external_id, "already saved");
            }

            conn.query_row(
                &format!(
                    "SELECT {SAVED_COLUMNS} FROM saved WHERE user_id = ?1 AND external_id = ?2"
                ),
                params![user_id.0, image.external_id],
                saved_from_row,
            )
            .context("Failed to load saved image")
        })
        .await
    }

    async fn list_ordered(&self, user_id: UserId) -> Result<Vec<SavedImage>> {
        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {SAVED_COLUMNS} FROM saved WHERE user_id = ?1 ORDER BY created_at, id"
                ))
                .context("Failed to prepare saved query")?;
            let rows = stmt
                .query_map(params![user_id.0], saved_from_row)
                .context("Failed to query saved images")?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
                .context("Failed to read saved images")
        })
        .await
    }

    async fn exists_for_user(&self, user_id: UserId) -> Result<bool> {
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT EXISTS (SELECT 1 FROM saved WHERE user_id = ?1)",
                params![user_id.0],
                |row| row.get(0),
            )
            .context("Failed to check saved images")
        })
        .await
    }

    async fn delete_by_id(&self, id: SavedId) -> Result<bool> {
        self.with_conn(move |conn| {
            let removed = conn
                .execute("DELETE FROM saved WHERE id = ?1", params![id.0])
                .context("Failed to delete saved image")?;
            Ok(removed > 0)
        })
        .await
    }

    async fn delete_all_for_user(&self, user_id: UserId) -> Result<usize> {
        let removed = self
            .with_conn(move |conn| {
                let tx = conn
                    .transaction()
                    .context("Failed to start transaction")?;
                let removed = tx
                    .execute("DELETE FROM saved WHERE user_id = ?1", params![user_id.0])
                    .context("Failed to clear saved images")?;
                tx.commit().context("Failed to commit clear")?;
                Ok(removed)
            })
            .await?;
        info!(user_id = %user_id, removed, "cleared saved images");
        Ok(removed)
    }
}
