//! Flat string key-value backends for the history record
//!
//! Note: the SQLite backend is only available with the `native` feature.
//! `MemoryKv` works everywhere and is what tests build on.

use crate::error::{StoreError, StoreResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

#[cfg(feature = "native")]
use rusqlite::{params, Connection, OptionalExtension};
#[cfg(feature = "native")]
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
#[cfg(feature = "native")]
use tokio::sync::oneshot;

/// Durable, asynchronous key-value namespace.
///
/// Each `put` replaces the whole value for a key; readers never see a partial write.
#[async_trait]
pub trait KvBackend: Send + Sync {
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;
    async fn put(&self, key: &str, value: String) -> StoreResult<()>;
    async fn remove(&self, key: &str) -> StoreResult<()>;
}

#[derive(Default)]
pub struct MemoryKv {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.values
            .lock()
            .map_err(|_| StoreError::Internal("memory kv lock poisoned".into()))
    }
}

#[async_trait]
impl KvBackend for MemoryKv {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    async fn put(&self, key: &str, value: String) -> StoreResult<()> {
        self.lock()?.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}

#[cfg(feature = "native")]
impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

#[cfg(feature = "native")]
enum KvMsg {
    Get {
        key: String,
        resp: oneshot::Sender<StoreResult<Option<String>>>,
    },
    Put {
        key: String,
        value: String,
        resp: oneshot::Sender<StoreResult<()>>,
    },
    Remove {
        key: String,
        resp: oneshot::Sender<StoreResult<()>>,
    },
}

/// SQLite-backed namespace. One table row per key, all statements on a single
/// worker thread.
#[cfg(feature = "native")]
#[derive(Clone)]
pub struct SqliteKv {
    tx: UnboundedSender<KvMsg>,
}

#[cfg(feature = "native")]
impl SqliteKv {
    /// Open (or create) the database at `db_path` and start the worker.
    ///
    /// Fails fast if the file cannot be opened or the schema cannot be created;
    /// later failures are reported per request.
    pub fn open(db_path: &str, namespace: &str) -> StoreResult<Self> {
        let conn = Connection::open(db_path)?;
        conn.pragma_update(None, "journal_mode", &"WAL")?;
        conn.pragma_update(None, "synchronous", &"NORMAL")?;
        // Set busy timeout to avoid immediate lock failures
        conn.pragma_update(None, "busy_timeout", &250)?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv(
                namespace TEXT NOT NULL,
                key       TEXT NOT NULL,
                value     TEXT NOT NULL,
                PRIMARY KEY(namespace, key)
            );
        "#,
        )?;
        Ok(Self::spawn_worker(conn, namespace.to_string()))
    }

    fn spawn_worker(conn: Connection, namespace: String) -> Self {
        let (tx, mut rx) = unbounded_channel::<KvMsg>();

        std::thread::spawn(move || {
            while let Some(msg) = rx.blocking_recv() {
                match msg {
                    KvMsg::Get { key, resp } => {
                        let _ = resp.send(get_db(&conn, &namespace, &key));
                    }
                    KvMsg::Put { key, value, resp } => {
                        let _ = resp.send(put_db(&conn, &namespace, &key, &value));
                    }
                    KvMsg::Remove { key, resp } => {
                        let _ = resp.send(remove_db(&conn, &namespace, &key));
                    }
                }
            }
            log::debug!("sqlite kv worker for '{namespace}' stopped");
        });

        Self { tx }
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<StoreResult<T>>) -> KvMsg,
    ) -> StoreResult<T> {
        let (resp_tx, resp_rx) = oneshot::channel();
        self.tx
            .send(make(resp_tx))
            .map_err(|_| StoreError::WorkerGone)?;
        resp_rx.await.map_err(|_| StoreError::WorkerGone)?
    }
}

#[cfg(feature = "native")]
#[async_trait]
impl KvBackend for SqliteKv {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let key = key.to_string();
        self.request(|resp| KvMsg::Get { key, resp }).await
    }

    async fn put(&self, key: &str, value: String) -> StoreResult<()> {
        let key = key.to_string();
        self.request(|resp| KvMsg::Put { key, value, resp }).await
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        let key = key.to_string();
        self.request(|resp| KvMsg::Remove { key, resp }).await
    }
}

#[cfg(feature = "native")]
fn get_db(conn: &Connection, namespace: &str, key: &str) -> StoreResult<Option<String>> {
    let value = conn
        .query_row(
            "SELECT value FROM kv WHERE namespace = ? AND key = ?",
            params![namespace, key],
            |row| row.get::<_, String>(0),
        )
        .optional()?;
    Ok(value)
}

#[cfg(feature = "native")]
fn put_db(conn: &Connection, namespace: &str, key: &str, value: &str) -> StoreResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO kv(namespace,key,value) VALUES (?,?,?)",
        params![namespace, key, value],
    )?;
    Ok(())
}

#[cfg(feature = "native")]
fn remove_db(conn: &Connection, namespace: &str, key: &str) -> StoreResult<()> {
    conn.execute(
        "DELETE FROM kv WHERE namespace = ? AND key = ?",
        params![namespace, key],
    )?;
    Ok(())
}
