//! SQLite message store backed by a dedicated worker thread.
//!
//! The connection never leaves the worker. Callers send commands over a
//! channel and await a oneshot reply, so operations run one at a time in the
//! order they were submitted.

use async_trait::async_trait;
use rusqlite::{Connection, params};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use tokio::sync::oneshot;
use tracing::{debug, error, info};

use super::traits::MessageStore;
use super::{StorageError, StorageResult};

const CREATE_MESSAGES_TABLE: &str = "CREATE TABLE IF NOT EXISTS messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL,
    session_id TEXT NOT NULL,
    message_list TEXT NOT NULL
)";

/// Commands sent to the storage worker thread.
enum StorageCommand {
    Add {
        username: String,
        session_id: String,
        message_list: String,
        reply: oneshot::Sender<StorageResult<()>>,
    },
    Get {
        username: String,
        session_id: String,
        reply: oneshot::Sender<StorageResult<Vec<String>>>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Handle to the SQLite worker; cheap to clone.
///
/// The worker exits once every handle is dropped or [`close`](Self::close) is
/// called.
#[derive(Clone)]
pub struct SqliteMessageStore {
    tx: Sender<StorageCommand>,
}

impl SqliteMessageStore {
    /// Open (or create) the database at `path` and start the worker.
    pub async fn connect(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();
        let (tx, rx) = mpsc::channel();
        let (ready_tx, ready_rx) = oneshot::channel();

        thread::Builder::new()
            .name("sqlite-storage".to_string())
            .spawn(move || storage_worker_loop(rx, path, ready_tx))?;

        ready_rx.await.map_err(|_| StorageError::Closed)??;

        Ok(Self { tx })
    }

    /// Stop the worker. Commands sent afterwards fail with [`StorageError::Closed`].
    pub async fn close(&self) {
        let (reply, done) = oneshot::channel();
        if self.tx.send(StorageCommand::Shutdown { reply }).is_ok() {
            let _ = done.await;
        }
    }

    fn submit(&self, command: StorageCommand) -> StorageResult<()> {
        self.tx.send(command).map_err(|_| StorageError::Closed)
    }
}

#[async_trait]
impl MessageStore for SqliteMessageStore {
    async fn add(
        &self,
        username: &str,
        session_id: &str,
        message_list: String,
    ) -> StorageResult<()> {
        let (reply, rx) = oneshot::channel();
        self.submit(StorageCommand::Add {
            username: username.to_string(),
            session_id: session_id.to_string(),
            message_list,
            reply,
        })?;
        rx.await.map_err(|_| StorageError::Closed)?
    }

    async fn get(&self, username: &str, session_id: &str) -> StorageResult<Vec<String>> {
        let (reply, rx) = oneshot::channel();
        self.submit(StorageCommand::Get {
            username: username.to_string(),
            session_id: session_id.to_string(),
            reply,
        })?;
        rx.await.map_err(|_| StorageError::Closed)?
    }
}

/// Main worker loop running in a dedicated thread.
fn storage_worker_loop(
    rx: Receiver<StorageCommand>,
    path: PathBuf,
    ready: oneshot::Sender<StorageResult<()>>,
) {
    let conn = match open(&path) {
        Ok(conn) => conn,
        Err(e) => {
            error!("[STORAGE] Failed to open database at {}: {}", path.display(), e);
            let _ = ready.send(Err(e));
            return;
        },
    };

    info!("[STORAGE] Database initialized at {}", path.display());
    if ready.send(Ok(())).is_err() {
        return;
    }

    while let Ok(command) = rx.recv() {
        match command {
            StorageCommand::Add {
                username,
                session_id,
                message_list,
                reply,
            } => {
                let result = insert(&conn, &username, &session_id, &message_list);
                if let Err(e) = &result {
                    error!("[STORAGE] Failed to insert messages: {}", e);
                }
                let _ = reply.send(result);
            },
            StorageCommand::Get {
                username,
                session_id,
                reply,
            } => {
                let _ = reply.send(select(&conn, &username, &session_id));
            },
            StorageCommand::Shutdown { reply } => {
                info!("[STORAGE] Worker shutdown requested");
                let _ = reply.send(());
                return;
            },
        }
    }

    info!("[STORAGE] Channel disconnected, worker exiting");
}

fn open(path: &Path) -> StorageResult<Connection> {
    let conn = Connection::open(path)?;
    conn.execute(CREATE_MESSAGES_TABLE, [])?;
    Ok(conn)
}

fn insert(
    conn: &Connection,
    username: &str,
    session_id: &str,
    message_list: &str,
) -> StorageResult<()> {
    conn.execute(
        "INSERT INTO messages (username, session_id, message_list) VALUES (?1, ?2, ?3)",
        params![username, session_id, message_list],
    )?;
    debug!("[STORAGE] Stored messages for {}/{}", username, session_id);
    Ok(())
}

fn select(conn: &Connection, username: &str, session_id: &str) -> StorageResult<Vec<String>> {
    let mut stmt = conn.prepare_cached(
        "SELECT message_list FROM messages WHERE username = ?1 AND session_id = ?2 ORDER BY id",
    )?;
    let rows = stmt.query_map(params![username, session_id], |row| row.get::<_, String>(0))?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn store() -> (SqliteMessageStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = SqliteMessageStore::connect(dir.path().join("messages.sqlite"))
            .await
            .unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn test_add_then_get_round_trips_in_order() {
        let (store, _dir) = store().await;

        store.add("alice", "s1", "[1]".to_string()).await.unwrap();
        store.add("alice", "s1", "[2]".to_string()).await.unwrap();
        store.add("alice", "s1", "[3]".to_string()).await.unwrap();

        let rows = store.get("alice", "s1").await.unwrap();
        assert_eq!(rows, vec!["[1]", "[2]", "[3]"]);
    }

    #[tokio::test]
    async fn test_other_session_is_empty() {
        let (store, _dir) = store().await;
        store.add("alice", "s1", "[1]".to_string()).await.unwrap();

        assert!(store.get("alice", "s2").await.unwrap().is_empty());
        assert!(store.get("bob", "s1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_adds_keep_submission_order() {
        let (store, _dir) = store().await;

        // join_all polls in order; each add submits its command on first poll
        let adds = (0..20).map(|i| store.add("alice", "s1", format!("[\"blob-{i}\"]")));
        for result in futures::future::join_all(adds).await {
            result.unwrap();
        }

        let rows = store.get("alice", "s1").await.unwrap();
        let expected: Vec<_> = (0..20).map(|i| format!("[\"blob-{i}\"]")).collect();
        assert_eq!(rows, expected);
    }

    #[tokio::test]
    async fn test_data_survives_reconnect() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("messages.sqlite");

        let store = SqliteMessageStore::connect(&path).await.unwrap();
        store.add("alice", "s1", "[1]".to_string()).await.unwrap();
        store.close().await;

        let store = SqliteMessageStore::connect(&path).await.unwrap();
        assert_eq!(store.get("alice", "s1").await.unwrap(), vec!["[1]"]);
    }

    #[tokio::test]
    async fn test_closed_store_rejects_commands() {
        let (store, _dir) = store().await;
        store.close().await;

        let err = store.add("alice", "s1", "[]".to_string()).await.unwrap_err();
        assert!(matches!(err, StorageError::Closed));
    }

    #[tokio::test]
    async fn test_open_failure_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing-dir").join("messages.sqlite");
        let result = SqliteMessageStore::connect(path).await;
        assert!(matches!(result, Err(StorageError::Sqlite(_))));
    }
}
