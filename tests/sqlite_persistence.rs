//! SQLite persistence tests - history survives a restart

#![cfg(feature = "native")]

use pokedex::history_store::{HistoryStore, HISTORY_KEY, HISTORY_NAMESPACE};
use pokedex::kv::{KvBackend, SqliteKv};
use pokedex::{HistoryController, HistoryEntry};
use std::sync::Arc;

fn open_store(path: &str) -> HistoryStore {
    HistoryStore::new(Arc::new(SqliteKv::open(path, HISTORY_NAMESPACE).unwrap()))
}

#[tokio::test]
async fn history_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.db");
    let path = path.to_str().unwrap();

    {
        let history = HistoryController::start(open_store(path), 0);
        history.hydrated().await.unwrap();
        history.record_success(HistoryEntry::new("Pikachu", "u1"));
        history.record_success(HistoryEntry::new("Bulbasaur", "u2"));
        history.flush().await;
    }

    let history = HistoryController::start(open_store(path), 0);
    history.hydrated().await.unwrap();
    assert_eq!(
        history.snapshot(),
        vec![
            HistoryEntry::new("Bulbasaur", "u2"),
            HistoryEntry::new("Pikachu", "u1"),
        ]
    );
}

#[tokio::test]
async fn round_trip_keeps_order_and_content() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.db");
    let store = open_store(path.to_str().unwrap());

    for len in [0usize, 1, 5, 10] {
        let list: Vec<_> = (0..len)
            .map(|i| HistoryEntry::new(format!("Mon{i}"), format!("https://img/{i}.png")))
            .collect();
        store.save(&list).await.unwrap();
        assert_eq!(store.load().await.unwrap(), list);
    }
}

#[tokio::test]
async fn cleared_history_is_gone_after_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.db");
    let path = path.to_str().unwrap();

    {
        let history = HistoryController::start(open_store(path), 0);
        history.hydrated().await.unwrap();
        history.record_success(HistoryEntry::new("Mew", ""));
        history.clear();
        history.flush().await;
    }

    let kv = SqliteKv::open(path, HISTORY_NAMESPACE).unwrap();
    assert_eq!(kv.get(HISTORY_KEY).await.unwrap(), None);
}

#[tokio::test]
async fn malformed_record_reads_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.db");
    let path = path.to_str().unwrap();

    let kv = SqliteKv::open(path, HISTORY_NAMESPACE).unwrap();
    kv.put(HISTORY_KEY, "[{\"name\":".into()).await.unwrap();

    let history = HistoryController::start(open_store(path), 0);
    history.hydrated().await.unwrap();
    assert!(history.snapshot().is_empty());
}
