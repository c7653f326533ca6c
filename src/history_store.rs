//! Durable copy of the search history.
//!
//! The whole list lives in one JSON string under [`HISTORY_KEY`]. Readers never
//! fail on a bad record: unreadable storage or a corrupt value both read back
//! as an empty history.

use crate::error::StoreResult;
use crate::kv::KvBackend;
use crate::types::HistoryEntry;
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::Arc;
use tokio::sync::watch;

/// Name of the key-value namespace reserved for the history.
pub const HISTORY_NAMESPACE: &str = "pokemon_history_datastore";
/// Key holding the serialized history list.
pub const HISTORY_KEY: &str = "pokemon_search_history_list";

/// One emission of the store, tagged with the write revision it was read at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    pub revision: u64,
    pub entries: Vec<HistoryEntry>,
}

#[derive(Clone)]
pub struct HistoryStore {
    backend: Arc<dyn KvBackend>,
    // Bumped after every successful save/clear; wakes subscribers.
    revision: Arc<watch::Sender<u64>>,
}

impl HistoryStore {
    pub fn new(backend: Arc<dyn KvBackend>) -> Self {
        let (revision, _) = watch::channel(0u64);
        Self {
            backend,
            revision: Arc::new(revision),
        }
    }

    /// Number of successful writes made through this store.
    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    /// Stream of the persisted list: the current value first, then one item
    /// after each successful `save`/`clear`.
    ///
    /// Rapid writes may be observed as a single emission. A non-storage fault is
    /// yielded once as `Err` and ends the stream.
    pub fn observe(&self) -> BoxStream<'static, StoreResult<Vec<HistoryEntry>>> {
        self.observe_snapshots()
            .map(|item| item.map(|snap| snap.entries))
            .boxed()
    }

    /// Same as [`observe`](Self::observe) but keeps the revision of each read.
    ///
    /// Only writes made through this store or one of its clones wake the
    /// stream. Another process, or a second `HistoryStore::new` over the same
    /// database, writes unseen until the next subscription reads the record.
    pub fn observe_snapshots(&self) -> BoxStream<'static, StoreResult<Snapshot>> {
        let rx = self.revision.subscribe();
        let store = self.clone();
        stream::unfold(Some((store, rx, true)), |state| async move {
            let Some((store, mut rx, first)) = state else {
                return None;
            };
            if !first && rx.changed().await.is_err() {
                return None;
            }
            let revision = *rx.borrow_and_update();
            match store.load().await {
                Ok(entries) => Some((Ok(Snapshot { revision, entries }), Some((store, rx, false)))),
                Err(e) => Some((Err(e), None)),
            }
        })
        .boxed()
    }

    /// Read the persisted list once.
    pub async fn load(&self) -> StoreResult<Vec<HistoryEntry>> {
        let raw = match self.backend.get(HISTORY_KEY).await {
            Ok(raw) => raw,
            Err(e) if e.is_transient() => {
                log::debug!("[history_store] read failed, using empty history: {e}");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };
        let Some(raw) = raw else {
            return Ok(Vec::new());
        };
        match serde_json::from_str::<Vec<HistoryEntry>>(&raw) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                log::warn!("[history_store] discarding unreadable search history: {e}");
                Ok(Vec::new())
            }
        }
    }

    /// Replace the persisted list with `entries`.
    pub async fn save(&self, entries: &[HistoryEntry]) -> StoreResult<()> {
        let json = serde_json::to_string(entries)?;
        self.backend.put(HISTORY_KEY, json).await?;
        self.bump();
        Ok(())
    }

    /// Remove the persisted list.
    pub async fn clear(&self) -> StoreResult<()> {
        self.backend.remove(HISTORY_KEY).await?;
        self.bump();
        Ok(())
    }

    fn bump(&self) {
        self.revision.send_modify(|r| *r += 1);
    }
}
