//! Recent-search history: bounded, deduplicated, newest first.
//!
//! The in-memory list is authoritative. Every mutation queues a best-effort
//! write of the full list to the [`HistoryStore`]; writes run one at a time on
//! a background task in the order the mutations happened.

use crate::error::StoreResult;
use crate::history_store::{HistoryStore, Snapshot};
use crate::types::{HistoryEntry, MAX_HISTORY_SIZE};
use anyhow::{anyhow, Result};
use futures::StreamExt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

#[cfg(feature = "native")]
use rand::{thread_rng, Rng};

/// Move `entry` to the front, dropping any entry with the same name (any case)
/// and the oldest entry beyond [`MAX_HISTORY_SIZE`].
pub fn push_recent(list: &mut Vec<HistoryEntry>, entry: HistoryEntry) {
    list.retain(|e| !e.same_name(&entry.name));
    list.insert(0, entry);
    list.truncate(MAX_HISTORY_SIZE);
}

/// Combine entries recorded before hydration with the stored list. Local entries
/// are newer, so they stay in front.
fn merge_hydrated(local: &[HistoryEntry], stored: Vec<HistoryEntry>) -> Vec<HistoryEntry> {
    let mut merged = local.to_vec();
    for entry in stored {
        if merged.len() >= MAX_HISTORY_SIZE {
            break;
        }
        if !merged.iter().any(|e| e.same_name(&entry.name)) {
            merged.push(entry);
        }
    }
    merged
}

fn bounded(mut stored: Vec<HistoryEntry>) -> Vec<HistoryEntry> {
    stored.truncate(MAX_HISTORY_SIZE);
    stored
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Hydration {
    Pending,
    Ready,
    /// The store subscription hit a non-storage fault.
    Failed(String),
}

enum PersistOp {
    Save(Vec<HistoryEntry>),
    Clear,
    Flush(oneshot::Sender<()>),
}

#[derive(Default)]
struct Shared {
    // Save/Clear ops queued but not yet attempted.
    pending: AtomicUsize,
    // Set once anything was recorded or cleared in this session.
    local_edits: AtomicBool,
    // Set by `clear`; the stored list no longer matters after that.
    cleared: AtomicBool,
}

pub struct HistoryController {
    history: Arc<watch::Sender<Vec<HistoryEntry>>>,
    hydration: Arc<watch::Sender<Hydration>>,
    shared: Arc<Shared>,
    ops: UnboundedSender<PersistOp>,
    tasks: Vec<JoinHandle<()>>,
}

impl HistoryController {
    /// Start the controller on the current tokio runtime.
    ///
    /// Spawns the store subscription (hydration) and the writer. Both are
    /// aborted when the controller is dropped. Writes wait until the first
    /// store emission has been merged so they cannot clobber a history that
    /// has not been read yet.
    pub fn start(store: HistoryStore, persist_retries: u8) -> Self {
        let (history, _) = watch::channel(Vec::<HistoryEntry>::new());
        let (hydration, _) = watch::channel(Hydration::Pending);
        let history = Arc::new(history);
        let hydration = Arc::new(hydration);
        let shared = Arc::new(Shared::default());
        let (ops, ops_rx) = unbounded_channel::<PersistOp>();

        let writer = tokio::spawn(run_writer(
            store.clone(),
            ops_rx,
            hydration.subscribe(),
            shared.clone(),
            persist_retries,
        ));
        let hydrator = tokio::spawn(run_hydration(
            store,
            history.clone(),
            hydration.clone(),
            shared.clone(),
            ops.clone(),
        ));

        Self {
            history,
            hydration,
            shared,
            ops,
            tasks: vec![writer, hydrator],
        }
    }

    /// Remember a successful lookup.
    ///
    /// Returns immediately; the write to the store happens in the background and
    /// a failed write leaves the in-memory list as is.
    pub fn record_success(&self, entry: HistoryEntry) {
        let shared = &self.shared;
        let ops = &self.ops;
        self.history.send_modify(|list| {
            push_recent(list, entry);
            shared.local_edits.store(true, Ordering::SeqCst);
            queue(shared, ops, PersistOp::Save(list.clone()));
        });
    }

    /// Empty the history now and remove the stored copy in the background.
    pub fn clear(&self) {
        let shared = &self.shared;
        let ops = &self.ops;
        self.history.send_modify(|list| {
            list.clear();
            shared.local_edits.store(true, Ordering::SeqCst);
            shared.cleared.store(true, Ordering::SeqCst);
            queue(shared, ops, PersistOp::Clear);
        });
    }

    /// Live view of the history. Each mutation marks the receiver changed.
    pub fn current_history(&self) -> watch::Receiver<Vec<HistoryEntry>> {
        self.history.subscribe()
    }

    pub fn snapshot(&self) -> Vec<HistoryEntry> {
        self.history.borrow().clone()
    }

    /// Wait for the first store emission to be merged.
    ///
    /// Errors if the store subscription failed with a non-storage fault; the
    /// controller keeps working in memory in that case.
    pub async fn hydrated(&self) -> Result<()> {
        let mut rx = self.hydration.subscribe();
        let state = rx
            .wait_for(|h| *h != Hydration::Pending)
            .await
            .map_err(|_| anyhow!("history controller stopped"))?
            .clone();
        match state {
            Hydration::Failed(msg) => Err(anyhow!(msg)),
            _ => Ok(()),
        }
    }

    /// Wait until every write queued so far has been attempted.
    pub async fn flush(&self) {
        let (resp_tx, resp_rx) = oneshot::channel();
        if self.ops.send(PersistOp::Flush(resp_tx)).is_err() {
            return;
        }
        let _ = resp_rx.await;
    }
}

impl Drop for HistoryController {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

fn queue(shared: &Shared, ops: &UnboundedSender<PersistOp>, op: PersistOp) {
    shared.pending.fetch_add(1, Ordering::SeqCst);
    if ops.send(op).is_err() {
        shared.pending.fetch_sub(1, Ordering::SeqCst);
        log::warn!("[history] writer stopped, change kept in memory only");
    }
}

async fn run_hydration(
    store: HistoryStore,
    history: Arc<watch::Sender<Vec<HistoryEntry>>>,
    hydration: Arc<watch::Sender<Hydration>>,
    shared: Arc<Shared>,
    ops: UnboundedSender<PersistOp>,
) {
    let mut snapshots = store.observe_snapshots();
    while let Some(item) = snapshots.next().await {
        let snap = match item {
            Ok(snap) => snap,
            Err(e) => {
                log::error!("[history] store subscription failed: {e}");
                hydration.send_replace(Hydration::Failed(e.to_string()));
                return;
            }
        };
        if *hydration.borrow() == Hydration::Pending {
            hydrate_first(&history, &shared, &ops, snap);
            hydration.send_replace(Hydration::Ready);
        } else {
            rehydrate(&store, &history, &shared, snap);
        }
    }
}

fn hydrate_first(
    history: &watch::Sender<Vec<HistoryEntry>>,
    shared: &Shared,
    ops: &UnboundedSender<PersistOp>,
    snap: Snapshot,
) {
    history.send_if_modified(|list| {
        if shared.cleared.load(Ordering::SeqCst) {
            // Queued ops already describe the final stored state.
            return false;
        }
        let next = if shared.local_edits.load(Ordering::SeqCst) {
            let merged = merge_hydrated(list, snap.entries);
            queue(shared, ops, PersistOp::Save(merged.clone()));
            merged
        } else {
            bounded(snap.entries)
        };
        log::debug!("[history] hydrated {} entries", next.len());
        if *list == next {
            return false;
        }
        *list = next;
        true
    });
}

// Later emissions only matter when someone else wrote the record. Skip them
// while our own writes are queued, or when the store moved on since the read.
fn rehydrate(
    store: &HistoryStore,
    history: &watch::Sender<Vec<HistoryEntry>>,
    shared: &Shared,
    snap: Snapshot,
) {
    history.send_if_modified(|list| {
        if shared.pending.load(Ordering::SeqCst) != 0 || store.revision() != snap.revision {
            return false;
        }
        let next = bounded(snap.entries);
        if *list == next {
            return false;
        }
        log::debug!("[history] store changed externally, reloading {} entries", next.len());
        *list = next;
        true
    });
}

async fn run_writer(
    store: HistoryStore,
    mut ops: UnboundedReceiver<PersistOp>,
    mut hydration: watch::Receiver<Hydration>,
    shared: Arc<Shared>,
    retries: u8,
) {
    if hydration.wait_for(|h| *h != Hydration::Pending).await.is_err() {
        return;
    }
    while let Some(op) = ops.recv().await {
        match op {
            PersistOp::Flush(resp) => {
                let _ = resp.send(());
            }
            op => {
                // Fire-and-forget: the outcome is logged and dropped.
                let _ = persist_with_backoff(&store, &op, retries).await;
                shared.pending.fetch_sub(1, Ordering::SeqCst);
            }
        }
    }
}

async fn persist_with_backoff(store: &HistoryStore, op: &PersistOp, max_retries: u8) -> StoreResult<()> {
    let label = match op {
        PersistOp::Save(_) => "save",
        _ => "clear",
    };
    let mut attempt = 0u8;
    loop {
        let res = match op {
            PersistOp::Save(list) => store.save(list).await,
            _ => store.clear().await,
        };
        match res {
            Ok(()) => return Ok(()),
            Err(e) if attempt < max_retries => {
                attempt += 1;
                let back_ms = backoff_delay_ms(attempt);
                log::warn!("[history] {label} failed retry={attempt} backoff={back_ms}ms : {e}");
                tokio::time::sleep(Duration::from_millis(back_ms)).await;
            }
            Err(e) => {
                log::warn!("[history] {label} failed, keeping in-memory history: {e}");
                return Err(e);
            }
        }
    }
}

fn backoff_delay_ms(attempt: u8) -> u64 {
    let base = 300u64.saturating_mul(1u64 << (attempt.clamp(1, 5) - 1)); // 300,600,1200,2400,4800
    #[cfg(feature = "native")]
    let jitter: u64 = thread_rng().gen_range(0..=250);
    #[cfg(not(feature = "native"))]
    let jitter: u64 = 0;
    base + jitter
}
