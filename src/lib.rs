//! Pokédex - Pokémon lookup with a persistent recent-search history
//!
//! The core is the search history: a bounded, case-insensitively deduplicated,
//! most-recently-used list that is mirrored to a key-value store in the
//! background and reloaded on startup.
//!
//! ## Architecture
//!
//! - [`history::HistoryController`] owns the live list and queues writes
//! - [`history_store::HistoryStore`] keeps the serialized copy behind a reactive read
//! - [`kv`] provides the durable backends (SQLite on native, in-memory everywhere)
//! - [`lookup`] and [`search`] connect the GraphQL lookup to the history
//!
//! ## Usage
//!
//! ```bash
//! cargo run -- search pikachu
//! cargo run -- history
//! ```

pub mod config;
pub mod error;
pub mod history;
pub mod history_store;
pub mod kv;
pub mod lookup;
pub mod search;
pub mod types;

// Re-export commonly used types
pub use config::{Command, Config};
pub use error::{StoreError, StoreResult};
pub use history::HistoryController;
pub use history_store::HistoryStore;
pub use types::{HistoryEntry, PokemonDetail, SearchState, MAX_HISTORY_SIZE};
