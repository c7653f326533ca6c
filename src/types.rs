use serde::{Deserialize, Serialize};

/// Maximum number of entries kept in the search history.
pub const MAX_HISTORY_SIZE: usize = 10;

/// One remembered successful search.
///
/// Names compare case-insensitively for deduplication (see [`HistoryEntry::same_name`])
/// but keep their original casing for display.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub name: String,
    #[serde(default)]
    pub sprite_url: String,
}

impl HistoryEntry {
    pub fn new(name: impl Into<String>, sprite_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sprite_url: sprite_url.into(),
        }
    }

    pub fn same_name(&self, other: &str) -> bool {
        self.name.to_lowercase() == other.to_lowercase()
    }
}

/// Record returned by the lookup service for an existing Pokémon.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PokemonRecord {
    pub name: String,
    pub height: Option<i64>,
    pub weight: Option<i64>,
    pub sprite_url: Option<String>,
    pub types: Vec<String>,
}

impl PokemonRecord {
    pub fn history_entry(&self) -> HistoryEntry {
        HistoryEntry::new(self.name.clone(), self.sprite_url.clone().unwrap_or_default())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LookupOutcome {
    Found(PokemonRecord),
    NotFound,
}

/// Display model for the detail view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PokemonDetail {
    pub name: String,
    pub height: i64,
    pub weight: i64,
    pub types: String,
    pub image_url: String,
}

impl From<&PokemonRecord> for PokemonDetail {
    fn from(p: &PokemonRecord) -> Self {
        PokemonDetail {
            name: p.name.clone(),
            height: p.height.unwrap_or(0),
            weight: p.weight.unwrap_or(0),
            types: p.types.join(", "),
            image_url: p.sprite_url.clone().unwrap_or_default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SearchState {
    Idle,
    Loading,
    /// `name` is the record's name when `exists`, otherwise the normalized query.
    Success { name: String, exists: bool },
    Error(String),
}
