//! Search flow tests - query validation, lookup outcomes and history feed

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use pokedex::history_store::HistoryStore;
use pokedex::kv::MemoryKv;
use pokedex::lookup::{parse_detail_response, PokemonLookup};
use pokedex::search::Searcher;
use pokedex::types::{LookupOutcome, PokemonRecord};
use pokedex::{HistoryController, HistoryEntry, SearchState};
use serde_json::json;
use std::sync::{Arc, Mutex};

/// Lookup that knows a fixed roster and records every query it receives.
struct FakeLookup {
    queries: Mutex<Vec<String>>,
    fail: bool,
}

impl FakeLookup {
    fn new() -> Self {
        Self {
            queries: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    fn failing() -> Self {
        Self {
            queries: Mutex::new(Vec::new()),
            fail: true,
        }
    }
}

#[async_trait]
impl PokemonLookup for FakeLookup {
    async fn lookup(&self, name: &str) -> Result<LookupOutcome> {
        self.queries.lock().unwrap().push(name.to_string());
        if self.fail {
            return Err(anyhow!("connection refused"));
        }
        let record = |name: &str, sprite: Option<&str>, types: &[&str]| PokemonRecord {
            name: name.to_string(),
            height: Some(4),
            weight: Some(60),
            sprite_url: sprite.map(str::to_string),
            types: types.iter().map(|t| t.to_string()).collect(),
        };
        Ok(match name {
            "pikachu" => LookupOutcome::Found(record("pikachu", Some("u1"), &["electric"])),
            "bulbasaur" => {
                LookupOutcome::Found(record("bulbasaur", None, &["grass", "poison"]))
            }
            _ => LookupOutcome::NotFound,
        })
    }
}

/// Lookup whose server answers every query with a GraphQL `errors` body.
struct RateLimitedLookup;

#[async_trait]
impl PokemonLookup for RateLimitedLookup {
    async fn lookup(&self, _name: &str) -> Result<LookupOutcome> {
        parse_detail_response(&json!({ "errors": [ { "message": "rate limited" } ] }))
    }
}

async fn searcher(lookup: Arc<dyn PokemonLookup>) -> Searcher {
    let history = HistoryController::start(HistoryStore::new(Arc::new(MemoryKv::new())), 0);
    history.hydrated().await.unwrap();
    Searcher::new(lookup, Arc::new(history))
}

#[tokio::test]
async fn found_pokemon_is_recorded() {
    let lookup = Arc::new(FakeLookup::new());
    let s = searcher(lookup.clone()).await;

    let state = s.check("  PiKaChu ").await;
    assert_eq!(
        state,
        SearchState::Success {
            name: "pikachu".into(),
            exists: true
        }
    );
    assert_eq!(*s.state().borrow(), state);
    assert_eq!(lookup.queries.lock().unwrap().as_slice(), ["pikachu"]);
    assert_eq!(s.history().snapshot(), vec![HistoryEntry::new("pikachu", "u1")]);
}

#[tokio::test]
async fn missing_sprite_is_recorded_empty() {
    let s = searcher(Arc::new(FakeLookup::new())).await;
    s.check("bulbasaur").await;
    assert_eq!(s.history().snapshot(), vec![HistoryEntry::new("bulbasaur", "")]);
}

#[tokio::test]
async fn unknown_pokemon_is_not_recorded() {
    let s = searcher(Arc::new(FakeLookup::new())).await;
    let state = s.check("Agumon").await;
    assert_eq!(
        state,
        SearchState::Success {
            name: "agumon".into(),
            exists: false
        }
    );
    assert!(s.history().snapshot().is_empty());
}

#[tokio::test]
async fn empty_query_is_rejected_without_lookup() {
    let lookup = Arc::new(FakeLookup::new());
    let s = searcher(lookup.clone()).await;
    let state = s.check("   ").await;
    assert_eq!(
        state,
        SearchState::Error("Search query cannot be empty.".into())
    );
    assert!(lookup.queries.lock().unwrap().is_empty());
}

#[tokio::test]
async fn lookup_error_becomes_error_state() {
    let s = searcher(Arc::new(FakeLookup::failing())).await;
    let state = s.check("pikachu").await;
    assert_eq!(
        state,
        SearchState::Error("API Error: connection refused".into())
    );
    assert!(s.history().snapshot().is_empty());

    let err = s.detail("pikachu").await.unwrap_err();
    assert_eq!(err.to_string(), "API error: connection refused");
}

#[tokio::test]
async fn graphql_error_message_is_shown_as_is() {
    let s = searcher(Arc::new(RateLimitedLookup)).await;
    let state = s.check("pikachu").await;
    assert_eq!(state, SearchState::Error("rate limited".into()));
    assert!(s.history().snapshot().is_empty());

    let err = s.detail("pikachu").await.unwrap_err();
    assert_eq!(err.to_string(), "Pokémon not found.");
}

#[tokio::test]
async fn detail_joins_types_and_reports_missing() {
    let s = searcher(Arc::new(FakeLookup::new())).await;

    let d = s.detail("bulbasaur").await.unwrap();
    assert_eq!(d.types, "grass, poison");
    assert_eq!(d.image_url, "");
    assert!(s.history().snapshot().is_empty());

    let err = s.detail("agumon").await.unwrap_err();
    assert_eq!(err.to_string(), "Pokémon not found.");
}
