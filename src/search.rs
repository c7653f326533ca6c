//! Search flow: validate the query, look it up, remember hits.

use crate::history::HistoryController;
use crate::lookup::{LookupError, PokemonLookup};
use crate::types::{LookupOutcome, PokemonDetail, SearchState};
use anyhow::{anyhow, Result};
use std::sync::Arc;
use tokio::sync::watch;

pub struct Searcher {
    lookup: Arc<dyn PokemonLookup>,
    history: Arc<HistoryController>,
    state: watch::Sender<SearchState>,
}

impl Searcher {
    pub fn new(lookup: Arc<dyn PokemonLookup>, history: Arc<HistoryController>) -> Self {
        let (state, _) = watch::channel(SearchState::Idle);
        Self {
            lookup,
            history,
            state,
        }
    }

    pub fn state(&self) -> watch::Receiver<SearchState> {
        self.state.subscribe()
    }

    pub fn history(&self) -> &HistoryController {
        &self.history
    }

    /// Check whether `name` exists. Found Pokémon go to the front of the history.
    ///
    /// Returns the final state, which is also published on [`state`](Self::state).
    pub async fn check(&self, name: &str) -> SearchState {
        let query = name.trim().to_lowercase();
        if query.is_empty() {
            return self.publish(SearchState::Error("Search query cannot be empty.".into()));
        }

        self.state.send_replace(SearchState::Loading);
        log::debug!("[search] checking for Pokémon: {query}");

        match self.lookup.lookup(&query).await {
            Ok(LookupOutcome::Found(record)) => {
                self.history.record_success(record.history_entry());
                self.publish(SearchState::Success {
                    name: record.name,
                    exists: true,
                })
            }
            Ok(LookupOutcome::NotFound) => self.publish(SearchState::Success {
                name: query,
                exists: false,
            }),
            Err(e) => match e.downcast_ref::<LookupError>() {
                Some(LookupError::Graphql(msg)) => {
                    log::error!("[search] GraphQL error: {msg}");
                    self.publish(SearchState::Error(msg.clone()))
                }
                None => {
                    log::error!("[search] API error: {e:#}");
                    self.publish(SearchState::Error(format!("API Error: {e}")))
                }
            },
        }
    }

    /// Load the detail view for `name`. Does not touch the history.
    ///
    /// A GraphQL error carries no record, so it reads as not found; transport
    /// failures come back as `API error: <message>`.
    pub async fn detail(&self, name: &str) -> Result<PokemonDetail> {
        let outcome = match self.lookup.lookup(name.trim()).await {
            Ok(outcome) => outcome,
            Err(e) => match e.downcast_ref::<LookupError>() {
                Some(LookupError::Graphql(msg)) => {
                    log::warn!("[search] GraphQL error on detail: {msg}");
                    LookupOutcome::NotFound
                }
                None => return Err(anyhow!("API error: {e}")),
            },
        };
        match outcome {
            LookupOutcome::Found(record) => Ok(PokemonDetail::from(&record)),
            LookupOutcome::NotFound => Err(anyhow!("Pokémon not found.")),
        }
    }

    fn publish(&self, state: SearchState) -> SearchState {
        self.state.send_replace(state.clone());
        state
    }
}
