//! Pokémon lookup over the public GraphQL endpoint.

use crate::types::{LookupOutcome, PokemonRecord};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_GRAPHQL_URL: &str = "https://graphql-pokeapi.graphcdn.app/";

const POKEMON_DETAIL_QUERY: &str = r#"query GetPokemonDetail($name: String!) {
  pokemon(name: $name) {
    name
    height
    weight
    sprites { front_default }
    types { type { name } }
  }
}"#;

/// Failures reported by the GraphQL server itself, as opposed to transport or
/// decoding failures (plain `anyhow` errors).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// First message of the response's `errors` array.
    #[error("{0}")]
    Graphql(String),
}

/// Lookup service consumed by the search flow.
#[async_trait]
pub trait PokemonLookup: Send + Sync {
    async fn lookup(&self, name: &str) -> Result<LookupOutcome>;
}

static HTTP: OnceLock<reqwest::Client> = OnceLock::new();

fn http_client() -> &'static reqwest::Client {
    HTTP.get_or_init(|| {
        reqwest::Client::builder()
            .pool_max_idle_per_host(4)
            .tcp_nodelay(true)
            .build()
            .unwrap_or_default()
    })
}

pub struct GraphqlLookup {
    url: String,
    timeout_ms: u64,
}

impl GraphqlLookup {
    pub fn new(url: impl Into<String>, timeout_ms: u64) -> Self {
        Self {
            url: url.into(),
            timeout_ms,
        }
    }
}

#[async_trait]
impl PokemonLookup for GraphqlLookup {
    async fn lookup(&self, name: &str) -> Result<LookupOutcome> {
        let body = json!({
            "operationName": "GetPokemonDetail",
            "query": POKEMON_DETAIL_QUERY,
            "variables": { "name": name },
        });

        log::debug!("[lookup] GetPokemonDetail name={name}");

        let res = http_client()
            .post(&self.url)
            .json(&body)
            .timeout(Duration::from_millis(self.timeout_ms))
            .send()
            .await
            .map_err(|e| anyhow!("request to {} failed: {}", self.url, e))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow!("http {status}: {text}"));
        }

        let v: Value = res
            .json()
            .await
            .map_err(|e| anyhow!("invalid GraphQL response: {}", e))?;
        parse_detail_response(&v)
    }
}

/// Interpret a `GetPokemonDetail` response body.
pub fn parse_detail_response(v: &Value) -> Result<LookupOutcome> {
    if let Some(errors) = v.get("errors").and_then(|e| e.as_array()) {
        if !errors.is_empty() {
            let msg = errors
                .first()
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .unwrap_or("Unknown error");
            log::warn!("[lookup] GraphQL error: {msg}");
            return Err(LookupError::Graphql(msg.to_string()).into());
        }
    }

    let pokemon = &v["data"]["pokemon"];
    let Some(name) = pokemon.get("name").and_then(|n| n.as_str()) else {
        return Ok(LookupOutcome::NotFound);
    };

    let types = pokemon["types"]
        .as_array()
        .map(|ts| {
            ts.iter()
                .filter_map(|t| t["type"]["name"].as_str())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Ok(LookupOutcome::Found(PokemonRecord {
        name: name.to_string(),
        height: pokemon["height"].as_i64(),
        weight: pokemon["weight"].as_i64(),
        sprite_url: pokemon["sprites"]["front_default"].as_str().map(str::to_string),
        types,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_found_pokemon() {
        let v = json!({
            "data": { "pokemon": {
                "name": "pikachu",
                "height": 4,
                "weight": 60,
                "sprites": { "front_default": "https://img/25.png" },
                "types": [ { "type": { "name": "electric" } }, null ]
            }}
        });
        let LookupOutcome::Found(p) = parse_detail_response(&v).unwrap() else {
            panic!("expected a record");
        };
        assert_eq!(p.name, "pikachu");
        assert_eq!(p.height, Some(4));
        assert_eq!(p.weight, Some(60));
        assert_eq!(p.sprite_url.as_deref(), Some("https://img/25.png"));
        assert_eq!(p.types, vec!["electric".to_string()]);
    }

    #[test]
    fn null_pokemon_is_not_found() {
        let v = json!({ "data": { "pokemon": null } });
        assert_eq!(parse_detail_response(&v).unwrap(), LookupOutcome::NotFound);

        // The API answers unknown names with a record full of nulls.
        let v = json!({ "data": { "pokemon": { "name": null, "sprites": null } } });
        assert_eq!(parse_detail_response(&v).unwrap(), LookupOutcome::NotFound);
    }

    #[test]
    fn graphql_errors_surface_first_message() {
        let v = json!({ "errors": [ { "message": "rate limited" }, { "message": "other" } ] });
        let err = parse_detail_response(&v).unwrap_err();
        assert_eq!(err.to_string(), "rate limited");
        assert_eq!(
            err.downcast_ref::<LookupError>(),
            Some(&LookupError::Graphql("rate limited".into()))
        );

        let v = json!({ "errors": [ {} ] });
        assert_eq!(parse_detail_response(&v).unwrap_err().to_string(), "Unknown error");
    }

    #[test]
    fn missing_sprite_gives_empty_history_sprite() {
        let v = json!({ "data": { "pokemon": { "name": "missingno", "sprites": null } } });
        let LookupOutcome::Found(p) = parse_detail_response(&v).unwrap() else {
            panic!("expected a record");
        };
        assert_eq!(p.history_entry().sprite_url, "");
    }
}
