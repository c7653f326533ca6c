// Native binary for Pokédex - terminal lookup + search history

use anyhow::{anyhow, Context, Result};
use std::sync::Arc;

use pokedex::{
    config::{load, Command},
    history::HistoryController,
    history_store::{HistoryStore, HISTORY_NAMESPACE},
    kv::SqliteKv,
    lookup::GraphqlLookup,
    search::Searcher,
    HistoryEntry, PokemonDetail, SearchState,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (safe to ignore if not found)
    let _ = dotenvy::dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let (cfg, command) = load().context("Failed to load configuration")?;
    if log::log_enabled!(log::Level::Debug) {
        cfg.print_summary();
    }

    let kv = SqliteKv::open(&cfg.db_path, HISTORY_NAMESPACE)
        .with_context(|| format!("Failed to open history database at {}", cfg.db_path))?;
    let history = Arc::new(HistoryController::start(
        HistoryStore::new(Arc::new(kv)),
        cfg.persist_retries,
    ));
    history
        .hydrated()
        .await
        .context("Failed to read search history")?;

    let lookup = Arc::new(GraphqlLookup::new(cfg.graphql_url.clone(), cfg.timeout_ms));
    let searcher = Searcher::new(lookup, history.clone());

    let outcome = tokio::select! {
        res = run(&searcher, command) => res,
        _ = tokio::signal::ctrl_c() => {
            log::warn!("interrupted, saving search history before exit");
            Ok(())
        }
    };
    // Let queued history writes land before the runtime shuts down.
    history.flush().await;
    outcome
}

async fn run(searcher: &Searcher, command: Command) -> Result<()> {
    match command {
        Command::Search { name } => match searcher.check(&name).await {
            SearchState::Success { name, exists: true } => println!("{name}: found"),
            SearchState::Success { name, exists: false } => println!("{name}: not found"),
            SearchState::Error(msg) => return Err(anyhow!(msg)),
            SearchState::Idle | SearchState::Loading => {}
        },
        Command::Show { name } => print_detail(&searcher.detail(&name).await?),
        Command::History => print_history(&searcher.history().snapshot()),
        Command::Clear => {
            searcher.history().clear();
            println!("Search history cleared");
        }
    }
    Ok(())
}

fn print_detail(d: &PokemonDetail) {
    println!("{}", d.name);
    println!("  Height: {}", d.height);
    println!("  Weight: {}", d.weight);
    println!("  Types:  {}", d.types);
    if !d.image_url.is_empty() {
        println!("  Sprite: {}", d.image_url);
    }
}

fn print_history(entries: &[HistoryEntry]) {
    if entries.is_empty() {
        println!("No recent searches");
        return;
    }
    for (i, e) in entries.iter().enumerate() {
        if e.sprite_url.is_empty() {
            println!("{:>2}. {}", i + 1, e.name);
        } else {
            println!("{:>2}. {}  {}", i + 1, e.name, e.sprite_url);
        }
    }
}
