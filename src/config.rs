use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};

use crate::lookup::DEFAULT_GRAPHQL_URL;

/// Pokédex - look up Pokémon and keep a short search history
///
/// Configuration priority: CLI args > Environment variables > Defaults
#[derive(Parser, Debug)]
#[command(name = "pokedex")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Pokémon lookup with a recent-search history", long_about = None)]
pub struct CliArgs {
    /// Path to the SQLite database holding the search history
    #[arg(long, env = "POKEDEX_DB_PATH")]
    pub db_path: Option<String>,

    /// GraphQL endpoint URL
    #[arg(long, env = "POKEDEX_GRAPHQL_URL")]
    pub graphql_url: Option<String>,

    /// Lookup request timeout in milliseconds (1000-60000)
    #[arg(long, env = "POKEDEX_TIMEOUT_MS")]
    pub timeout_ms: Option<u64>,

    /// Retries for a failed history write (0-5)
    #[arg(long, env = "POKEDEX_PERSIST_RETRIES")]
    pub persist_retries: Option<u8>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Check whether a Pokémon exists and remember it if it does
    Search { name: String },
    /// Show height, weight, types and sprite of a Pokémon
    Show { name: String },
    /// List recent searches, newest first
    History,
    /// Forget all recent searches
    Clear,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub db_path: String,
    pub graphql_url: String,
    pub timeout_ms: u64,
    pub persist_retries: u8,
}

/// Validate that a value is within a given range (inclusive)
fn validate_in_range<T>(val: T, min: T, max: T, name: &str) -> Result<T>
where
    T: PartialOrd + std::fmt::Display + Copy,
{
    if val < min || val > max {
        Err(anyhow!("{name} must be in range [{min}, {max}], got {val}"))
    } else {
        Ok(val)
    }
}

/// Validate URL format (basic check)
fn validate_url(url: &str, name: &str) -> Result<()> {
    if url.is_empty() {
        return Err(anyhow!("{name} cannot be empty"));
    }
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(anyhow!("{name} must start with http:// or https://"))
    }
}

impl Config {
    /// Build a validated config from parsed arguments.
    pub fn from_args(args: &CliArgs) -> Result<Config> {
        let db_path = args
            .db_path
            .clone()
            .unwrap_or_else(|| "./pokedex_history.db".to_string());
        if db_path.trim().is_empty() {
            return Err(anyhow!("POKEDEX_DB_PATH cannot be empty"));
        }

        let graphql_url = args
            .graphql_url
            .clone()
            .unwrap_or_else(|| DEFAULT_GRAPHQL_URL.to_string());
        validate_url(&graphql_url, "POKEDEX_GRAPHQL_URL")?;

        let timeout_ms = validate_in_range(
            args.timeout_ms.unwrap_or(8000),
            1000,
            60000,
            "POKEDEX_TIMEOUT_MS",
        )?;
        let persist_retries = validate_in_range(
            args.persist_retries.unwrap_or(0),
            0,
            5,
            "POKEDEX_PERSIST_RETRIES",
        )?;

        Ok(Config {
            db_path,
            graphql_url,
            timeout_ms,
            persist_retries,
        })
    }

    /// Print current configuration (useful for debugging)
    pub fn print_summary(&self) {
        eprintln!("Pokédex Configuration:");
        eprintln!("  Database: {}", self.db_path);
        eprintln!("  GraphQL URL: {}", self.graphql_url);
        eprintln!("  Timeout: {}ms", self.timeout_ms);
        eprintln!("  Persist Retries: {}", self.persist_retries);
    }
}

/// Load configuration from CLI args and environment variables
pub fn load() -> Result<(Config, Command)> {
    let args = CliArgs::parse();
    let cfg = Config::from_args(&args)?;
    Ok((cfg, args.command))
}
