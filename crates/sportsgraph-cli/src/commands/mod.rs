//! CLI command definitions and handlers.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use tracing::info;

use sportsgraph_core::archive::Archive;
use sportsgraph_core::config::PipelineConfig;
use sportsgraph_graph::{GraphStore, MemoryStore, Neo4jStore};

pub mod graph;
pub mod pipeline;

/// Sportsgraph - sports events as a property graph
#[derive(Parser)]
#[command(name = "sportsgraph")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Root of the per-date archive (overrides the config file)
    #[arg(long, global = true, env = "SPORTSGRAPH_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Neo4j bolt URI
    #[arg(long, global = true, env = "NEO4J_URL")]
    pub neo4j_url: Option<String>,

    /// Neo4j user
    #[arg(long, global = true, env = "NEO4J_USERNAME")]
    pub neo4j_user: Option<String>,

    /// Neo4j password
    #[arg(long, global = true, env = "NEO4J_PASSWORD", hide_env_values = true)]
    pub neo4j_password: Option<String>,

    /// Neo4j database name
    #[arg(long, global = true, env = "NEO4J_DATABASE")]
    pub neo4j_database: Option<String>,

    /// Write to a throwaway in-memory graph instead of Neo4j
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Also write logs to daily files in this directory
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build game graphs from raw events into the archive
    Build {
        /// Processing date (defaults to yesterday)
        #[arg(short, long)]
        date: Option<NaiveDate>,

        /// Scoreboard document or array of events; defaults to the archived raw events
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Load archived game graphs into the store
    Load {
        /// Processing date (defaults to yesterday)
        #[arg(short, long)]
        date: Option<NaiveDate>,

        /// Load only this game
        #[arg(short, long)]
        game: Option<i64>,
    },

    /// Build then load
    Run {
        /// Processing date (defaults to yesterday)
        #[arg(short, long)]
        date: Option<NaiveDate>,

        /// Scoreboard document or array of events; defaults to the archived raw events
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Merge duplicate athletes and team abbreviation variants
    Consolidate,

    /// Add agents and their represent edges from an agent table
    Agents {
        /// JSON array of {"player", "agents"} rows
        file: PathBuf,
    },

    /// List agent/athlete representation pairs
    Pairs {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show node and relationship counts
    Status,

    /// Create store indexes
    Schema,
}

/// Resolved settings shared by every command.
pub struct Context {
    pub config: PipelineConfig,
    pub dry_run: bool,
}

impl Context {
    pub fn archive(&self) -> Archive {
        Archive::new(&self.config.data_dir)
    }

    /// Connect to the configured store, or an empty in-memory one for dry runs.
    pub async fn open_store(&self) -> Result<Box<dyn GraphStore>> {
        if self.dry_run {
            info!("Dry run: writing to an in-memory graph");
            return Ok(Box::new(MemoryStore::new()));
        }

        let store = Neo4jStore::connect(&self.config.store)
            .await
            .with_context(|| format!("Cannot reach Neo4j at {}", self.config.store.uri))?;
        info!(
            uri = %self.config.store.uri,
            database = %self.config.store.database,
            "Connected to Neo4j"
        );
        Ok(Box::new(store))
    }
}

/// Yesterday in local time, the day whose games are complete.
fn default_date() -> NaiveDate {
    Local::now().date_naive() - chrono::Duration::days(1)
}

impl Cli {
    fn context(&self) -> Result<Context> {
        let mut config = PipelineConfig::load(self.config.as_deref())?;

        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(uri) = &self.neo4j_url {
            config.store.uri = uri.clone();
        }
        if let Some(user) = &self.neo4j_user {
            config.store.user = user.clone();
        }
        if let Some(password) = &self.neo4j_password {
            config.store.password = password.clone();
        }
        if let Some(database) = &self.neo4j_database {
            config.store.database = database.clone();
        }

        Ok(Context { config, dry_run: self.dry_run })
    }

    pub async fn execute(self) -> Result<()> {
        let ctx = self.context()?;

        match self.command {
            Commands::Build { date, input } => {
                let date = date.unwrap_or_else(default_date);
                pipeline::build(&ctx, date, input.as_deref()).map(|_| ())
            }
            Commands::Load { date, game } => {
                pipeline::load(&ctx, date.unwrap_or_else(default_date), game).await
            }
            Commands::Run { date, input } => {
                pipeline::run(&ctx, date.unwrap_or_else(default_date), input.as_deref()).await
            }
            Commands::Consolidate => graph::consolidate(&ctx).await,
            Commands::Agents { file } => graph::agents(&ctx, &file).await,
            Commands::Pairs { json } => graph::pairs(&ctx, json).await,
            Commands::Status => graph::status(&ctx).await,
            Commands::Schema => graph::schema(&ctx).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from([
            "sportsgraph",
            "--neo4j-url",
            "bolt://graph:7687",
            "--data-dir",
            "/tmp/games",
            "status",
        ]);
        let ctx = cli.context().unwrap();
        assert_eq!(ctx.config.store.uri, "bolt://graph:7687");
        assert_eq!(ctx.config.data_dir, PathBuf::from("/tmp/games"));
    }

    #[test]
    fn test_date_argument_parses() {
        let cli = Cli::parse_from(["sportsgraph", "load", "--date", "2025-01-05", "--game", "401"]);
        match cli.command {
            Commands::Load { date, game } => {
                assert_eq!(date, NaiveDate::from_ymd_opt(2025, 1, 5));
                assert_eq!(game, Some(401));
            }
            _ => panic!("expected load"),
        }
    }
}
