//! Pipeline configuration.
//!
//! Values come from built-in defaults, then an optional TOML file. The CLI
//! applies environment and flag overrides on top before handing the struct
//! to the store.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{SportsError, SportsResult};

/// Connection settings for the Neo4j graph store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
    pub database: String,
    pub max_connections: usize,
    pub fetch_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            uri: "bolt://localhost:7687".to_string(),
            user: "neo4j".to_string(),
            password: "neo4j".to_string(),
            database: "neo4j".to_string(),
            max_connections: 4,
            fetch_size: 200,
        }
    }
}

/// Full pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub store: StoreConfig,
    /// Root of the per-date archive of raw events and game graphs.
    pub data_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            data_dir: PathBuf::from("data"),
        }
    }
}

impl PipelineConfig {
    /// Parse from TOML text; absent keys keep their defaults.
    pub fn from_toml_str(text: &str) -> SportsResult<Self> {
        toml::from_str(text).map_err(|e| SportsError::Config(e.to_string()))
    }

    /// Load from a TOML file, or defaults when no path is given.
    pub fn load(path: Option<&Path>) -> SportsResult<Self> {
        match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| {
                    SportsError::Config(format!("cannot read {}: {}", path.display(), e))
                })?;
                Self::from_toml_str(&text)
            }
            None => Ok(Self::default()),
        }
    }
}
