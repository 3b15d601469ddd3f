//! Durable intermediate archive.
//!
//! Layout under the data directory:
//!
//! ```text
//! <data_dir>/<YYYY-MM-DD>/raw_events.json   completed events as fetched
//! <data_dir>/<YYYY-MM-DD>/<game_id>.json    one GraphSports per game
//! ```
//!
//! Graph files are the replay unit: re-loading them into the store is safe
//! because materialization is idempotent.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde_json::Value;
use tracing::debug;

use crate::error::SportsResult;
use crate::model::GraphSports;

/// File stem of the raw events document.
pub const RAW_EVENTS_STEM: &str = "raw_events";

/// Date-partitioned store of raw events and game graphs.
#[derive(Debug, Clone)]
pub struct Archive {
    root: PathBuf,
}

impl Archive {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding everything processed for `date`.
    pub fn day_dir(&self, date: NaiveDate) -> PathBuf {
        self.root.join(date.format("%Y-%m-%d").to_string())
    }

    pub fn raw_events_path(&self, date: NaiveDate) -> PathBuf {
        self.day_dir(date).join(format!("{RAW_EVENTS_STEM}.json"))
    }

    pub fn graph_path(&self, date: NaiveDate, game_id: i64) -> PathBuf {
        self.day_dir(date).join(format!("{game_id}.json"))
    }

    /// Write the raw events for a date.
    pub fn write_raw_events(&self, date: NaiveDate, events: &[Value]) -> SportsResult<PathBuf> {
        let path = self.raw_events_path(date);
        write_json(&path, &events)?;
        debug!(path = %path.display(), events = events.len(), "Wrote raw events");
        Ok(path)
    }

    /// Read the raw events previously written for a date.
    pub fn read_raw_events(&self, date: NaiveDate) -> SportsResult<Vec<Value>> {
        let text = fs::read_to_string(self.raw_events_path(date))?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Write one game graph; overwrites an earlier file for the same game.
    pub fn write_graph(&self, date: NaiveDate, graph: &GraphSports) -> SportsResult<PathBuf> {
        let path = self.graph_path(date, graph.game.id);
        write_json(&path, graph)?;
        debug!(path = %path.display(), "Wrote game graph");
        Ok(path)
    }

    /// Graph files for a date in file-name order, optionally only one game.
    pub fn graph_files(&self, date: NaiveDate, game_id: Option<i64>) -> SportsResult<Vec<PathBuf>> {
        let dir = self.day_dir(date);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let wanted = game_id.map(|id| id.to_string());
        let mut files = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if stem == RAW_EVENTS_STEM {
                continue;
            }
            if wanted.as_deref().is_some_and(|w| w != stem) {
                continue;
            }
            files.push(path);
        }
        files.sort();
        Ok(files)
    }

    /// Read and validate one graph file.
    pub fn read_graph(path: &Path) -> SportsResult<GraphSports> {
        let text = fs::read_to_string(path)?;
        let graph: GraphSports = serde_json::from_str(&text)?;
        graph.validate()?;
        Ok(graph)
    }
}

fn write_json<T: serde::Serialize + ?Sized>(path: &Path, value: &T) -> SportsResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SportsError;
    use crate::model::{Game, GraphSports};

    fn empty_game(id: i64) -> GraphSports {
        GraphSports {
            athletes: vec![],
            teams: vec![],
            game: Game::new(id, "A at B", "2025-02-21T00:00Z"),
            athlete_compete_in_game: vec![],
            athlete_compete_for_team: vec![],
            team_compete_in_game: vec![],
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 2, 21).unwrap()
    }

    #[test]
    fn test_graph_files_skip_raw_events() {
        let dir = tempfile::tempdir().unwrap();
        let archive = Archive::new(dir.path());

        archive.write_raw_events(date(), &[serde_json::json!({"id": "2"})]).unwrap();
        archive.write_graph(date(), &empty_game(2)).unwrap();
        archive.write_graph(date(), &empty_game(1)).unwrap();

        let files = archive.graph_files(date(), None).unwrap();
        assert_eq!(files, vec![archive.graph_path(date(), 1), archive.graph_path(date(), 2)]);
        assert_eq!(archive.read_raw_events(date()).unwrap().len(), 1);
    }

    #[test]
    fn test_graph_files_filtered_by_game() {
        let dir = tempfile::tempdir().unwrap();
        let archive = Archive::new(dir.path());
        archive.write_graph(date(), &empty_game(1)).unwrap();
        archive.write_graph(date(), &empty_game(2)).unwrap();

        let files = archive.graph_files(date(), Some(2)).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(Archive::read_graph(&files[0]).unwrap(), empty_game(2));
    }

    #[test]
    fn test_missing_day_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let archive = Archive::new(dir.path());
        assert!(archive.graph_files(date(), None).unwrap().is_empty());
        assert_eq!(archive.day_dir(date()), dir.path().join("2025-02-21"));
    }

    #[test]
    fn test_invalid_graph_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let archive = Archive::new(dir.path());
        let mut graph = empty_game(5);
        graph.team_compete_in_game.push(crate::model::TeamCompeteIn {
            from_node_id: 99,
            to_node_id: 5,
            relation_type: crate::model::RelationType::CompeteIn,
            home_or_away: crate::model::HomeAway::Away,
            is_winner: false,
        });
        let path = archive.write_graph(date(), &graph).unwrap();
        assert!(matches!(
            Archive::read_graph(&path),
            Err(SportsError::DanglingEdge { .. })
        ));
    }
}
