//! Agent representation table.
//!
//! Pairs a player's display name with the names of the agents or agencies
//! representing them. Players are matched to athlete nodes by exact name.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SportsResult;

/// One row of the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentListing {
    pub player: String,
    #[serde(default)]
    pub agents: Vec<String>,
}

/// Read a JSON array of listings.
pub fn read_agent_table(path: &Path) -> SportsResult<Vec<AgentListing>> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Distinct agent names across all listings, sorted.
pub fn distinct_agents(listings: &[AgentListing]) -> BTreeSet<&str> {
    listings
        .iter()
        .flat_map(|l| l.agents.iter().map(String::as_str))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distinct_agents() {
        let listings: Vec<AgentListing> = serde_json::from_value(serde_json::json!([
            {"player": "LeBron James", "agents": ["Klutch Sports", "Rich Paul"]},
            {"player": "Anthony Davis", "agents": ["Klutch Sports"]},
            {"player": "Nobody"}
        ]))
        .unwrap();

        let agents: Vec<_> = distinct_agents(&listings).into_iter().collect();
        assert_eq!(agents, vec!["Klutch Sports", "Rich Paul"]);
        assert!(listings[2].agents.is_empty());
    }
}
