//! Agent representation: `agent` nodes and `represent` edges from an agent table.
//!
//! Players are matched to athletes by exact name. A player with no athlete of
//! that name gets an id-less athlete node, which consolidation later folds
//! into the id-bearing athlete once that game is loaded.

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use sportsgraph_core::agency::{distinct_agents, AgentListing};
use sportsgraph_core::{NodeLabel, RelationType};

use crate::statement::{properties, NodeKey, Properties, ReadQuery, Statement};
use crate::store::GraphStore;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentReport {
    pub players: usize,
    /// Players with no athlete of that name before ingestion.
    pub athletes_created: usize,
    pub agents: usize,
    pub representations: usize,
    /// Players whose name matched more than one athlete.
    pub shared_names: Vec<String>,
}

/// Merge agents and their `represent` edges for every listing with at least one agent.
pub async fn ingest_agents<S: GraphStore + ?Sized>(
    store: &S,
    listings: &[AgentListing],
) -> Result<AgentReport> {
    let mut report = AgentReport::default();
    let mut athlete_nodes = Vec::new();
    let mut representations = Vec::new();

    for listing in listings.iter().filter(|l| !l.agents.is_empty()) {
        report.players += 1;
        let matches = store
            .fetch(&ReadQuery::AthletesByName(listing.player.clone()))
            .await
            .with_context(|| format!("Failed to look up athlete {:?}", listing.player))?;
        match matches.len() {
            0 => {
                debug!(player = %listing.player, "No athlete with this name, creating one");
                report.athletes_created += 1;
                athlete_nodes.push(name_node(NodeLabel::Athlete, &listing.player));
            }
            1 => {}
            n => {
                warn!(
                    player = %listing.player,
                    athletes = n,
                    "Several athletes share this name, representing all of them"
                );
                report.shared_names.push(listing.player.clone());
            }
        }

        for agent in &listing.agents {
            representations.push(Statement::MergeRelationship {
                relation: RelationType::Represent,
                from: NodeKey::by_name(NodeLabel::Agent, agent.as_str()),
                to: NodeKey::by_name(NodeLabel::Athlete, listing.player.as_str()),
                properties: Properties::new(),
            });
        }
    }

    let agents = distinct_agents(listings);
    report.agents = agents.len();
    report.representations = representations.len();

    let mut statements = athlete_nodes;
    statements.extend(agents.into_iter().map(|name| name_node(NodeLabel::Agent, name)));
    statements.extend(representations);

    if !statements.is_empty() {
        store
            .run(&statements)
            .await
            .context("Failed to write agent representations")?;
    }

    info!(
        players = report.players,
        agents = report.agents,
        representations = report.representations,
        athletes_created = report.athletes_created,
        "Agents ingested"
    );
    Ok(report)
}

/// `(agent, athlete)` name pairs, sorted.
pub async fn agent_athlete_pairs<S: GraphStore + ?Sized>(
    store: &S,
) -> Result<Vec<(String, String)>> {
    let records = store
        .fetch(&ReadQuery::AgentAthletePairs)
        .await
        .context("Failed to read agent representations")?;
    Ok(records
        .iter()
        .filter_map(|r| {
            Some((r.text("agent_name")?.to_string(), r.text("athlete_name")?.to_string()))
        })
        .collect())
}

fn name_node(label: NodeLabel, name: &str) -> Statement {
    Statement::MergeNode { label, properties: properties([("name", name)]) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consolidate::consolidate;
    use crate::statement::PropertyValue;
    use crate::store::MemoryStore;

    fn listing(player: &str, agents: &[&str]) -> AgentListing {
        AgentListing {
            player: player.to_string(),
            agents: agents.iter().map(|a| a.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_ingest_creates_agents_and_represent_edges() {
        let store = MemoryStore::new();
        let report = ingest_agents(
            &store,
            &[
                listing("LeBron James", &["Klutch Sports", "Rich Paul"]),
                listing("Anthony Davis", &["Klutch Sports"]),
                listing("Unsigned", &[]),
            ],
        )
        .await
        .unwrap();

        assert_eq!(report.players, 2);
        assert_eq!(report.athletes_created, 2);
        assert_eq!(report.agents, 2);
        assert_eq!(report.representations, 3);
        assert_eq!(store.nodes(NodeLabel::Agent).unwrap().len(), 2);
        assert_eq!(store.nodes(NodeLabel::Athlete).unwrap().len(), 2);

        let pairs = agent_athlete_pairs(&store).await.unwrap();
        assert_eq!(
            pairs,
            vec![
                ("Klutch Sports".to_string(), "Anthony Davis".to_string()),
                ("Klutch Sports".to_string(), "LeBron James".to_string()),
                ("Rich Paul".to_string(), "LeBron James".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_ingest_twice_is_idempotent() {
        let store = MemoryStore::new();
        let listings = [listing("LeBron James", &["Klutch Sports"])];
        ingest_agents(&store, &listings).await.unwrap();
        let once = store.counts().await.unwrap();

        let again = ingest_agents(&store, &listings).await.unwrap();
        assert_eq!(again.athletes_created, 0);
        assert_eq!(store.counts().await.unwrap(), once);
    }

    #[tokio::test]
    async fn test_existing_athlete_is_represented_not_duplicated() {
        let store = MemoryStore::new();
        store
            .run(&[Statement::MergeNode {
                label: NodeLabel::Athlete,
                properties: properties([
                    ("id", PropertyValue::Int(1966)),
                    ("name", "LeBron James".into()),
                ]),
            }])
            .await
            .unwrap();

        let report = ingest_agents(&store, &[listing("LeBron James", &["Klutch Sports"])])
            .await
            .unwrap();
        assert_eq!(report.athletes_created, 0);
        assert!(report.shared_names.is_empty());

        let athletes = store.nodes(NodeLabel::Athlete).unwrap();
        assert_eq!(athletes.len(), 1);
        let represents = store.relationships(RelationType::Represent).unwrap();
        assert_eq!(represents[0].to, athletes[0].element_id);
    }

    #[tokio::test]
    async fn test_name_only_athlete_folds_into_loaded_athlete() {
        let store = MemoryStore::new();
        ingest_agents(&store, &[listing("LeBron James", &["Klutch Sports"])])
            .await
            .unwrap();
        store
            .run(&[Statement::MergeNode {
                label: NodeLabel::Athlete,
                properties: properties([
                    ("id", PropertyValue::Int(1966)),
                    ("name", "LeBron James".into()),
                ]),
            }])
            .await
            .unwrap();

        consolidate(&store).await.unwrap();
        let athletes = store.nodes(NodeLabel::Athlete).unwrap();
        assert_eq!(athletes.len(), 1);
        assert_eq!(athletes[0].properties["id"], PropertyValue::Int(1966));
        assert_eq!(agent_athlete_pairs(&store).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_shared_name_is_reported() {
        let store = MemoryStore::new();
        store
            .run(&[
                Statement::MergeNode {
                    label: NodeLabel::Athlete,
                    properties: properties([
                        ("id", PropertyValue::Int(1)),
                        ("name", "Chris Smith".into()),
                    ]),
                },
                Statement::MergeNode {
                    label: NodeLabel::Athlete,
                    properties: properties([
                        ("id", PropertyValue::Int(2)),
                        ("name", "Chris Smith".into()),
                    ]),
                },
            ])
            .await
            .unwrap();

        let report = ingest_agents(&store, &[listing("Chris Smith", &["Agency"])])
            .await
            .unwrap();
        assert_eq!(report.shared_names, vec!["Chris Smith".to_string()]);
        assert_eq!(store.relationships(RelationType::Represent).unwrap().len(), 2);
    }
}
