//! Graph materialization: upserting a [`GraphSports`] into a store.
//!
//! A [`WritePlan`] is the only way to turn a game graph into statements. It
//! validates the graph, then lays out every node merge ahead of every edge
//! merge, and the whole plan runs as one store session. Edge statements
//! fail the session when an endpoint is missing instead of silently
//! matching nothing.
//!
//! Node merges key on every declared attribute. Edges are encoded per type:
//!
//! - athlete `compete_in` game: one relationship property per statistic
//! - athlete `compete_for` team: matched by endpoints, tracks a date span
//! - team `compete_in` game: keyed on `home_or_away` and `is_winner`

use anyhow::{Context, Result};
use tracing::{debug, info};

use sportsgraph_core::model::{
    AthleteCompeteFor, AthleteCompeteIn, EdgeRef, NodeRef, TeamCompeteIn,
};
use sportsgraph_core::{GraphSports, NodeLabel, RelationType};

use crate::statement::{properties, NodeKey, Properties, PropertyValue, Statement};
use crate::store::{GraphStore, StoreError};

/// Ordered statements for one game: all nodes, then all edges.
#[derive(Debug, Clone)]
pub struct WritePlan {
    game_id: i64,
    nodes: Vec<Statement>,
    edges: Vec<Statement>,
}

impl WritePlan {
    /// Validate the graph and lay out its statements.
    pub fn for_graph(graph: &GraphSports) -> Result<Self, StoreError> {
        graph.validate()?;
        Ok(Self {
            game_id: graph.game.id,
            nodes: graph.nodes().map(node_statement).collect(),
            edges: graph.edges().map(edge_statement).collect(),
        })
    }

    pub fn game_id(&self) -> i64 {
        self.game_id
    }

    pub fn node_statements(&self) -> &[Statement] {
        &self.nodes
    }

    pub fn edge_statements(&self) -> &[Statement] {
        &self.edges
    }

    /// Node statements followed by edge statements.
    pub fn into_statements(self) -> Vec<Statement> {
        let mut statements = self.nodes;
        statements.extend(self.edges);
        statements
    }
}

/// Merge statement for one node, keyed on all of its attributes.
pub fn node_statement(node: NodeRef<'_>) -> Statement {
    let properties = match node {
        NodeRef::Game(g) => properties([
            ("id", PropertyValue::Int(g.id)),
            ("label", g.label.as_str().into()),
            ("name", g.name.as_str().into()),
            ("date", g.date.as_str().into()),
        ]),
        NodeRef::Team(t) => properties([
            ("id", PropertyValue::Int(t.id)),
            ("label", t.label.as_str().into()),
            ("name", t.name.as_str().into()),
            ("name_short", t.name_short.as_str().into()),
        ]),
        NodeRef::Athlete(a) => properties([
            ("id", PropertyValue::Int(a.id)),
            ("label", a.label.as_str().into()),
            ("name", a.name.as_str().into()),
            ("name_short", a.name_short.as_str().into()),
        ]),
    };
    Statement::MergeNode { label: node.label(), properties }
}

/// Merge statement for one edge, chosen by edge type.
pub fn edge_statement(edge: EdgeRef<'_>) -> Statement {
    match edge {
        EdgeRef::AthleteCompeteIn(e) => athlete_game_statement(e),
        EdgeRef::AthleteCompeteFor(e) => tenure_statement(e),
        EdgeRef::TeamCompeteIn(e) => team_game_statement(e),
    }
}

/// Each statistic becomes its own relationship property.
fn athlete_game_statement(edge: &AthleteCompeteIn) -> Statement {
    let properties: Properties = edge
        .stats
        .iter()
        .map(|(name, value)| (name.to_string(), PropertyValue::from(value)))
        .collect();
    Statement::MergeRelationship {
        relation: RelationType::CompeteIn,
        from: NodeKey::by_id(NodeLabel::Athlete, edge.from_node_id),
        to: NodeKey::by_id(NodeLabel::Game, edge.to_node_id),
        properties,
    }
}

fn tenure_statement(edge: &AthleteCompeteFor) -> Statement {
    Statement::MergeTenure {
        athlete_id: edge.from_node_id,
        team_id: edge.to_node_id,
        jersey: edge.jersey,
        date: edge.date.clone(),
    }
}

fn team_game_statement(edge: &TeamCompeteIn) -> Statement {
    Statement::MergeRelationship {
        relation: RelationType::CompeteIn,
        from: NodeKey::by_id(NodeLabel::Team, edge.from_node_id),
        to: NodeKey::by_id(NodeLabel::Game, edge.to_node_id),
        properties: properties([
            ("home_or_away", PropertyValue::from(edge.home_or_away.as_str())),
            ("is_winner", PropertyValue::Bool(edge.is_winner)),
        ]),
    }
}

/// Summary of one materialized game.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaterializeReport {
    pub game_id: i64,
    pub nodes_merged: usize,
    pub relationships_merged: usize,
}

/// Writes game graphs into a store.
pub struct Materializer<'a, S: GraphStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: GraphStore + ?Sized> Materializer<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Upsert one game graph in a single store session.
    ///
    /// Re-applying the same graph leaves the store unchanged apart from the
    /// `compete_for` `last_date`, which only moves forward. A failed call can
    /// be retried by applying the same graph again.
    pub async fn materialize(&self, graph: &GraphSports) -> Result<MaterializeReport> {
        let plan = WritePlan::for_graph(graph)?;
        let game_id = plan.game_id();
        let nodes_merged = plan.node_statements().len();
        let relationships_merged = plan.edge_statements().len();

        debug!(game_id, nodes = nodes_merged, edges = relationships_merged, "Materializing game");
        self.store
            .run(&plan.into_statements())
            .await
            .with_context(|| format!("Failed to materialize game {game_id}"))?;

        info!(
            game_id,
            nodes = nodes_merged,
            relationships = relationships_merged,
            "Game materialized"
        );
        Ok(MaterializeReport { game_id, nodes_merged, relationships_merged })
    }

    /// Materialize games one after another, stopping at the first failure.
    pub async fn materialize_all<'g, I>(&self, graphs: I) -> Result<Vec<MaterializeReport>>
    where
        I: IntoIterator<Item = &'g GraphSports>,
    {
        let mut reports = Vec::new();
        for graph in graphs {
            reports.push(self.materialize(graph).await?);
        }
        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use sportsgraph_core::model::{
        Athlete, AthleteCompeteFor, Game, HomeAway, StatLine, StatValue, Team,
    };

    fn game_graph(game_id: i64, date: &str, stats: StatLine) -> GraphSports {
        GraphSports {
            athletes: vec![Athlete::new(1966, "LeBron James", "L. James")],
            teams: vec![Team::new(13, "Los Angeles Lakers", "LAL")],
            game: Game::new(game_id, format!("Game {game_id}"), date),
            athlete_compete_in_game: vec![AthleteCompeteIn {
                from_node_id: 1966,
                to_node_id: game_id,
                relation_type: RelationType::CompeteIn,
                stats,
            }],
            athlete_compete_for_team: vec![AthleteCompeteFor {
                from_node_id: 1966,
                to_node_id: 13,
                relation_type: RelationType::CompeteFor,
                date: date.to_string(),
                jersey: 23,
            }],
            team_compete_in_game: vec![TeamCompeteIn {
                from_node_id: 13,
                to_node_id: game_id,
                relation_type: RelationType::CompeteIn,
                home_or_away: HomeAway::Home,
                is_winner: true,
            }],
        }
    }

    fn points_and_rebounds() -> StatLine {
        [("points", StatValue::Int(30)), ("rebounds", StatValue::Int(10))]
            .into_iter()
            .collect()
    }

    #[test]
    fn test_plan_puts_nodes_before_edges() {
        let graph = game_graph(1, "2025-01-01", points_and_rebounds());
        let plan = WritePlan::for_graph(&graph).unwrap();
        assert_eq!(plan.node_statements().len(), 3);
        assert_eq!(plan.edge_statements().len(), 3);

        let statements = plan.into_statements();
        let first_edge = statements
            .iter()
            .position(|s| !matches!(s, Statement::MergeNode { .. }))
            .unwrap();
        assert!(statements[first_edge..]
            .iter()
            .all(|s| !matches!(s, Statement::MergeNode { .. })));
    }

    #[test]
    fn test_invalid_graph_rejected_before_writing() {
        let mut graph = game_graph(1, "2025-01-01", points_and_rebounds());
        graph.athlete_compete_for_team[0].to_node_id = 404;
        assert!(matches!(WritePlan::for_graph(&graph), Err(StoreError::InvalidGraph(_))));
    }

    #[test]
    fn test_node_merge_keys_include_type_specific_fields() {
        let graph = game_graph(1, "2025-01-01", points_and_rebounds());
        match node_statement(NodeRef::Game(&graph.game)) {
            Statement::MergeNode { label, properties } => {
                assert_eq!(label, NodeLabel::Game);
                let keys: Vec<_> = properties.keys().map(String::as_str).collect();
                assert_eq!(keys, vec!["date", "id", "label", "name"]);
            }
            other => panic!("unexpected statement {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_stats_become_relationship_properties() {
        let store = MemoryStore::new();
        let graph = game_graph(1, "2025-01-01", points_and_rebounds());
        Materializer::new(&store).materialize(&graph).await.unwrap();

        let rels = store.relationships(RelationType::CompeteIn).unwrap();
        let athlete_game = rels
            .iter()
            .find(|r| !r.properties.contains_key("home_or_away"))
            .unwrap();
        let expected = properties([("points", 30i64), ("rebounds", 10i64)]);
        assert_eq!(athlete_game.properties, expected);
        assert!(!athlete_game.properties.contains_key("stats"));
    }

    #[tokio::test]
    async fn test_reapplying_graph_is_idempotent() {
        let store = MemoryStore::new();
        let materializer = Materializer::new(&store);
        let graph = game_graph(1, "2025-01-01", points_and_rebounds());

        materializer.materialize(&graph).await.unwrap();
        let once = store.counts().await.unwrap();
        let tenure_once = store.relationships(RelationType::CompeteFor).unwrap();

        materializer.materialize(&graph).await.unwrap();
        assert_eq!(store.counts().await.unwrap(), once);
        assert_eq!(store.relationships(RelationType::CompeteFor).unwrap(), tenure_once);
        assert_eq!(once.nodes, 3);
        assert_eq!(once.relationships, 3);
    }

    #[tokio::test]
    async fn test_tenure_dates_accumulate_across_games() {
        let store = MemoryStore::new();
        let materializer = Materializer::new(&store);

        materializer
            .materialize(&game_graph(1, "2025-01-01", points_and_rebounds()))
            .await
            .unwrap();
        materializer
            .materialize(&game_graph(2, "2025-01-05", points_and_rebounds()))
            .await
            .unwrap();

        let tenures = store.relationships(RelationType::CompeteFor).unwrap();
        assert_eq!(tenures.len(), 1);
        assert_eq!(tenures[0].properties["first_date"], PropertyValue::from("2025-01-01"));
        assert_eq!(tenures[0].properties["last_date"], PropertyValue::from("2025-01-05"));
        assert_eq!(tenures[0].properties["jersey"], PropertyValue::Int(23));
    }

    #[tokio::test]
    async fn test_reapplying_with_later_date_only_advances_last_date() {
        let store = MemoryStore::new();
        let materializer = Materializer::new(&store);
        let mut graph = game_graph(1, "2025-01-01", points_and_rebounds());
        materializer.materialize(&graph).await.unwrap();
        let before = store.counts().await.unwrap();

        graph.athlete_compete_for_team[0].date = "2025-01-09".to_string();
        graph.athlete_compete_for_team[0].jersey = 6;
        materializer.materialize(&graph).await.unwrap();

        assert_eq!(store.counts().await.unwrap(), before);
        let tenure = &store.relationships(RelationType::CompeteFor).unwrap()[0];
        assert_eq!(tenure.properties["first_date"], PropertyValue::from("2025-01-01"));
        assert_eq!(tenure.properties["last_date"], PropertyValue::from("2025-01-09"));
        assert_eq!(tenure.properties["jersey"], PropertyValue::Int(23));
    }

    #[tokio::test]
    async fn test_changed_stats_create_a_second_relationship() {
        // Relationship identity includes every stat value.
        let store = MemoryStore::new();
        let materializer = Materializer::new(&store);
        materializer
            .materialize(&game_graph(1, "2025-01-01", points_and_rebounds()))
            .await
            .unwrap();
        let corrected: StatLine = [("points", StatValue::Int(31))].into_iter().collect();
        materializer
            .materialize(&game_graph(1, "2025-01-01", corrected))
            .await
            .unwrap();

        let athlete_game = store
            .relationships(RelationType::CompeteIn)
            .unwrap()
            .into_iter()
            .filter(|r| r.properties.contains_key("points"))
            .count();
        assert_eq!(athlete_game, 2);
    }

    #[tokio::test]
    async fn test_materialize_all_reports_each_game() {
        let store = MemoryStore::new();
        let graphs = [
            game_graph(1, "2025-01-01", points_and_rebounds()),
            game_graph(2, "2025-01-03", points_and_rebounds()),
        ];
        let reports = Materializer::new(&store).materialize_all(&graphs).await.unwrap();
        assert_eq!(reports.iter().map(|r| r.game_id).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(reports[0].nodes_merged, 3);
        assert_eq!(reports[0].relationships_merged, 3);
        assert_eq!(store.nodes(NodeLabel::Game).unwrap().len(), 2);
    }
}
