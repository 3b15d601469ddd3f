//! Graph data model: typed nodes, typed edges and the per-game transfer unit.
//!
//! A [`GraphSports`] holds one game together with the athletes and teams that
//! took part in it and the three edge collections linking them:
//!
//! ```text
//! (:athlete)-[:compete_in {<stat>: <value>, ..}]->(:game)
//! (:athlete)-[:compete_for {jersey, first_date, last_date}]->(:team)
//! (:team)-[:compete_in {home_or_away, is_winner}]->(:game)
//! ```

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{SportsError, SportsResult};

/// Node type discriminator, also used as the store label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeLabel {
    Game,
    Team,
    Athlete,
    Agent,
}

impl NodeLabel {
    /// The store label for this node type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Game => "game",
            Self::Team => "team",
            Self::Athlete => "athlete",
            Self::Agent => "agent",
        }
    }
}

impl fmt::Display for NodeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Edge type discriminator, also used as the store relationship type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    CompeteIn,
    CompeteFor,
    Represent,
}

impl RelationType {
    /// The store relationship type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CompeteIn => "compete_in",
            Self::CompeteFor => "compete_for",
            Self::Represent => "represent",
        }
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Home or away side of a competitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HomeAway {
    Home,
    Away,
}

impl HomeAway {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Away => "away",
        }
    }
}

/// A statistic value, kept as integer or float the way the source reported it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatValue {
    Int(i64),
    Float(f64),
}

impl fmt::Display for StatValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
        }
    }
}

/// An athlete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Athlete {
    #[serde(deserialize_with = "lenient_int")]
    pub id: i64,
    pub label: NodeLabel,
    pub name: String,
    pub name_short: String,
}

impl Athlete {
    pub fn new(id: i64, name: impl Into<String>, name_short: impl Into<String>) -> Self {
        Self {
            id,
            label: NodeLabel::Athlete,
            name: name.into(),
            name_short: name_short.into(),
        }
    }
}

/// A team. `name_short` is the abbreviation, whose casing varies by source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    #[serde(deserialize_with = "lenient_int")]
    pub id: i64,
    pub label: NodeLabel,
    pub name: String,
    pub name_short: String,
}

impl Team {
    pub fn new(id: i64, name: impl Into<String>, name_short: impl Into<String>) -> Self {
        Self {
            id,
            label: NodeLabel::Team,
            name: name.into(),
            name_short: name_short.into(),
        }
    }
}

/// A game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    #[serde(deserialize_with = "lenient_int")]
    pub id: i64,
    pub label: NodeLabel,
    pub name: String,
    pub date: String,
}

impl Game {
    pub fn new(id: i64, name: impl Into<String>, date: impl Into<String>) -> Self {
        Self {
            id,
            label: NodeLabel::Game,
            name: name.into(),
            date: date.into(),
        }
    }
}

/// One named statistic in its serialized list form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AthleteStats {
    pub stats_name: String,
    pub stats_value: StatValue,
}

/// Open-ended bag of statistics keyed by name.
///
/// Serialized as a list of [`AthleteStats`]; a repeated name keeps the last value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<AthleteStats>", into = "Vec<AthleteStats>")]
pub struct StatLine(BTreeMap<String, StatValue>);

impl StatLine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: StatValue) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<StatValue> {
        self.0.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, StatValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl From<Vec<AthleteStats>> for StatLine {
    fn from(stats: Vec<AthleteStats>) -> Self {
        Self(
            stats
                .into_iter()
                .map(|s| (s.stats_name, s.stats_value))
                .collect(),
        )
    }
}

impl From<StatLine> for Vec<AthleteStats> {
    fn from(line: StatLine) -> Self {
        line.0
            .into_iter()
            .map(|(stats_name, stats_value)| AthleteStats { stats_name, stats_value })
            .collect()
    }
}

impl<S: Into<String>> FromIterator<(S, StatValue)> for StatLine {
    fn from_iter<I: IntoIterator<Item = (S, StatValue)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// athlete -> game, carrying the athlete's statistics for that game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AthleteCompeteIn {
    #[serde(deserialize_with = "lenient_int")]
    pub from_node_id: i64,
    #[serde(deserialize_with = "lenient_int")]
    pub to_node_id: i64,
    pub relation_type: RelationType,
    pub stats: StatLine,
}

/// athlete -> team, observed on `date` wearing `jersey`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AthleteCompeteFor {
    #[serde(deserialize_with = "lenient_int")]
    pub from_node_id: i64,
    #[serde(deserialize_with = "lenient_int")]
    pub to_node_id: i64,
    pub relation_type: RelationType,
    pub date: String,
    #[serde(deserialize_with = "lenient_int")]
    pub jersey: i64,
}

/// team -> game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamCompeteIn {
    #[serde(deserialize_with = "lenient_int")]
    pub from_node_id: i64,
    #[serde(deserialize_with = "lenient_int")]
    pub to_node_id: i64,
    pub relation_type: RelationType,
    pub home_or_away: HomeAway,
    pub is_winner: bool,
}

/// Borrowed view over any node of a [`GraphSports`].
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Game(&'a Game),
    Team(&'a Team),
    Athlete(&'a Athlete),
}

impl NodeRef<'_> {
    pub fn id(&self) -> i64 {
        match self {
            Self::Game(g) => g.id,
            Self::Team(t) => t.id,
            Self::Athlete(a) => a.id,
        }
    }

    pub fn label(&self) -> NodeLabel {
        match self {
            Self::Game(g) => g.label,
            Self::Team(t) => t.label,
            Self::Athlete(a) => a.label,
        }
    }
}

/// Borrowed view over any edge of a [`GraphSports`].
#[derive(Debug, Clone, Copy)]
pub enum EdgeRef<'a> {
    AthleteCompeteIn(&'a AthleteCompeteIn),
    AthleteCompeteFor(&'a AthleteCompeteFor),
    TeamCompeteIn(&'a TeamCompeteIn),
}

impl EdgeRef<'_> {
    pub fn endpoints(&self) -> (i64, i64) {
        match self {
            Self::AthleteCompeteIn(e) => (e.from_node_id, e.to_node_id),
            Self::AthleteCompeteFor(e) => (e.from_node_id, e.to_node_id),
            Self::TeamCompeteIn(e) => (e.from_node_id, e.to_node_id),
        }
    }

    pub fn relation_type(&self) -> RelationType {
        match self {
            Self::AthleteCompeteIn(e) => e.relation_type,
            Self::AthleteCompeteFor(e) => e.relation_type,
            Self::TeamCompeteIn(e) => e.relation_type,
        }
    }

    /// Labels the endpoints must carry, and the relation type the edge must use.
    pub fn expected_shape(&self) -> (NodeLabel, RelationType, NodeLabel) {
        match self {
            Self::AthleteCompeteIn(_) => {
                (NodeLabel::Athlete, RelationType::CompeteIn, NodeLabel::Game)
            }
            Self::AthleteCompeteFor(_) => {
                (NodeLabel::Athlete, RelationType::CompeteFor, NodeLabel::Team)
            }
            Self::TeamCompeteIn(_) => (NodeLabel::Team, RelationType::CompeteIn, NodeLabel::Game),
        }
    }
}

/// One game with its participants and relations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSports {
    pub athletes: Vec<Athlete>,
    pub teams: Vec<Team>,
    pub game: Game,
    pub athlete_compete_in_game: Vec<AthleteCompeteIn>,
    pub athlete_compete_for_team: Vec<AthleteCompeteFor>,
    pub team_compete_in_game: Vec<TeamCompeteIn>,
}

impl GraphSports {
    /// All nodes: the game first, then teams, then athletes.
    pub fn nodes(&self) -> impl Iterator<Item = NodeRef<'_>> {
        std::iter::once(NodeRef::Game(&self.game))
            .chain(self.teams.iter().map(NodeRef::Team))
            .chain(self.athletes.iter().map(NodeRef::Athlete))
    }

    /// All edges: team/game, athlete/team, then athlete/game.
    pub fn edges(&self) -> impl Iterator<Item = EdgeRef<'_>> {
        self.team_compete_in_game
            .iter()
            .map(EdgeRef::TeamCompeteIn)
            .chain(self.athlete_compete_for_team.iter().map(EdgeRef::AthleteCompeteFor))
            .chain(self.athlete_compete_in_game.iter().map(EdgeRef::AthleteCompeteIn))
    }

    pub fn node_count(&self) -> usize {
        1 + self.teams.len() + self.athletes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.team_compete_in_game.len()
            + self.athlete_compete_for_team.len()
            + self.athlete_compete_in_game.len()
    }

    /// Check labels, node id uniqueness and that every edge endpoint exists here.
    pub fn validate(&self) -> SportsResult<()> {
        let mut seen: HashSet<(NodeLabel, i64)> = HashSet::new();
        for node in self.nodes() {
            let expected = match node {
                NodeRef::Game(_) => NodeLabel::Game,
                NodeRef::Team(_) => NodeLabel::Team,
                NodeRef::Athlete(_) => NodeLabel::Athlete,
            };
            if node.label() != expected {
                return Err(SportsError::validation(format!(
                    "node {} is labelled '{}' but is a {}",
                    node.id(),
                    node.label(),
                    expected
                )));
            }
            if !seen.insert((expected, node.id())) {
                return Err(SportsError::validation(format!(
                    "duplicate {} node {}",
                    expected,
                    node.id()
                )));
            }
        }

        for edge in self.edges() {
            let (from_label, relation, to_label) = edge.expected_shape();
            if edge.relation_type() != relation {
                return Err(SportsError::validation(format!(
                    "{} edge carries relation type '{}'",
                    relation,
                    edge.relation_type()
                )));
            }
            let (from, to) = edge.endpoints();
            if !seen.contains(&(from_label, from)) || !seen.contains(&(to_label, to)) {
                return Err(SportsError::DanglingEdge {
                    relation: format!("{from_label}-{relation}->{to_label}"),
                    from,
                    to,
                });
            }
        }

        Ok(())
    }
}

/// Accept integers given either as JSON numbers or as numeric strings.
pub(crate) fn lenient_int<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IntRepr {
        Int(i64),
        Text(String),
    }

    match IntRepr::deserialize(deserializer)? {
        IntRepr::Int(v) => Ok(v),
        IntRepr::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("expected an integer, found {s:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> GraphSports {
        GraphSports {
            athletes: vec![Athlete::new(7, "Jane Doe", "J. Doe")],
            teams: vec![Team::new(13, "Los Angeles Lakers", "LAL")],
            game: Game::new(401, "Team A at Team B", "2025-01-01T00:30Z"),
            athlete_compete_in_game: vec![AthleteCompeteIn {
                from_node_id: 7,
                to_node_id: 401,
                relation_type: RelationType::CompeteIn,
                stats: [("points", StatValue::Int(30))].into_iter().collect(),
            }],
            athlete_compete_for_team: vec![AthleteCompeteFor {
                from_node_id: 7,
                to_node_id: 13,
                relation_type: RelationType::CompeteFor,
                date: "2025-01-01T00:30Z".to_string(),
                jersey: 23,
            }],
            team_compete_in_game: vec![TeamCompeteIn {
                from_node_id: 13,
                to_node_id: 401,
                relation_type: RelationType::CompeteIn,
                home_or_away: HomeAway::Home,
                is_winner: true,
            }],
        }
    }

    #[test]
    fn test_valid_graph_passes() {
        assert!(sample().validate().is_ok());
        assert_eq!(sample().node_count(), 3);
        assert_eq!(sample().edge_count(), 3);
    }

    #[test]
    fn test_dangling_edge_rejected() {
        let mut graph = sample();
        graph.athlete_compete_for_team[0].to_node_id = 99;
        match graph.validate() {
            Err(SportsError::DanglingEdge { from, to, .. }) => {
                assert_eq!(from, 7);
                assert_eq!(to, 99);
            }
            other => panic!("expected dangling edge, got {other:?}"),
        }
    }

    #[test]
    fn test_edge_to_wrong_node_type_rejected() {
        // A team id used where a game id is expected.
        let mut graph = sample();
        graph.team_compete_in_game[0].to_node_id = 13;
        assert!(matches!(graph.validate(), Err(SportsError::DanglingEdge { .. })));
    }

    #[test]
    fn test_mislabelled_node_rejected() {
        let mut graph = sample();
        graph.teams[0].label = NodeLabel::Athlete;
        assert!(matches!(graph.validate(), Err(SportsError::ValidationError(_))));
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["game"]["label"], "game");
        assert_eq!(json["athlete_compete_in_game"][0]["relation_type"], "compete_in");
        assert_eq!(
            json["athlete_compete_in_game"][0]["stats"][0],
            serde_json::json!({"stats_name": "points", "stats_value": 30})
        );
        assert_eq!(json["team_compete_in_game"][0]["home_or_away"], "home");
    }

    #[test]
    fn test_string_ids_accepted() {
        let json = serde_json::json!({
            "id": "401", "label": "game", "name": "A at B", "date": "2025-01-01"
        });
        let game: Game = serde_json::from_value(json).unwrap();
        assert_eq!(game.id, 401);
    }

    #[test]
    fn test_stat_value_keeps_numeric_kind() {
        let stats: StatLine = serde_json::from_value(serde_json::json!([
            {"stats_name": "points", "stats_value": 30},
            {"stats_name": "fieldGoalPct", "stats_value": 51.5}
        ]))
        .unwrap();
        assert_eq!(stats.get("points"), Some(StatValue::Int(30)));
        assert_eq!(stats.get("fieldGoalPct"), Some(StatValue::Float(51.5)));
    }
}
