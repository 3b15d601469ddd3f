//! Store operations and their Cypher rendering.
//!
//! Every write the pipeline performs is one [`Statement`] variant and every
//! read one [`ReadQuery`] variant. Stores execute these; the Neo4j store sends
//! the rendered [`Cypher`], the in-memory store interprets the variants
//! directly with the same semantics.

use std::collections::BTreeMap;
use std::fmt;

use sportsgraph_core::model::StatValue;
use sportsgraph_core::{NodeLabel, RelationType};

/// A property value as stored on a node or relationship.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
}

impl PropertyValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v:?}"),
            Self::Bool(v) => write!(f, "{v}"),
        }
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<StatValue> for PropertyValue {
    fn from(v: StatValue) -> Self {
        match v {
            StatValue::Int(i) => Self::Int(i),
            StatValue::Float(f) => Self::Float(f),
        }
    }
}

/// Property map with a stable key order.
pub type Properties = BTreeMap<String, PropertyValue>;

/// Build a [`Properties`] map from `(key, value)` pairs.
pub fn properties<K, V, I>(pairs: I) -> Properties
where
    K: Into<String>,
    V: Into<PropertyValue>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
}

/// Locates endpoint nodes by label and one identifying property.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeKey {
    pub label: NodeLabel,
    pub key: &'static str,
    pub value: PropertyValue,
}

impl NodeKey {
    pub fn by_id(label: NodeLabel, id: i64) -> Self {
        Self { label, key: "id", value: PropertyValue::Int(id) }
    }

    pub fn by_name(label: NodeLabel, name: impl Into<String>) -> Self {
        Self { label, key: "name", value: PropertyValue::Text(name.into()) }
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}:{}={})", self.label, self.key, self.value)
    }
}

/// One write operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// Create a node unless one with this label already carries every given property.
    MergeNode { label: NodeLabel, properties: Properties },

    /// Create a relationship between every matching endpoint pair unless one
    /// with this type already carries every given property.
    MergeRelationship {
        relation: RelationType,
        from: NodeKey,
        to: NodeKey,
        properties: Properties,
    },

    /// Track the span of dates an athlete is seen on a team. Matched by
    /// endpoints only: creation sets `jersey`, `first_date` and `last_date`;
    /// a later match only moves `last_date` forward. `first_date` is never
    /// moved back, so replaying an older game after a newer one leaves the
    /// span starting at the newer date. Load dates in order.
    MergeTenure {
        athlete_id: i64,
        team_id: i64,
        jersey: i64,
        date: String,
    },

    /// For every athlete with `compete_for` edges to both teams, widen the
    /// edge to `onto_team` to the earliest `first_date` and latest
    /// `last_date` of the two, then delete the edge to `from_team`.
    SpliceTenureDates { from_team: String, onto_team: String },

    /// Fold `absorbed` into `survivor`: missing properties are copied over,
    /// relationships of `absorbed` that `survivor` already has with the same
    /// type, direction, other end and properties are dropped, the rest are
    /// re-pointed, and `absorbed` is deleted. Relationships that differ in any
    /// property stay separate. Both are store element ids.
    MergeNodes { survivor: String, absorbed: String },
}

impl Statement {
    /// Whether zero affected rows means a required node was absent.
    pub fn requires_match(&self) -> bool {
        matches!(
            self,
            Self::MergeRelationship { .. } | Self::MergeTenure { .. } | Self::MergeNodes { .. }
        )
    }

    /// Render to parameterised Cypher. Every statement returns one row with
    /// an `affected` count.
    pub fn cypher(&self) -> Cypher {
        match self {
            Self::MergeNode { label, properties } => {
                let mut cypher = Cypher::default();
                let pattern = cypher.property_pattern(properties);
                cypher.text = format!("MERGE (n:{label} {pattern})\nRETURN count(n) AS affected");
                cypher
            }
            Self::MergeRelationship { relation, from, to, properties } => {
                let mut cypher = Cypher::default();
                cypher.bind("from", from.value.clone());
                cypher.bind("to", to.value.clone());
                let pattern = if properties.is_empty() {
                    String::new()
                } else {
                    format!(" {}", cypher.property_pattern(properties))
                };
                cypher.text = format!(
                    "MATCH (a:{} {{{}: $from}}), (b:{} {{{}: $to}})\n\
                     MERGE (a)-[r:{relation}{pattern}]->(b)\n\
                     RETURN count(r) AS affected",
                    from.label,
                    quote_key(from.key),
                    to.label,
                    quote_key(to.key),
                );
                cypher
            }
            Self::MergeTenure { athlete_id, team_id, jersey, date } => {
                let mut cypher = Cypher::default();
                cypher.bind("athlete_id", *athlete_id);
                cypher.bind("team_id", *team_id);
                cypher.bind("jersey", *jersey);
                cypher.bind("date", date.as_str());
                cypher.text = "MATCH (a:athlete {`id`: $athlete_id}), (t:team {`id`: $team_id})\n\
                     MERGE (a)-[r:compete_for]->(t)\n\
                     ON CREATE SET r.jersey = $jersey, r.first_date = $date, r.last_date = $date\n\
                     ON MATCH SET r.last_date = CASE\n\
                         WHEN r.last_date IS NULL OR r.last_date < $date THEN $date\n\
                         ELSE r.last_date END\n\
                     RETURN count(r) AS affected"
                    .to_string();
                cypher
            }
            Self::SpliceTenureDates { from_team, onto_team } => {
                let mut cypher = Cypher::default();
                cypher.bind("from_team", from_team.as_str());
                cypher.bind("onto_team", onto_team.as_str());
                cypher.text = "MATCH (onto:team) WHERE elementId(onto) = $onto_team\n\
                     MATCH (src:team) WHERE elementId(src) = $from_team\n\
                     MATCH (onto)<-[keep:compete_for]-(:athlete)-[old:compete_for]->(src)\n\
                     SET keep.first_date = CASE\n\
                             WHEN old.first_date IS NOT NULL\n\
                                 AND (keep.first_date IS NULL\n\
                                     OR old.first_date < keep.first_date)\n\
                             THEN old.first_date ELSE keep.first_date END,\n\
                         keep.last_date = CASE\n\
                             WHEN old.last_date IS NOT NULL\n\
                                 AND (keep.last_date IS NULL\n\
                                     OR old.last_date > keep.last_date)\n\
                             THEN old.last_date ELSE keep.last_date END\n\
                     DELETE old\n\
                     RETURN count(keep) AS affected"
                    .to_string();
                cypher
            }
            Self::MergeNodes { survivor, absorbed } => {
                let mut cypher = Cypher::default();
                cypher.bind("survivor", survivor.as_str());
                cypher.bind("absorbed", absorbed.as_str());
                cypher.text = "MATCH (keep) WHERE elementId(keep) = $survivor\n\
                     MATCH (gone) WHERE elementId(gone) = $absorbed\n\
                     OPTIONAL MATCH (gone)-[dup]-(other)\n\
                     WHERE other <> keep AND EXISTS {\n\
                         MATCH (keep)-[twin]-(other)\n\
                         WHERE type(twin) = type(dup)\n\
                           AND (startNode(twin) = keep) = (startNode(dup) = gone)\n\
                           AND properties(twin) = properties(dup)\n\
                     }\n\
                     DELETE dup\n\
                     WITH DISTINCT keep, gone\n\
                     CALL apoc.refactor.mergeNodes(\n\
                         [keep, gone], {properties: 'discard', mergeRels: false})\n\
                     YIELD node\n\
                     RETURN count(node) AS affected"
                    .to_string();
                cypher
            }
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MergeNode { label, properties } => {
                write!(f, "merge {label}")?;
                if let Some(id) = properties.get("id") {
                    write!(f, " id={id}")?;
                } else if let Some(name) = properties.get("name") {
                    write!(f, " name={name}")?;
                }
                Ok(())
            }
            Self::MergeRelationship { relation, from, to, .. } => {
                write!(f, "merge {from}-[:{relation}]->{to}")
            }
            Self::MergeTenure { athlete_id, team_id, date, .. } => {
                write!(f, "merge tenure athlete {athlete_id} -> team {team_id} on {date}")
            }
            Self::SpliceTenureDates { from_team, onto_team } => {
                write!(f, "splice tenure dates {from_team} onto {onto_team}")
            }
            Self::MergeNodes { survivor, absorbed } => {
                write!(f, "merge node {absorbed} into {survivor}")
            }
        }
    }
}

/// Column type of a read result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Int,
    Text,
}

/// One read operation.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadQuery {
    /// Every node with the label: `element_id`, `id`, `name`, `name_short`.
    NodesByLabel(NodeLabel),
    /// Athletes with exactly this name: `element_id`, `id`, `name`.
    AthletesByName(String),
    /// `agent_name`, `athlete_name` per represent relationship.
    AgentAthletePairs,
    /// Total `nodes` and `relationships`.
    Counts,
}

impl ReadQuery {
    pub fn columns(&self) -> &'static [(&'static str, ColumnKind)] {
        match self {
            Self::NodesByLabel(_) => &[
                ("element_id", ColumnKind::Text),
                ("id", ColumnKind::Int),
                ("name", ColumnKind::Text),
                ("name_short", ColumnKind::Text),
            ],
            Self::AthletesByName(_) => &[
                ("element_id", ColumnKind::Text),
                ("id", ColumnKind::Int),
                ("name", ColumnKind::Text),
            ],
            Self::AgentAthletePairs => &[
                ("agent_name", ColumnKind::Text),
                ("athlete_name", ColumnKind::Text),
            ],
            Self::Counts => &[("nodes", ColumnKind::Int), ("relationships", ColumnKind::Int)],
        }
    }

    pub fn cypher(&self) -> Cypher {
        let mut cypher = Cypher::default();
        cypher.text = match self {
            Self::NodesByLabel(label) => format!(
                "MATCH (n:{label})\n\
                 RETURN elementId(n) AS element_id, n.id AS id, n.name AS name,\n\
                     n.name_short AS name_short\n\
                 ORDER BY element_id"
            ),
            Self::AthletesByName(name) => {
                cypher.bind("name", name.as_str());
                "MATCH (a:athlete) WHERE a.name = $name\n\
                 RETURN elementId(a) AS element_id, a.id AS id, a.name AS name"
                    .to_string()
            }
            Self::AgentAthletePairs => "MATCH (ag:agent)-[:represent]->(at:athlete)\n\
                 RETURN ag.name AS agent_name, at.name AS athlete_name\n\
                 ORDER BY agent_name, athlete_name"
                .to_string(),
            Self::Counts => "CALL { MATCH (n) RETURN count(n) AS nodes }\n\
                 CALL { MATCH ()-[r]->() RETURN count(r) AS relationships }\n\
                 RETURN nodes, relationships"
                .to_string(),
        };
        cypher
    }
}

/// One result row; a missing key means the value was null.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record(BTreeMap<String, PropertyValue>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: PropertyValue) {
        self.0.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.0.get(key)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(PropertyValue::as_text)
    }

    pub fn int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(PropertyValue::as_int)
    }
}

/// Cypher text with its ordered parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cypher {
    pub text: String,
    pub params: Vec<(String, PropertyValue)>,
}

impl Cypher {
    fn bind(&mut self, name: &str, value: impl Into<PropertyValue>) {
        self.params.push((name.to_string(), value.into()));
    }

    /// `{`k0`: $p0, `k1`: $p1}`, binding each value as it goes.
    fn property_pattern(&mut self, properties: &Properties) -> String {
        let start = self.params.len();
        let fields: Vec<String> = properties
            .iter()
            .enumerate()
            .map(|(i, (key, _))| format!("{}: $p{}", quote_key(key), start + i))
            .collect();
        for (i, value) in properties.values().enumerate() {
            self.bind(&format!("p{}", start + i), value.clone());
        }
        format!("{{{}}}", fields.join(", "))
    }
}

/// Backtick-quote a property key so any stat name is a valid identifier.
fn quote_key(key: &str) -> String {
    format!("`{}`", key.replace('`', "``"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_node_keys_on_every_property() {
        let stmt = Statement::MergeNode {
            label: NodeLabel::Team,
            properties: properties([
                ("id", PropertyValue::Int(13)),
                ("label", "team".into()),
                ("name", "Los Angeles Lakers".into()),
                ("name_short", "LAL".into()),
            ]),
        };
        let cypher = stmt.cypher();
        assert_eq!(
            cypher.text,
            "MERGE (n:team {`id`: $p0, `label`: $p1, `name`: $p2, `name_short`: $p3})\n\
             RETURN count(n) AS affected"
        );
        assert_eq!(cypher.params[0], ("p0".to_string(), PropertyValue::Int(13)));
        assert_eq!(cypher.params[3], ("p3".to_string(), PropertyValue::Text("LAL".into())));
    }

    #[test]
    fn test_relationship_without_properties_has_bare_pattern() {
        let stmt = Statement::MergeRelationship {
            relation: RelationType::Represent,
            from: NodeKey::by_name(NodeLabel::Agent, "Rich Paul"),
            to: NodeKey::by_name(NodeLabel::Athlete, "LeBron James"),
            properties: Properties::new(),
        };
        let cypher = stmt.cypher();
        assert!(cypher.text.contains("MATCH (a:agent {`name`: $from}), (b:athlete {`name`: $to})"));
        assert!(cypher.text.contains("MERGE (a)-[r:represent]->(b)"));
        assert_eq!(cypher.params.len(), 2);
    }

    #[test]
    fn test_relationship_property_params_follow_endpoints() {
        let stmt = Statement::MergeRelationship {
            relation: RelationType::CompeteIn,
            from: NodeKey::by_id(NodeLabel::Athlete, 1),
            to: NodeKey::by_id(NodeLabel::Game, 9),
            properties: properties([("points", 30i64), ("rebounds", 10i64)]),
        };
        let cypher = stmt.cypher();
        assert!(cypher.text.contains("[r:compete_in {`points`: $p2, `rebounds`: $p3}]"));
        let names: Vec<_> = cypher.params.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, vec!["from", "to", "p2", "p3"]);
    }

    #[test]
    fn test_tenure_updates_last_date_only_on_match() {
        let cypher = Statement::MergeTenure {
            athlete_id: 1,
            team_id: 2,
            jersey: 23,
            date: "2025-01-05".into(),
        }
        .cypher();
        let on_match = cypher.text.split("ON MATCH SET").nth(1).unwrap();
        assert!(on_match.contains("r.last_date"));
        assert!(!on_match.contains("first_date"));
        assert!(!on_match.contains("jersey"));
    }

    #[test]
    fn test_splice_deletes_folded_tenure() {
        let cypher = Statement::SpliceTenureDates {
            from_team: "4:x:1".into(),
            onto_team: "4:x:2".into(),
        }
        .cypher();
        let (set, tail) = cypher.text.split_once("DELETE old").unwrap();
        assert!(set.contains("keep.first_date"));
        assert!(set.contains("keep.last_date"));
        assert!(tail.contains("RETURN count(keep) AS affected"));
        assert_eq!(
            cypher.params,
            vec![
                ("from_team".to_string(), PropertyValue::from("4:x:1")),
                ("onto_team".to_string(), PropertyValue::from("4:x:2")),
            ]
        );
    }

    #[test]
    fn test_merge_nodes_drops_exact_twins_and_keeps_other_relationships() {
        let text = Statement::MergeNodes { survivor: "4:x:2".into(), absorbed: "4:x:1".into() }
            .cypher()
            .text;
        assert!(text.contains("properties(twin) = properties(dup)"));
        assert!(text.contains("type(twin) = type(dup)"));
        let (dedup, merge) = text.split_once("DELETE dup").unwrap();
        assert!(dedup.contains("OPTIONAL MATCH (gone)-[dup]-(other)"));
        assert!(merge.contains("mergeRels: false"));
        assert!(!text.contains("mergeRels: true"));
    }

    #[test]
    fn test_odd_keys_are_quoted() {
        assert_eq!(quote_key("3pt`made"), "`3pt``made`");
    }

    #[test]
    fn test_requires_match() {
        assert!(!Statement::MergeNode { label: NodeLabel::Agent, properties: Properties::new() }
            .requires_match());
        assert!(!Statement::SpliceTenureDates { from_team: "a".into(), onto_team: "b".into() }
            .requires_match());
        assert!(Statement::MergeNodes { survivor: "a".into(), absorbed: "b".into() }
            .requires_match());
    }

    #[test]
    fn test_read_columns_match_cypher() {
        for query in [
            ReadQuery::NodesByLabel(NodeLabel::Team),
            ReadQuery::AthletesByName("A".into()),
            ReadQuery::AgentAthletePairs,
            ReadQuery::Counts,
        ] {
            let text = query.cypher().text;
            for (column, _) in query.columns() {
                assert!(text.contains(column), "{column} missing from {text}");
            }
        }
    }
}
