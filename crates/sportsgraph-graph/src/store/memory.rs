//! In-process property graph store.
//!
//! Interprets [`Statement`]s with the same merge semantics the Cypher
//! renderings have on Neo4j. Each `run` applies to a working copy that
//! replaces the live graph only when every statement succeeded, so a failed
//! batch leaves no trace.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use sportsgraph_core::{NodeLabel, RelationType};

use super::{check_affected, GraphStore};
use crate::statement::{NodeKey, Properties, PropertyValue, ReadQuery, Record, Statement};

const ELEMENT_PREFIX: &str = "mem:";

/// A stored node.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredNode {
    pub element_id: String,
    pub label: NodeLabel,
    pub properties: Properties,
}

/// A stored relationship with its endpoints' element ids.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRelationship {
    pub relation: RelationType,
    pub from: String,
    pub to: String,
    pub properties: Properties,
}

#[derive(Debug, Clone)]
struct Node {
    label: NodeLabel,
    properties: Properties,
}

#[derive(Debug, Clone)]
struct Relationship {
    relation: RelationType,
    from: u64,
    to: u64,
    properties: Properties,
}

#[derive(Debug, Clone, Default)]
struct MemoryGraph {
    nodes: BTreeMap<u64, Node>,
    relationships: BTreeMap<u64, Relationship>,
    next_id: u64,
}

/// In-memory [`GraphStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    graph: Mutex<MemoryGraph>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Nodes with the given label in creation order.
    pub fn nodes(&self, label: NodeLabel) -> Result<Vec<StoredNode>> {
        let graph = self.lock()?;
        Ok(graph
            .nodes
            .iter()
            .filter(|(_, n)| n.label == label)
            .map(|(id, n)| StoredNode {
                element_id: element_id(*id),
                label: n.label,
                properties: n.properties.clone(),
            })
            .collect())
    }

    /// Relationships of the given type in creation order.
    pub fn relationships(&self, relation: RelationType) -> Result<Vec<StoredRelationship>> {
        let graph = self.lock()?;
        Ok(graph
            .relationships
            .values()
            .filter(|r| r.relation == relation)
            .map(|r| StoredRelationship {
                relation: r.relation,
                from: element_id(r.from),
                to: element_id(r.to),
                properties: r.properties.clone(),
            })
            .collect())
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryGraph>> {
        self.graph.lock().map_err(|_| anyhow!("memory store lock poisoned"))
    }
}

#[async_trait]
impl GraphStore for MemoryStore {
    async fn run(&self, statements: &[Statement]) -> Result<Vec<usize>> {
        let mut live = self.lock()?;
        let mut working = live.clone();
        let mut counts = Vec::with_capacity(statements.len());
        for statement in statements {
            let affected = working.apply(statement);
            check_affected(statement, affected)?;
            counts.push(affected);
        }
        *live = working;
        Ok(counts)
    }

    async fn fetch(&self, query: &ReadQuery) -> Result<Vec<Record>> {
        let graph = self.lock()?;
        Ok(graph.read(query))
    }
}

impl MemoryGraph {
    fn apply(&mut self, statement: &Statement) -> usize {
        match statement {
            Statement::MergeNode { label, properties } => self.merge_node(*label, properties),
            Statement::MergeRelationship { relation, from, to, properties } => {
                self.merge_relationship(*relation, from, to, properties)
            }
            Statement::MergeTenure { athlete_id, team_id, jersey, date } => {
                self.merge_tenure(*athlete_id, *team_id, *jersey, date)
            }
            Statement::SpliceTenureDates { from_team, onto_team } => {
                match (parse_element_id(from_team), parse_element_id(onto_team)) {
                    (Some(from), Some(onto)) => self.splice_tenure_dates(from, onto),
                    _ => 0,
                }
            }
            Statement::MergeNodes { survivor, absorbed } => {
                match (parse_element_id(survivor), parse_element_id(absorbed)) {
                    (Some(survivor), Some(absorbed)) => self.merge_nodes(survivor, absorbed),
                    _ => 0,
                }
            }
        }
    }

    fn allocate(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn merge_node(&mut self, label: NodeLabel, pattern: &Properties) -> usize {
        let matched = self
            .nodes
            .values()
            .filter(|n| n.label == label && contains_all(&n.properties, pattern))
            .count();
        if matched > 0 {
            return matched;
        }
        let id = self.allocate();
        self.nodes.insert(id, Node { label, properties: pattern.clone() });
        1
    }

    fn find_nodes(&self, key: &NodeKey) -> Vec<u64> {
        self.nodes
            .iter()
            .filter(|(_, n)| n.label == key.label && n.properties.get(key.key) == Some(&key.value))
            .map(|(id, _)| *id)
            .collect()
    }

    fn endpoint_pairs(&self, from: &NodeKey, to: &NodeKey) -> Vec<(u64, u64)> {
        let targets = self.find_nodes(to);
        self.find_nodes(from)
            .into_iter()
            .flat_map(|f| targets.iter().map(move |t| (f, *t)))
            .collect()
    }

    fn find_relationship(
        &self,
        relation: RelationType,
        from: u64,
        to: u64,
        pattern: &Properties,
    ) -> Option<u64> {
        self.relationships
            .iter()
            .find(|(_, r)| {
                r.relation == relation
                    && r.from == from
                    && r.to == to
                    && contains_all(&r.properties, pattern)
            })
            .map(|(id, _)| *id)
    }

    fn merge_relationship(
        &mut self,
        relation: RelationType,
        from: &NodeKey,
        to: &NodeKey,
        pattern: &Properties,
    ) -> usize {
        let pairs = self.endpoint_pairs(from, to);
        for (f, t) in &pairs {
            if self.find_relationship(relation, *f, *t, pattern).is_none() {
                let id = self.allocate();
                self.relationships.insert(
                    id,
                    Relationship { relation, from: *f, to: *t, properties: pattern.clone() },
                );
            }
        }
        pairs.len()
    }

    fn merge_tenure(&mut self, athlete_id: i64, team_id: i64, jersey: i64, date: &str) -> usize {
        let pairs = self.endpoint_pairs(
            &NodeKey::by_id(NodeLabel::Athlete, athlete_id),
            &NodeKey::by_id(NodeLabel::Team, team_id),
        );
        for (f, t) in &pairs {
            match self.find_relationship(RelationType::CompeteFor, *f, *t, &Properties::new()) {
                Some(rel_id) => {
                    if let Some(rel) = self.relationships.get_mut(&rel_id) {
                        let advance = text_of(&rel.properties, "last_date")
                            .map_or(true, |last| last < date);
                        if advance {
                            rel.properties.insert("last_date".to_string(), date.into());
                        }
                    }
                }
                None => {
                    let id = self.allocate();
                    let properties: Properties = [
                        ("jersey".to_string(), PropertyValue::Int(jersey)),
                        ("first_date".to_string(), date.into()),
                        ("last_date".to_string(), date.into()),
                    ]
                    .into_iter()
                    .collect();
                    let relation = RelationType::CompeteFor;
                    self.relationships
                        .insert(id, Relationship { relation, from: *f, to: *t, properties });
                }
            }
        }
        pairs.len()
    }

    fn splice_tenure_dates(&mut self, from_team: u64, onto_team: u64) -> usize {
        let tenures_to = |team: u64| -> Vec<(u64, u64)> {
            self.relationships
                .iter()
                .filter(|(_, r)| r.relation == RelationType::CompeteFor && r.to == team)
                .map(|(id, r)| (*id, r.from))
                .collect()
        };
        let kept = tenures_to(onto_team);
        let old = tenures_to(from_team);

        let mut updates = Vec::new();
        for (keep_id, athlete) in &kept {
            for (old_id, _) in old.iter().filter(|(_, a)| a == athlete) {
                updates.push((*keep_id, *old_id));
            }
        }

        for (keep_id, old_id) in &updates {
            let Some(old) = self.relationships.remove(old_id) else {
                continue;
            };
            if let Some(keep) = self.relationships.get_mut(keep_id) {
                widen(&mut keep.properties, &old.properties, "first_date", |candidate, current| {
                    candidate < current
                });
                widen(&mut keep.properties, &old.properties, "last_date", |candidate, current| {
                    candidate > current
                });
            }
        }
        updates.len()
    }

    fn merge_nodes(&mut self, survivor: u64, absorbed: u64) -> usize {
        if survivor == absorbed {
            return 1;
        }
        let Some(gone) = self.nodes.get(&absorbed).cloned() else {
            return 0;
        };
        let Some(keep) = self.nodes.get_mut(&survivor) else {
            return 0;
        };
        for (key, value) in gone.properties {
            keep.properties.entry(key).or_insert(value);
        }
        self.nodes.remove(&absorbed);

        let twins: Vec<u64> = self
            .relationships
            .iter()
            .filter(|(_, r)| self.has_twin_on(survivor, absorbed, r))
            .map(|(id, _)| *id)
            .collect();
        for id in twins {
            self.relationships.remove(&id);
        }

        for rel in self.relationships.values_mut() {
            if rel.from == absorbed {
                rel.from = survivor;
            }
            if rel.to == absorbed {
                rel.to = survivor;
            }
        }
        1
    }

    /// Whether `rel`, attached to `absorbed`, already exists on `survivor`
    /// with the same type, direction, other end and properties.
    fn has_twin_on(&self, survivor: u64, absorbed: u64, rel: &Relationship) -> bool {
        let (outgoing, other) = if rel.from == absorbed {
            (true, rel.to)
        } else if rel.to == absorbed {
            (false, rel.from)
        } else {
            return false;
        };
        if other == survivor || other == absorbed {
            return false;
        }
        self.relationships.values().any(|twin| {
            let same_ends = if outgoing {
                twin.from == survivor && twin.to == other
            } else {
                twin.from == other && twin.to == survivor
            };
            same_ends && twin.relation == rel.relation && twin.properties == rel.properties
        })
    }

    fn read(&self, query: &ReadQuery) -> Vec<Record> {
        match query {
            ReadQuery::NodesByLabel(label) => self
                .nodes
                .iter()
                .filter(|(_, n)| n.label == *label)
                .map(|(id, n)| node_record(*id, n, &["id", "name", "name_short"]))
                .collect(),
            ReadQuery::AthletesByName(name) => self
                .nodes
                .iter()
                .filter(|(_, n)| {
                    n.label == NodeLabel::Athlete
                        && text_of(&n.properties, "name") == Some(name.as_str())
                })
                .map(|(id, n)| node_record(*id, n, &["id", "name"]))
                .collect(),
            ReadQuery::AgentAthletePairs => {
                let name_of = |id: u64, label: NodeLabel| {
                    self.nodes
                        .get(&id)
                        .filter(|n| n.label == label)
                        .and_then(|n| n.properties.get("name").cloned())
                };
                let mut pairs: Vec<Record> = self
                    .relationships
                    .values()
                    .filter(|r| r.relation == RelationType::Represent)
                    .filter_map(|r| {
                        let agent = name_of(r.from, NodeLabel::Agent)?;
                        let athlete = name_of(r.to, NodeLabel::Athlete)?;
                        let mut record = Record::new();
                        record.insert("agent_name", agent);
                        record.insert("athlete_name", athlete);
                        Some(record)
                    })
                    .collect();
                pairs.sort_by(|a, b| {
                    (a.text("agent_name"), a.text("athlete_name"))
                        .cmp(&(b.text("agent_name"), b.text("athlete_name")))
                });
                pairs
            }
            ReadQuery::Counts => {
                let mut record = Record::new();
                record.insert("nodes", PropertyValue::Int(self.nodes.len() as i64));
                record.insert("relationships", PropertyValue::Int(self.relationships.len() as i64));
                vec![record]
            }
        }
    }
}

fn element_id(id: u64) -> String {
    format!("{ELEMENT_PREFIX}{id}")
}

fn parse_element_id(element_id: &str) -> Option<u64> {
    element_id.strip_prefix(ELEMENT_PREFIX)?.parse().ok()
}

fn contains_all(properties: &Properties, pattern: &Properties) -> bool {
    pattern.iter().all(|(k, v)| properties.get(k) == Some(v))
}

fn text_of<'a>(properties: &'a Properties, key: &str) -> Option<&'a str> {
    properties.get(key).and_then(PropertyValue::as_text)
}

/// Replace `key` on `target` with the value from `source` when `better` says so.
fn widen(target: &mut Properties, source: &Properties, key: &str, better: fn(&str, &str) -> bool) {
    let Some(candidate) = text_of(source, key) else {
        return;
    };
    let replace = text_of(target, key).map_or(true, |current| better(candidate, current));
    if replace {
        target.insert(key.to_string(), candidate.into());
    }
}

fn node_record(id: u64, node: &Node, keys: &[&str]) -> Record {
    let mut record = Record::new();
    record.insert("element_id", PropertyValue::Text(element_id(id)));
    for key in keys {
        if let Some(value) = node.properties.get(*key) {
            record.insert(*key, value.clone());
        }
    }
    record
}
