//! Entity consolidation: folding duplicate nodes left behind by producers
//! that key entities differently.
//!
//! Two duplicate shapes are repaired:
//!
//! - an athlete created by name only (no `id`) next to an id-bearing athlete
//!   of the same name: the id-less node is merged into the id-bearing one;
//! - two teams of the same name whose abbreviations differ in case: the
//!   `compete_for` date spans of the non-upper-case variant are spliced onto
//!   the upper-case variant, then the two nodes are merged.
//!
//! A name that matches more than one possible survivor is never merged; it
//! is reported as an [`AmbiguousMatch`].
//!
//! Consolidation must not run while games are being materialized. Both
//! rewrite the same nodes and nothing here locks the store.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use tracing::{info, warn};

use sportsgraph_core::NodeLabel;

use crate::statement::{ReadQuery, Record, Statement};
use crate::store::GraphStore;

/// A node as seen by consolidation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub element_id: String,
    pub id: Option<i64>,
    pub name: Option<String>,
    pub name_short: Option<String>,
}

impl Candidate {
    /// `None` when the row has no element id.
    pub fn from_record(record: &Record) -> Option<Self> {
        Some(Self {
            element_id: record.text("element_id")?.to_string(),
            id: record.int("id"),
            name: record.text("name").map(str::to_string),
            name_short: record.text("name_short").map(str::to_string),
        })
    }
}

/// A name with more than one possible survivor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmbiguousMatch {
    pub label: NodeLabel,
    pub name: String,
    /// Element ids of the competing survivors.
    pub candidates: Vec<String>,
}

/// Statements for one label plus the names left alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergePlan {
    pub statements: Vec<Statement>,
    pub ambiguous: Vec<AmbiguousMatch>,
}

impl MergePlan {
    pub fn merges(&self) -> usize {
        self.statements
            .iter()
            .filter(|s| matches!(s, Statement::MergeNodes { .. }))
            .count()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsolidationReport {
    pub athletes_merged: usize,
    pub teams_merged: usize,
    /// `compete_for` relationships whose date span was widened.
    pub tenures_spliced: usize,
    pub ambiguous: Vec<AmbiguousMatch>,
}

/// Group named candidates by exact name, keeping store order inside a group.
fn by_name(candidates: &[Candidate]) -> BTreeMap<&str, Vec<&Candidate>> {
    let mut groups: BTreeMap<&str, Vec<&Candidate>> = BTreeMap::new();
    for candidate in candidates {
        if let Some(name) = candidate.name.as_deref() {
            groups.entry(name).or_default().push(candidate);
        }
    }
    groups
}

/// Merge every id-less athlete into the single id-bearing athlete of the same name.
pub fn plan_athlete_merges(athletes: &[Candidate]) -> MergePlan {
    let mut plan = MergePlan::default();
    for (name, group) in by_name(athletes) {
        let (with_id, without_id): (Vec<&Candidate>, Vec<&Candidate>) =
            group.into_iter().partition(|c| c.id.is_some());
        if without_id.is_empty() || with_id.is_empty() {
            continue;
        }
        if with_id.len() > 1 {
            plan.ambiguous.push(AmbiguousMatch {
                label: NodeLabel::Athlete,
                name: name.to_string(),
                candidates: with_id.iter().map(|c| c.element_id.clone()).collect(),
            });
            continue;
        }

        let survivor = &with_id[0].element_id;
        plan.statements.extend(without_id.into_iter().map(|gone| Statement::MergeNodes {
            survivor: survivor.clone(),
            absorbed: gone.element_id.clone(),
        }));
    }
    plan
}

/// Fold each non-upper-case abbreviation variant of a team into its upper-case variant.
pub fn plan_team_merges(teams: &[Candidate]) -> MergePlan {
    let mut plan = MergePlan::default();
    for (name, group) in by_name(teams) {
        let (upper, other): (Vec<&Candidate>, Vec<&Candidate>) = group
            .into_iter()
            .filter(|c| c.name_short.is_some())
            .partition(|c| c.name_short.as_deref().is_some_and(is_upper_abbreviation));
        if upper.is_empty() || other.is_empty() {
            continue;
        }
        if upper.len() > 1 {
            plan.ambiguous.push(AmbiguousMatch {
                label: NodeLabel::Team,
                name: name.to_string(),
                candidates: upper.iter().map(|c| c.element_id.clone()).collect(),
            });
            continue;
        }

        let survivor = upper[0];
        for variant in other {
            if variant.name_short == survivor.name_short {
                continue;
            }
            plan.statements.push(Statement::SpliceTenureDates {
                from_team: variant.element_id.clone(),
                onto_team: survivor.element_id.clone(),
            });
            plan.statements.push(Statement::MergeNodes {
                survivor: survivor.element_id.clone(),
                absorbed: variant.element_id.clone(),
            });
        }
    }
    plan
}

/// At least one letter and no lower-case letters.
pub fn is_upper_abbreviation(abbreviation: &str) -> bool {
    abbreviation.chars().any(char::is_alphabetic) && !abbreviation.chars().any(char::is_lowercase)
}

async fn candidates<S: GraphStore + ?Sized>(store: &S, label: NodeLabel) -> Result<Vec<Candidate>> {
    let records = store
        .fetch(&ReadQuery::NodesByLabel(label))
        .await
        .with_context(|| format!("Failed to list {label} nodes"))?;
    Ok(records.iter().filter_map(Candidate::from_record).collect())
}

fn warn_ambiguous(ambiguous: &[AmbiguousMatch]) {
    for m in ambiguous {
        warn!(
            label = %m.label,
            name = %m.name,
            candidates = m.candidates.len(),
            "Ambiguous consolidation match, nodes left unmerged"
        );
    }
}

/// Merge id-less athletes into their id-bearing namesakes.
pub async fn consolidate_athletes<S: GraphStore + ?Sized>(
    store: &S,
) -> Result<ConsolidationReport> {
    let plan = plan_athlete_merges(&candidates(store, NodeLabel::Athlete).await?);
    warn_ambiguous(&plan.ambiguous);

    if !plan.statements.is_empty() {
        store
            .run(&plan.statements)
            .await
            .context("Failed to merge duplicate athletes")?;
    }

    info!(merged = plan.merges(), ambiguous = plan.ambiguous.len(), "Athletes consolidated");
    Ok(ConsolidationReport {
        athletes_merged: plan.merges(),
        ambiguous: plan.ambiguous,
        ..Default::default()
    })
}

/// Merge case variants of team abbreviations, keeping the widest tenure spans.
pub async fn consolidate_teams<S: GraphStore + ?Sized>(store: &S) -> Result<ConsolidationReport> {
    let plan = plan_team_merges(&candidates(store, NodeLabel::Team).await?);
    warn_ambiguous(&plan.ambiguous);

    let mut tenures_spliced = 0;
    if !plan.statements.is_empty() {
        let counts = store
            .run(&plan.statements)
            .await
            .context("Failed to merge team abbreviation variants")?;
        tenures_spliced = plan
            .statements
            .iter()
            .zip(counts)
            .filter(|(s, _)| matches!(s, Statement::SpliceTenureDates { .. }))
            .map(|(_, affected)| affected)
            .sum();
    }

    info!(
        merged = plan.merges(),
        tenures_spliced,
        ambiguous = plan.ambiguous.len(),
        "Teams consolidated"
    );
    Ok(ConsolidationReport {
        teams_merged: plan.merges(),
        tenures_spliced,
        ambiguous: plan.ambiguous,
        ..Default::default()
    })
}

/// Athletes first, then teams.
pub async fn consolidate<S: GraphStore + ?Sized>(store: &S) -> Result<ConsolidationReport> {
    let athletes = consolidate_athletes(store).await?;
    let teams = consolidate_teams(store).await?;

    let mut ambiguous = athletes.ambiguous;
    ambiguous.extend(teams.ambiguous);
    Ok(ConsolidationReport {
        athletes_merged: athletes.athletes_merged,
        teams_merged: teams.teams_merged,
        tenures_spliced: teams.tenures_spliced,
        ambiguous,
    })
}
