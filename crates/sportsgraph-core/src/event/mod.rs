//! Graph construction from raw scoreboard events.
//!
//! Maps one event document to a validated [`GraphSports`]. Missing required
//! fields fail the whole event; survivable shape anomalies are logged and
//! returned as [`BuildWarning`]s while the first candidate is used.

pub mod model;

use std::collections::HashMap;
use std::fmt;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{SportsError, SportsResult};
use crate::model::{
    Athlete, AthleteCompeteFor, AthleteCompeteIn, Game, GraphSports, RelationType, StatLine, Team,
    TeamCompeteIn,
};
use model::{RawAthlete, RawCompetitor, RawEvent, RawLeaderCategory};

/// Leader category that is not a per-athlete statistic.
pub const EXCLUDED_CATEGORY: &str = "rating";

/// A survivable anomaly found while building a graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildWarning {
    /// The event lists more than one competition; the first one is used.
    MultipleCompetitions { count: usize },
    /// The competition does not list exactly two competitors.
    CompetitorCount { count: usize },
    /// A category has several contenders at the top; the first one is used.
    TiedLeaders { team: String, category: String, count: usize },
}

impl fmt::Display for BuildWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MultipleCompetitions { count } => {
                write!(f, "{count} competitions in event, using the first")
            }
            Self::CompetitorCount { count } => write!(f, "{count} competitors, expected 2"),
            Self::TiedLeaders { team, category, count } => {
                write!(f, "{count} leaders in '{category}' for {team}, using the first")
            }
        }
    }
}

/// A built graph together with the anomalies observed on the way.
#[derive(Debug, Clone)]
pub struct Construction {
    pub graph: GraphSports,
    pub warnings: Vec<BuildWarning>,
}

/// Build a graph from a raw event document.
pub fn build_graph(event: &Value) -> SportsResult<Construction> {
    let raw = RawEvent::deserialize(event).map_err(SportsError::MalformedEvent)?;
    build_graph_from_raw(&raw)
}

/// Build a graph from an already-parsed raw event.
pub fn build_graph_from_raw(event: &RawEvent) -> SportsResult<Construction> {
    let mut warnings = Vec::new();

    let competition = event
        .competitions
        .first()
        .ok_or_else(|| SportsError::missing("competitions[0]"))?;
    if event.competitions.len() > 1 {
        warn!(
            event = event.short_name.as_deref().unwrap_or(&event.name),
            count = event.competitions.len(),
            "Multiple competitions in event"
        );
        warnings.push(BuildWarning::MultipleCompetitions { count: event.competitions.len() });
    }

    let competitors = &competition.competitors;
    if competitors.len() != 2 {
        warn!(event_id = event.id, count = competitors.len(), "Unexpected competitor count");
        warnings.push(BuildWarning::CompetitorCount { count: competitors.len() });
    }

    let game = Game::new(event.id, event.name.as_str(), event.date.as_str());
    let mut graph = GraphSports {
        athletes: Vec::new(),
        teams: Vec::with_capacity(competitors.len()),
        game,
        athlete_compete_in_game: Vec::new(),
        athlete_compete_for_team: Vec::new(),
        team_compete_in_game: Vec::with_capacity(competitors.len()),
    };
    let mut athlete_index: HashMap<i64, usize> = HashMap::new();

    for (position, competitor) in competitors.iter().enumerate() {
        let leaders = extract_leaders(competitor, position, &mut warnings)?;

        graph.teams.push(Team::new(
            competitor.team.id,
            competitor.team.display_name.as_str(),
            competitor.team.abbreviation.as_str(),
        ));
        graph.team_compete_in_game.push(TeamCompeteIn {
            from_node_id: competitor.team.id,
            to_node_id: event.id,
            relation_type: RelationType::CompeteIn,
            home_or_away: competitor.home_away,
            is_winner: competitor.winner,
        });

        for (athlete, stats) in leaders {
            if !athlete_index.contains_key(&athlete.id) {
                athlete_index.insert(athlete.id, graph.athletes.len());
                graph.athletes.push(Athlete::new(
                    athlete.id,
                    athlete.full_name.as_str(),
                    athlete.short_name.as_str(),
                ));
            }
            graph.athlete_compete_for_team.push(AthleteCompeteFor {
                from_node_id: athlete.id,
                to_node_id: competitor.team.id,
                relation_type: RelationType::CompeteFor,
                date: event.date.clone(),
                jersey: athlete.jersey,
            });
            graph.athlete_compete_in_game.push(AthleteCompeteIn {
                from_node_id: athlete.id,
                to_node_id: event.id,
                relation_type: RelationType::CompeteIn,
                stats,
            });
        }
    }

    graph.validate()?;
    debug!(
        game_id = graph.game.id,
        athletes = graph.athletes.len(),
        teams = graph.teams.len(),
        "Built game graph"
    );

    Ok(Construction { graph, warnings })
}

/// Top-ranked athlete of every non-excluded category, grouped per athlete in
/// first-seen order.
fn extract_leaders<'a>(
    competitor: &'a RawCompetitor,
    position: usize,
    warnings: &mut Vec<BuildWarning>,
) -> SportsResult<Vec<(&'a RawAthlete, StatLine)>> {
    let mut grouped: Vec<(&RawAthlete, StatLine)> = Vec::new();

    for category in competitor
        .leaders
        .iter()
        .filter(|c| c.name != EXCLUDED_CATEGORY)
    {
        let top = top_leader(category, competitor, position, warnings)?;
        match grouped.iter_mut().find(|(a, _)| a.id == top.athlete.id) {
            Some((_, stats)) => stats.insert(category.name.as_str(), top.value),
            None => {
                let mut stats = StatLine::new();
                stats.insert(category.name.as_str(), top.value);
                grouped.push((&top.athlete, stats));
            }
        }
    }

    Ok(grouped)
}

fn top_leader<'a>(
    category: &'a RawLeaderCategory,
    competitor: &RawCompetitor,
    position: usize,
    warnings: &mut Vec<BuildWarning>,
) -> SportsResult<&'a model::RawLeader> {
    let top = category.leaders.first().ok_or_else(|| {
        SportsError::missing(format!(
            "competitors[{position}].leaders[{}].leaders[0]",
            category.name
        ))
    })?;
    if category.leaders.len() > 1 {
        warn!(
            team = %competitor.team.abbreviation,
            category = %category.name,
            count = category.leaders.len(),
            "Tied leaders in category"
        );
        warnings.push(BuildWarning::TiedLeaders {
            team: competitor.team.abbreviation.clone(),
            category: category.name.clone(),
            count: category.leaders.len(),
        });
    }
    Ok(top)
}
