//! Raw scoreboard event shapes.
//!
//! Only the fields graph construction reads are declared; everything else in
//! the source document is ignored. A missing declared field fails
//! deserialization.

use serde::Deserialize;

use crate::model::{lenient_int, HomeAway, StatValue};

/// One scoreboard event (a game).
#[derive(Debug, Clone, Deserialize)]
pub struct RawEvent {
    #[serde(deserialize_with = "lenient_int")]
    pub id: i64,
    pub name: String,
    #[serde(rename = "shortName", default)]
    pub short_name: Option<String>,
    pub date: String,
    pub competitions: Vec<RawCompetition>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawCompetition {
    pub competitors: Vec<RawCompetitor>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawCompetitor {
    pub team: RawTeam,
    #[serde(rename = "homeAway")]
    pub home_away: HomeAway,
    pub winner: bool,
    pub leaders: Vec<RawLeaderCategory>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawTeam {
    #[serde(deserialize_with = "lenient_int")]
    pub id: i64,
    #[serde(rename = "displayName")]
    pub display_name: String,
    pub abbreviation: String,
}

/// Leaderboard for one statistic category.
#[derive(Debug, Clone, Deserialize)]
pub struct RawLeaderCategory {
    pub name: String,
    pub leaders: Vec<RawLeader>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawLeader {
    pub value: StatValue,
    pub athlete: RawAthlete,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawAthlete {
    #[serde(deserialize_with = "lenient_int")]
    pub id: i64,
    #[serde(rename = "fullName")]
    pub full_name: String,
    #[serde(rename = "shortName")]
    pub short_name: String,
    #[serde(deserialize_with = "lenient_int")]
    pub jersey: i64,
}
