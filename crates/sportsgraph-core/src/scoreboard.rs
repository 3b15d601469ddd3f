//! Scoreboard document handling: picking the finished events to build from.

use serde_json::Value;
use tracing::{info, warn};

use crate::error::{SportsError, SportsResult};

/// Whether the event's first competition is marked completed.
pub fn is_event_completed(event: &Value) -> SportsResult<bool> {
    let competitions = event
        .get("competitions")
        .and_then(Value::as_array)
        .ok_or_else(|| SportsError::missing("competitions"))?;
    if competitions.len() > 1 {
        warn!(count = competitions.len(), "Unexpected number of competitions");
    }
    competitions
        .first()
        .and_then(|c| c.pointer("/status/type/completed"))
        .and_then(Value::as_bool)
        .ok_or_else(|| SportsError::missing("competitions[0].status.type.completed"))
}

/// Completed events of a scoreboard document (`{"events": [...]}`).
pub fn completed_events(scoreboard: &Value) -> SportsResult<Vec<Value>> {
    let events = scoreboard
        .get("events")
        .and_then(Value::as_array)
        .ok_or_else(|| SportsError::missing("events"))?;

    let mut completed = Vec::with_capacity(events.len());
    for event in events {
        if is_event_completed(event)? {
            completed.push(event.clone());
        }
    }

    if completed.len() < events.len() {
        info!(finished = completed.len(), total = events.len(), "Skipping unfinished games");
    }
    Ok(completed)
}

/// Events from either a scoreboard document or a plain list of events.
///
/// A list is taken as already filtered.
pub fn events_from_document(document: &Value) -> SportsResult<Vec<Value>> {
    match document {
        Value::Array(events) => Ok(events.clone()),
        Value::Object(_) => completed_events(document),
        _ => Err(SportsError::validation(
            "expected a scoreboard object or an array of events",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(id: &str, completed: bool) -> Value {
        json!({
            "id": id,
            "competitions": [{"status": {"type": {"completed": completed}}}]
        })
    }

    #[test]
    fn test_only_completed_events_kept() {
        let scoreboard = json!({"events": [event("1", true), event("2", false), event("3", true)]});
        let events = completed_events(&scoreboard).unwrap();
        let ids: Vec<_> = events.iter().map(|e| e["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[test]
    fn test_missing_status_is_error() {
        let scoreboard = json!({"events": [{"id": "1", "competitions": [{}]}]});
        assert!(matches!(
            completed_events(&scoreboard),
            Err(SportsError::MissingField { .. })
        ));
    }

    #[test]
    fn test_event_list_passes_through() {
        let events = events_from_document(&json!([event("1", false)])).unwrap();
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_scalar_document_rejected() {
        assert!(events_from_document(&json!("nope")).is_err());
    }
}
