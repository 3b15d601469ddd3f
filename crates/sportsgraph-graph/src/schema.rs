//! Neo4j schema initialization (indexes).
//!
//! Lookup indexes only: duplicate ids and names are expected until
//! consolidation has run, so no uniqueness constraints are declared.

use anyhow::Result;
use neo4rs::Query;
use tracing::info;

use crate::store::Neo4jStore;

/// Cypher statements for schema initialization.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    "CREATE INDEX game_id IF NOT EXISTS FOR (g:game) ON (g.id)",
    "CREATE INDEX game_name IF NOT EXISTS FOR (g:game) ON (g.name)",
    "CREATE INDEX team_id IF NOT EXISTS FOR (t:team) ON (t.id)",
    "CREATE INDEX team_name IF NOT EXISTS FOR (t:team) ON (t.name)",
    "CREATE INDEX athlete_id IF NOT EXISTS FOR (a:athlete) ON (a.id)",
    "CREATE INDEX athlete_name IF NOT EXISTS FOR (a:athlete) ON (a.name)",
    "CREATE INDEX agent_name IF NOT EXISTS FOR (a:agent) ON (a.name)",
];

/// Initialize Neo4j schema with lookup indexes.
///
/// Safe to run multiple times - uses IF NOT EXISTS clauses.
pub async fn initialize_schema(store: &Neo4jStore) -> Result<()> {
    info!("Initializing Neo4j schema...");

    for statement in SCHEMA_STATEMENTS {
        store.execute(Query::new(statement.to_string())).await?;
    }

    info!("Neo4j schema initialized ({} statements)", SCHEMA_STATEMENTS.len());
    Ok(())
}
