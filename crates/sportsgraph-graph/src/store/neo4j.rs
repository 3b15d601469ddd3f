//! Neo4j-backed store.

use anyhow::{Context, Result};
use async_trait::async_trait;
use neo4rs::{BoltType, ConfigBuilder, Graph, Query, Row, Txn};
use tracing::{debug, warn};

use sportsgraph_core::config::StoreConfig;

use super::{check_affected, GraphStore};
use crate::schema;
use crate::statement::{ColumnKind, Cypher, PropertyValue, ReadQuery, Record, Statement};

/// Store backed by a Neo4j database over bolt.
#[derive(Clone)]
pub struct Neo4jStore {
    graph: Graph,
}

impl Neo4jStore {
    /// Connect using the given configuration.
    ///
    /// neo4rs builds its pool lazily, so a `RETURN 1` ping forces a real
    /// handshake here and an unreachable database fails at startup.
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        let neo4j_config = ConfigBuilder::default()
            .uri(&config.uri)
            .user(&config.user)
            .password(&config.password)
            .db(config.database.as_str())
            .max_connections(config.max_connections)
            .fetch_size(config.fetch_size)
            .build()
            .context("Failed to build Neo4j config")?;

        let graph = Graph::connect(neo4j_config)
            .await
            .context("Failed to create Neo4j connection pool")?;

        graph
            .run(Query::new("RETURN 1".to_string()))
            .await
            .with_context(|| format!("Neo4j at {} is not responding to queries", config.uri))?;

        Ok(Self { graph })
    }

    /// Execute a Cypher statement outside any explicit transaction.
    pub async fn execute(&self, query: Query) -> Result<()> {
        self.graph.run(query).await.context("Neo4j query execution failed")?;
        Ok(())
    }

    async fn apply(txn: &mut Txn, statements: &[Statement]) -> Result<Vec<usize>> {
        let mut counts = Vec::with_capacity(statements.len());
        for statement in statements {
            let mut stream = txn
                .execute(to_query(statement.cypher()))
                .await
                .with_context(|| format!("Neo4j statement failed: {statement}"))?;

            let mut affected = 0usize;
            while let Some(row) = stream
                .next(txn.handle())
                .await
                .with_context(|| format!("Failed to read result of: {statement}"))?
            {
                affected += affected_count(&row)
                    .with_context(|| format!("Unexpected result of: {statement}"))?;
            }

            debug!(%statement, affected, "Statement applied");
            check_affected(statement, affected)?;
            counts.push(affected);
        }
        Ok(counts)
    }
}

#[async_trait]
impl GraphStore for Neo4jStore {
    async fn run(&self, statements: &[Statement]) -> Result<Vec<usize>> {
        let mut txn = self
            .graph
            .start_txn()
            .await
            .context("Failed to open Neo4j transaction")?;

        match Self::apply(&mut txn, statements).await {
            Ok(counts) => {
                txn.commit().await.context("Failed to commit Neo4j transaction")?;
                Ok(counts)
            }
            Err(err) => {
                if let Err(rollback_err) = txn.rollback().await {
                    warn!(error = %rollback_err, "Neo4j rollback failed");
                }
                Err(err)
            }
        }
    }

    async fn fetch(&self, query: &ReadQuery) -> Result<Vec<Record>> {
        let mut result = self
            .graph
            .execute(to_query(query.cypher()))
            .await
            .context("Neo4j query failed")?;

        let mut records = Vec::new();
        while let Some(row) = result.next().await.context("Failed to read Neo4j row")? {
            records.push(decode_row(&row, query.columns()));
        }
        Ok(records)
    }

    async fn prepare(&self) -> Result<()> {
        schema::initialize_schema(self).await
    }
}

impl From<PropertyValue> for BoltType {
    fn from(value: PropertyValue) -> Self {
        match value {
            PropertyValue::Int(v) => v.into(),
            PropertyValue::Float(v) => v.into(),
            PropertyValue::Text(v) => v.into(),
            PropertyValue::Bool(v) => v.into(),
        }
    }
}

/// The `affected` column every write statement returns.
fn affected_count(row: &Row) -> Result<usize> {
    let affected = row
        .get::<i64>("affected")
        .context("Result row has no integer `affected` column")?;
    Ok(affected.max(0) as usize)
}

fn to_query(cypher: Cypher) -> Query {
    cypher
        .params
        .into_iter()
        .fold(Query::new(cypher.text), |query, (name, value)| query.param(&name, value))
}

/// Null or absent columns are left out of the record.
fn decode_row(row: &Row, columns: &[(&str, ColumnKind)]) -> Record {
    let mut record = Record::new();
    for (name, kind) in columns {
        let value = match kind {
            ColumnKind::Int => row.get::<Option<i64>>(name).ok().flatten().map(PropertyValue::Int),
            ColumnKind::Text => row
                .get::<Option<String>>(name)
                .ok()
                .flatten()
                .map(PropertyValue::Text),
        };
        if let Some(value) = value {
            record.insert(*name, value);
        }
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use neo4rs::BoltList;

    fn row(column: &str, value: BoltType) -> Row {
        Row::new(
            BoltList::from(vec![BoltType::from(column)]),
            BoltList::from(vec![value]),
        )
    }

    #[test]
    fn test_affected_count_reads_integer_column() {
        assert_eq!(affected_count(&row("affected", BoltType::from(3i64))).unwrap(), 3);
    }

    #[test]
    fn test_affected_count_rejects_undecodable_row() {
        assert!(affected_count(&row("affected", BoltType::from("three"))).is_err());
        assert!(affected_count(&row("count", BoltType::from(3i64))).is_err());
    }
}
