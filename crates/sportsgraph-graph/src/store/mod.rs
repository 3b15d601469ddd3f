//! Graph store abstraction.
//!
//! The pipeline needs exactly two capabilities from a store: run a batch of
//! write statements in one scoped session, and run a read. [`Neo4jStore`]
//! talks to a live database; [`MemoryStore`] keeps an in-process property
//! graph with the same merge semantics.

pub mod memory;
pub mod neo4j;

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

use crate::statement::{ReadQuery, Record, Statement};

pub use memory::MemoryStore;
pub use neo4j::Neo4jStore;

/// Store conditions callers need to tell apart from plain failures.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Statement matched no endpoints: {statement}")]
    UnmatchedEndpoint { statement: String },

    #[error("Graph rejected before writing: {0}")]
    InvalidGraph(#[from] sportsgraph_core::SportsError),
}

/// A property graph the pipeline can write to and read from.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Run `statements` in order within one session and return the affected
    /// row count of each.
    ///
    /// Fails on the first error, including a statement that
    /// [requires a match](Statement::requires_match) affecting zero rows.
    /// The session is released on every path; writes already issued in a
    /// failed batch are not guaranteed to be undone, so callers recover by
    /// re-running the whole batch.
    async fn run(&self, statements: &[Statement]) -> Result<Vec<usize>>;

    /// Run a read query.
    async fn fetch(&self, query: &ReadQuery) -> Result<Vec<Record>>;

    /// One-time store preparation such as indexes. Safe to repeat.
    async fn prepare(&self) -> Result<()> {
        Ok(())
    }

    /// Node and relationship totals.
    async fn counts(&self) -> Result<GraphCounts> {
        let rows = self.fetch(&ReadQuery::Counts).await?;
        let row = rows.into_iter().next().unwrap_or_default();
        Ok(GraphCounts {
            nodes: row.int("nodes").unwrap_or(0) as usize,
            relationships: row.int("relationships").unwrap_or(0) as usize,
        })
    }
}

/// Node and relationship counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphCounts {
    pub nodes: usize,
    pub relationships: usize,
}

/// Turn an empty match into [`StoreError::UnmatchedEndpoint`].
pub(crate) fn check_affected(statement: &Statement, affected: usize) -> Result<()> {
    if affected == 0 && statement.requires_match() {
        return Err(StoreError::UnmatchedEndpoint { statement: statement.to_string() }.into());
    }
    Ok(())
}
