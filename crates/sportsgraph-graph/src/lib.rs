//! Sportsgraph Graph Store
//!
//! Persists sports graphs into a property-graph store. Game graphs are
//! upserted with merge semantics by [`materialize`], duplicate identities are
//! repaired by [`consolidate`], and agent representation is layered on by
//! [`agents`]. All of it goes through the [`GraphStore`] trait, implemented
//! for Neo4j and for an in-process graph.

pub mod agents;
pub mod consolidate;
pub mod materialize;
pub mod schema;
pub mod statement;
pub mod store;

pub use consolidate::{consolidate, ConsolidationReport};
pub use materialize::{MaterializeReport, Materializer, WritePlan};
pub use statement::{ReadQuery, Statement};
pub use store::{GraphCounts, GraphStore, MemoryStore, Neo4jStore, StoreError};
