//! Sportsgraph Core Library
//!
//! Typed graph model for sports events, construction of that graph from raw
//! scoreboard events, and the on-disk archive that sits between the two.

pub mod agency;
pub mod archive;
pub mod config;
pub mod error;
pub mod event;
pub mod model;
pub mod scoreboard;

pub use error::{SportsError, SportsResult};
pub use model::{GraphSports, NodeLabel, RelationType};
