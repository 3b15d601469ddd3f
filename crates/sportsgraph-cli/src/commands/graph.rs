//! Store-wide commands: consolidation, agents, pairs, status, schema.

use std::path::Path;

use anyhow::{Context as _, Result};
use colored::Colorize;

use sportsgraph_core::agency::read_agent_table;
use sportsgraph_graph::agents::{agent_athlete_pairs, ingest_agents};
use sportsgraph_graph::GraphStore;

use super::Context;
use crate::output;

/// Merge duplicate athletes and team abbreviation variants.
///
/// Must not run while a load is in progress.
pub async fn consolidate(ctx: &Context) -> Result<()> {
    println!("{}", "Consolidating graph...".bold());
    let store = ctx.open_store().await?;
    let report = sportsgraph_graph::consolidate(store.as_ref()).await?;
    output::print_consolidation_report(&report);
    Ok(())
}

/// Add agent nodes and represent edges from an agent table file.
pub async fn agents(ctx: &Context, file: &Path) -> Result<()> {
    let listings = read_agent_table(file)
        .with_context(|| format!("Failed to read agent table {}", file.display()))?;
    let store = ctx.open_store().await?;
    let report = ingest_agents(store.as_ref(), &listings).await?;
    output::print_agent_report(&report);
    Ok(())
}

pub async fn pairs(ctx: &Context, json: bool) -> Result<()> {
    let store = ctx.open_store().await?;
    let pairs = agent_athlete_pairs(store.as_ref()).await?;
    if json {
        let rows: Vec<_> = pairs
            .iter()
            .map(|(agent, athlete)| serde_json::json!({"agent": agent, "athlete": athlete}))
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        output::print_pairs(&pairs);
    }
    Ok(())
}

pub async fn status(ctx: &Context) -> Result<()> {
    let store = ctx.open_store().await?;
    let counts = store.counts().await?;
    output::print_status(&ctx.config.store.uri, &counts, ctx.dry_run);
    Ok(())
}

/// Create lookup indexes. Safe to repeat.
pub async fn schema(ctx: &Context) -> Result<()> {
    let store = ctx.open_store().await?;
    store.prepare().await?;
    println!("{}", "Schema ready.".green());
    Ok(())
}
