//! Build and load commands.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context as _, Result};
use chrono::NaiveDate;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use tracing::{error, info, warn};

use sportsgraph_core::archive::Archive;
use sportsgraph_core::event::build_graph;
use sportsgraph_core::scoreboard::events_from_document;
use sportsgraph_graph::{GraphStore, MaterializeReport, Materializer};

use super::Context;
use crate::output;

/// Outcome of a build.
#[derive(Debug, Default)]
pub struct BuildSummary {
    pub written: Vec<PathBuf>,
    pub warnings: usize,
    pub failed: Vec<String>,
}

/// Turn the day's raw events into one graph file per game.
///
/// An event that cannot be built is skipped and named in the summary; the
/// command still fails once every other event has been written.
pub fn build(ctx: &Context, date: NaiveDate, input: Option<&Path>) -> Result<BuildSummary> {
    let archive = ctx.archive();
    let events = raw_events(&archive, date, input)?;
    println!(
        "{} {} events for {}",
        "Building".bold(),
        events.len(),
        date.to_string().cyan()
    );

    let mut summary = BuildSummary::default();
    for event in &events {
        let event_id = event_label(event);
        match build_graph(event) {
            Ok(construction) => {
                summary.warnings += construction.warnings.len();
                let path = archive.write_graph(date, &construction.graph)?;
                summary.written.push(path);
            }
            Err(err) => {
                error!(event = %event_id, error = %err, "Skipping event");
                summary.failed.push(event_id);
            }
        }
    }

    output::print_build_summary(&summary);
    if !summary.failed.is_empty() {
        bail!("{} of {} events could not be built", summary.failed.len(), events.len());
    }
    Ok(summary)
}

/// The event id as written in the document, for messages.
fn event_label(event: &Value) -> String {
    match event.get("id") {
        Some(Value::String(id)) => id.clone(),
        Some(other) => other.to_string(),
        None => "?".to_string(),
    }
}

/// Events from `input` (archived for `date` as a side effect), else the archived raw events.
fn raw_events(archive: &Archive, date: NaiveDate, input: Option<&Path>) -> Result<Vec<Value>> {
    let Some(input) = input else {
        return archive
            .read_raw_events(date)
            .with_context(|| format!("No raw events archived for {date}; pass --input"));
    };

    let text = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let document: Value = serde_json::from_str(&text)
        .with_context(|| format!("{} is not valid JSON", input.display()))?;
    let events = events_from_document(&document)?;
    archive.write_raw_events(date, &events)?;
    Ok(events)
}

/// Materialize the archived graphs of a date.
pub async fn load(ctx: &Context, date: NaiveDate, game: Option<i64>) -> Result<()> {
    let files = ctx.archive().graph_files(date, game)?;
    if files.is_empty() {
        warn!(%date, "No game graphs to load");
        println!("{}", "No game graphs found.".dimmed());
        return Ok(());
    }

    let store = ctx.open_store().await?;
    let reports = load_files(store.as_ref(), &files).await?;
    output::print_load_summary(&reports, ctx.dry_run);
    Ok(())
}

/// Materialize graph files one game at a time, stopping at the first failure.
///
/// A failed game leaves its graph file in place; loading the date again
/// re-applies every game safely.
pub async fn load_files(
    store: &dyn GraphStore,
    files: &[PathBuf],
) -> Result<Vec<MaterializeReport>> {
    let progress = ProgressBar::new(files.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );

    let materializer = Materializer::new(store);
    let mut reports = Vec::with_capacity(files.len());
    for path in files {
        progress.set_message(path.display().to_string());
        let graph = Archive::read_graph(path)
            .with_context(|| format!("Invalid game graph {}", path.display()))?;
        let report = materializer.materialize(&graph).await;
        match report {
            Ok(report) => reports.push(report),
            Err(err) => {
                progress.abandon();
                return Err(err.context(format!("Loading stopped at {}", path.display())));
            }
        }
        progress.inc(1);
    }
    progress.finish_and_clear();

    info!(games = reports.len(), "Games loaded");
    Ok(reports)
}

/// Build the date's graphs, then load them.
pub async fn run(ctx: &Context, date: NaiveDate, input: Option<&Path>) -> Result<()> {
    build(ctx, date, input)?;
    load(ctx, date, None).await
}
