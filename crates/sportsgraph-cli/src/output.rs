//! Terminal output formatting.

use colored::Colorize;
use sportsgraph_graph::agents::AgentReport;
use sportsgraph_graph::{ConsolidationReport, GraphCounts, MaterializeReport};

use crate::commands::pipeline::BuildSummary;

pub fn print_build_summary(summary: &BuildSummary) {
    println!("{}", "─".repeat(40));
    println!("  Graphs written: {}", summary.written.len().to_string().cyan());
    if summary.warnings > 0 {
        println!("  Warnings:       {}", summary.warnings.to_string().yellow());
    }
    if !summary.failed.is_empty() {
        println!("  Failed events:  {}", summary.failed.join(", ").red());
    }
}

pub fn print_load_summary(reports: &[MaterializeReport], dry_run: bool) {
    let nodes: usize = reports.iter().map(|r| r.nodes_merged).sum();
    let relationships: usize = reports.iter().map(|r| r.relationships_merged).sum();

    let heading = if dry_run { "Dry run complete:" } else { "Load complete:" };
    println!("\n{}", heading.green().bold());
    println!("  Games:                 {}", reports.len().to_string().cyan());
    println!("  Nodes merged:          {}", nodes);
    println!("  Relationships merged:  {}", relationships);
}

pub fn print_consolidation_report(report: &ConsolidationReport) {
    println!("\n{}", "Consolidation complete:".green().bold());
    println!("  Athletes merged:  {}", report.athletes_merged);
    println!("  Teams merged:     {}", report.teams_merged);
    println!("  Tenures spliced:  {}", report.tenures_spliced);

    if !report.ambiguous.is_empty() {
        println!("\n{} ({}):", "Left unmerged".yellow().bold(), report.ambiguous.len());
        for m in &report.ambiguous {
            println!(
                "  {} [{}] {} {}",
                "•".dimmed(),
                m.label.to_string().dimmed(),
                m.name,
                format!("({} candidates)", m.candidates.len()).dimmed()
            );
        }
    }
}

pub fn print_agent_report(report: &AgentReport) {
    println!("\n{}", "Agents ingested:".green().bold());
    println!("  Players:          {}", report.players);
    println!("  Agents:           {}", report.agents);
    println!("  Representations:  {}", report.representations);
    println!("  New athletes:     {}", report.athletes_created);

    if !report.shared_names.is_empty() {
        println!(
            "  {} {}",
            "Shared names:".yellow(),
            report.shared_names.join(", ")
        );
    }
}

pub fn print_pairs(pairs: &[(String, String)]) {
    if pairs.is_empty() {
        println!("{}", "No representations found.".dimmed());
        return;
    }

    println!("{:<30} {:<30}", "Agent", "Athlete");
    println!("{}", "─".repeat(60));
    for (agent, athlete) in pairs {
        println!("{:<30} {:<30}", agent, athlete);
    }
    println!();
    println!("{} pair(s) total", pairs.len());
}

pub fn print_status(uri: &str, counts: &GraphCounts, dry_run: bool) {
    println!("{}", "Graph Status".bold());
    println!("{}", "─".repeat(40));
    if dry_run {
        println!("  Store:         {}", "in-memory (dry run)".yellow());
    } else {
        println!("  Store:         {}", uri.green());
    }
    println!("  Nodes:         {}", counts.nodes.to_string().cyan());
    println!("  Relationships: {}", counts.relationships.to_string().cyan());
    println!("{}", "─".repeat(40));
}
