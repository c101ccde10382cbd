//! Markdown and JSON report generation.
//!
//! This module renders the outcome of a `sum` or `count` run.

use crate::cli::OutputFormat;
use crate::models::{
    AgentReport, CounterReport, Reduction, ReductionReport, RunMetadata, WatchdogOutcome,
};
use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

/// Render a reduction report in the requested format.
pub fn render_reduction(report: &ReductionReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Markdown => Ok(generate_reduction_markdown(report)),
        OutputFormat::Json => generate_json_report(report),
    }
}

/// Render a counter report in the requested format.
pub fn render_counter(report: &CounterReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Markdown => Ok(generate_counter_markdown(report)),
        OutputFormat::Json => generate_json_report(report),
    }
}

/// Generate the Markdown report for a parallel sum.
pub fn generate_reduction_markdown(report: &ReductionReport) -> String {
    let mut output = String::new();

    output.push_str("# cotask Sum Report\n\n");
    output.push_str(&generate_metadata_section(&report.metadata));

    output.push_str("## Input\n\n");
    output.push_str(&format!("- **Source:** {}\n", report.source));
    output.push_str(&format!(
        "- **Shape:** {} rows x {} columns\n\n",
        report.rows, report.cols
    ));

    output.push_str(&generate_partitions_section(&report.reduction));

    output.push_str("## Result\n\n");
    output.push_str(&format!("**Total:** {}\n\n", report.reduction.total));
    output.push_str(&format!(
        "Computed in {:.3} ms.\n\n",
        report.reduction.elapsed_ms
    ));

    output.push_str(&generate_footer());
    output
}

fn generate_partitions_section(reduction: &Reduction) -> String {
    let mut section = String::new();

    section.push_str("## Partitions\n\n");
    section.push_str(&format!(
        "{} worker(s) requested, {} spawned",
        reduction.requested_workers,
        reduction.spawned_workers()
    ));
    if reduction.idle_workers() > 0 {
        section.push_str(&format!(", {} left idle", reduction.idle_workers()));
    }
    section.push_str(".\n\n");

    if reduction.partials.is_empty() {
        section.push_str("*The matrix has no rows; nothing was spawned.*\n\n");
        return section;
    }

    section.push_str("| Worker | Rows | Partial Sum |\n");
    section.push_str("|---:|:---|---:|\n");
    for partial in &reduction.partials {
        section.push_str(&format!(
            "| {} | {} | {} |\n",
            partial.worker, partial.partition, partial.value
        ));
    }
    section.push('\n');

    section
}

/// Generate the Markdown report for a counter run.
pub fn generate_counter_markdown(report: &CounterReport) -> String {
    let mut output = String::new();

    output.push_str("# cotask Counter Report\n\n");
    output.push_str(&generate_metadata_section(&report.metadata));

    output.push_str("## Settings\n\n");
    output.push_str(&format!("- **Tick:** {} ms\n", report.tick_ms));
    output.push_str(&format!(
        "- **Watchdog Deadline:** {} s\n\n",
        report.deadline_secs
    ));

    output.push_str(&generate_agent_section(&report.agent));
    output.push_str(&generate_watchdog_section(report.watchdog.as_ref()));
    output.push_str(&generate_footer());

    output
}

fn generate_agent_section(agent: &AgentReport) -> String {
    let mut section = String::new();

    section.push_str("## Agent\n\n");
    section.push_str(&format!("- **Ticks:** {}\n", agent.ticks));
    section.push_str(&format!("- **Values Published:** {}\n", agent.published));
    if agent.failed_publishes > 0 {
        section.push_str(&format!(
            "- **Values Lost:** {}\n",
            agent.failed_publishes
        ));
    }
    section.push_str(&format!("- **Final Counter:** {}\n", agent.final_counter));
    section.push_str(&format!("- **Final Direction:** {}\n", agent.final_direction));
    let stopped_by = agent
        .stopped_by
        .map_or_else(|| "unknown".to_string(), |s| s.to_string());
    section.push_str(&format!("- **Stopped By:** {}\n\n", stopped_by));

    section
}

fn generate_watchdog_section(outcome: Option<&WatchdogOutcome>) -> String {
    let mut section = String::new();

    section.push_str("## Watchdog\n\n");
    match outcome {
        Some(outcome) => {
            let how = if outcome.interrupted {
                "interrupted"
            } else {
                "deadline reached"
            };
            section.push_str(&format!(
                "- **Fired:** after {} ms ({})\n",
                outcome.elapsed_ms, how
            ));
            section.push_str(&format!(
                "- **Stopped The Agent:** {}\n\n",
                if outcome.stopped_agent { "yes" } else { "no" }
            ));
        }
        None => section.push_str("Disarmed before firing.\n\n"),
    }

    section
}

fn generate_metadata_section(metadata: &RunMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Version:** {}\n\n", metadata.tool_version));

    section
}

fn generate_footer() -> String {
    "---\n\n*Report generated by cotask*\n".to_string()
}

/// Generate a JSON report.
pub fn generate_json_report<T: Serialize>(report: &T) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Write rendered report content to a file.
pub fn write_report(content: &str, path: &Path) -> Result<()> {
    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create report file: {}", path.display()))?;
    file.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write report file: {}", path.display()))?;

    Ok(())
}
