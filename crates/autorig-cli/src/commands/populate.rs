//! Populate command implementation
//!
//! Instantiates a template, runs the assembly pipeline and writes the rig.

use anyhow::{Context, Result};
use autorig_rig::{operators, PopulateReport, StageOutcome, Workspace};
use colored::Colorize;
use std::path::Path;
use std::process::ExitCode;

use crate::input::{load_config, load_template, write_json};

/// Run the populate command
///
/// # Arguments
/// * `template_path` - Path to the template JSON file
/// * `config_path` - Optional rig config JSON file
/// * `out` - Path of the rig JSON file to write
/// * `json_output` - Print the stage report as JSON
///
/// # Returns
/// Exit code: 0 if every stage completed, 1 otherwise
pub fn run(
    template_path: &str,
    config_path: Option<&str>,
    out: &str,
    json_output: bool,
) -> Result<ExitCode> {
    let template = load_template(Path::new(template_path))?;
    let config = load_config(config_path.map(Path::new))?;
    let hash = template.content_hash().context("Failed to hash template")?;
    tracing::info!(template = template_path, hash = %hash, "Loaded template");

    let mut workspace = Workspace::new();
    operators::add_armature(&mut workspace, &template).context("Failed to add armature")?;
    let report = operators::populate(&mut workspace, &config).context("Failed to populate rig")?;
    let rig = workspace.active().context("Failed to populate rig")?;
    write_json(Path::new(out), rig)?;

    if json_output {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        println!("{}", json);
    } else {
        print_report(&report);
        println!("{} {}", "Template:".dimmed(), hash);
        println!("{} {}", "Rig:".dimmed(), out);
    }

    Ok(if report.is_complete() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

fn print_report(report: &PopulateReport) {
    for entry in &report.stages {
        match &entry.outcome {
            StageOutcome::Completed {
                bones_added,
                constraints_added,
                drivers_added,
            } => println!(
                "  {} {} ({} bones, {} constraints, {} drivers)",
                "ok".green(),
                entry.stage,
                bones_added,
                constraints_added,
                drivers_added
            ),
            StageOutcome::Failed { error } => println!(
                "  {} {} [{}]: {}",
                "FAILED".red().bold(),
                entry.stage,
                error.code(),
                error
            ),
            StageOutcome::Skipped { reason } => {
                println!("  {} {}: {}", "skipped".yellow(), entry.stage, reason)
            }
        }
    }

    if report.is_complete() {
        println!(
            "{} Populated rig ({} bones added, {} inverses baked)",
            "SUCCESS".green().bold(),
            report.bones_added(),
            report.baked_inverses
        );
    } else {
        let failed = report.failures().count();
        let skipped = report.skipped().count();
        println!(
            "{} {} stage(s) failed, {} skipped",
            "INCOMPLETE".red().bold(),
            failed,
            skipped
        );
    }
}
