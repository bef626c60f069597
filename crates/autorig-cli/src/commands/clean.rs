//! Clean command implementation
//!
//! Removes everything the pipeline built and restores the template bones.

use anyhow::{Context, Result};
use autorig_rig::{operators, Workspace};
use colored::Colorize;
use std::path::Path;
use std::process::ExitCode;

use crate::input::{load_rig, write_json};

/// Run the clean command
///
/// # Arguments
/// * `rig_path` - Path to the rig JSON file
/// * `out` - Path of the cleaned rig JSON file to write
///
/// # Returns
/// Exit code: 0 success
pub fn run(rig_path: &str, out: &str) -> Result<ExitCode> {
    let rig = load_rig(Path::new(rig_path))?;
    let mut workspace = Workspace::with_rig(rig);
    let report = operators::clean(&mut workspace).context("Failed to clean rig")?;
    write_json(Path::new(out), workspace.active().context("Failed to clean rig")?)?;

    println!(
        "{} Removed {} bones, {} constraints, {} drivers, {} hooks",
        "SUCCESS".green().bold(),
        report.bones_removed,
        report.constraints_removed,
        report.drivers_removed,
        report.modifiers_removed
    );
    println!("{} {}", "Rig:".dimmed(), out);
    Ok(ExitCode::SUCCESS)
}
