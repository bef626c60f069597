//! Template command implementation
//!
//! Writes the built-in humanoid template.

use anyhow::{Context, Result};
use autorig_armature::TemplateAsset;
use colored::Colorize;
use std::path::Path;
use std::process::ExitCode;

use crate::input::write_json;

/// Run the template command
///
/// # Arguments
/// * `out` - Path of the template JSON file to write
///
/// # Returns
/// Exit code: 0 success
pub fn run(out: &str) -> Result<ExitCode> {
    let template = TemplateAsset::humanoid();
    write_json(Path::new(out), &template)?;
    println!(
        "{} Wrote template with {} bones to: {}",
        "SUCCESS".green().bold(),
        template.bones.len(),
        out
    );
    let hash = template.content_hash().context("Failed to hash template")?;
    println!("{} {}", "Hash:".dimmed(), hash);
    Ok(ExitCode::SUCCESS)
}
