//! Manifest command implementation
//!
//! Exports a rig as host-facing records with data-path strings.

use anyhow::{Context, Result};
use autorig_armature::HostManifest;
use std::path::Path;
use std::process::ExitCode;

use crate::input::{load_rig, write_json};

/// Run the manifest command
///
/// # Arguments
/// * `rig_path` - Path to the rig JSON file
/// * `out` - Output file path (default: stdout)
///
/// # Returns
/// Exit code: 0 success
pub fn run(rig_path: &str, out: Option<&str>) -> Result<ExitCode> {
    let rig = load_rig(Path::new(rig_path))?;
    let manifest = HostManifest::from_rig(&rig)
        .with_context(|| format!("Failed to build manifest for: {}", rig_path))?;

    match out {
        Some(path) => write_json(Path::new(path), &manifest)?,
        None => println!(
            "{}",
            manifest.to_json_pretty().context("Failed to serialize manifest")?
        ),
    }
    Ok(ExitCode::SUCCESS)
}
