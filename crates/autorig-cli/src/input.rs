//! Loading and writing rig files.

use anyhow::{Context, Result};
use autorig_armature::{RigInstance, TemplateAsset};
use autorig_rig::RigConfig;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Loads a template asset from a JSON file.
pub fn load_template(path: &Path) -> Result<TemplateAsset> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read template file: {}", path.display()))?;
    TemplateAsset::from_json(&content)
        .with_context(|| format!("Failed to parse template: {}", path.display()))
}

/// Loads a rig instance from a JSON file.
pub fn load_rig(path: &Path) -> Result<RigInstance> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read rig file: {}", path.display()))?;
    RigInstance::from_json(&content)
        .with_context(|| format!("Failed to parse rig: {}", path.display()))
}

/// Loads a rig config, or the default config when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<RigConfig> {
    let Some(path) = path else {
        return Ok(RigConfig::default());
    };
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config = RigConfig::from_json(&content)
        .with_context(|| format!("Failed to parse config: {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("Invalid config: {}", path.display()))?;
    Ok(config)
}

/// Writes a value as pretty JSON, creating parent directories.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(value).context("Failed to serialize JSON")?;
    fs::write(path, json).with_context(|| format!("Failed to write to: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_without_path() {
        assert_eq!(load_config(None).unwrap(), RigConfig::default());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.json");
        fs::write(&path, r#"{"spine_cuts": 0}"#).unwrap();
        let err = load_config(Some(&path)).unwrap_err();
        assert!(format!("{:#}", err).contains("spine_cuts"));

        fs::write(&path, r#"{"spine_cut": 4}"#).unwrap();
        assert!(load_config(Some(&path)).is_err());
    }

    #[test]
    fn test_write_json_creates_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested/dir/template.json");
        write_json(&path, &TemplateAsset::humanoid()).unwrap();
        let loaded = load_template(&path).unwrap();
        assert_eq!(loaded.bones.len(), TemplateAsset::humanoid().bones.len());
    }
}
