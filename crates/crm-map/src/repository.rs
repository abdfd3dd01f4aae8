//! Saved mapping configurations on disk.
//!
//! Each configuration is one pretty-printed JSON file named after the
//! sanitized configuration name. Writes go through a temp file and a rename.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use crm_model::MappingConfiguration;

const EXTENSION: &str = "json";

/// Directory of saved mapping configurations.
#[derive(Debug, Clone)]
pub struct MappingRepository {
    dir: PathBuf,
}

impl MappingRepository {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File a configuration named `name` is stored in.
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.{EXTENSION}", sanitize_name(name)))
    }

    pub fn save(&self, config: &MappingConfiguration) -> Result<PathBuf> {
        let path = self.path_for(&config.name);
        save_to_path(config, &path)?;
        Ok(path)
    }

    pub fn load(&self, name: &str) -> Result<MappingConfiguration> {
        load_from_path(&self.path_for(name))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path_for(name).is_file()
    }

    /// Returns whether a file was removed.
    pub fn delete(&self, name: &str) -> Result<bool> {
        let path = self.path_for(name);
        if !path.is_file() {
            return Ok(false);
        }
        fs::remove_file(&path)
            .with_context(|| format!("failed to delete {}", path.display()))?;
        Ok(true)
    }

    /// All readable configurations, sorted by name. Unreadable files are
    /// skipped with a warning.
    pub fn list(&self) -> Result<Vec<MappingConfiguration>> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&self.dir)
            .with_context(|| format!("failed to read {}", self.dir.display()))?;

        let mut configs = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            match load_from_path(&path) {
                Ok(config) => configs.push(config),
                Err(error) => {
                    tracing::warn!(path = %path.display(), error = %format!("{error:#}"), "Skipping unreadable mapping file");
                }
            }
        }
        configs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(configs)
    }
}

/// Write a configuration to an arbitrary path.
pub fn save_to_path(config: &MappingConfiguration, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let json = serde_json::to_string_pretty(config).context("failed to serialize mapping")?;
    let temp_path = path.with_extension("json.tmp");
    let mut file = File::create(&temp_path)
        .with_context(|| format!("failed to create {}", temp_path.display()))?;
    file.write_all(json.as_bytes())
        .with_context(|| format!("failed to write {}", temp_path.display()))?;
    file.sync_all()
        .with_context(|| format!("failed to sync {}", temp_path.display()))?;
    fs::rename(&temp_path, path)
        .with_context(|| format!("failed to move mapping into {}", path.display()))?;

    tracing::info!(path = %path.display(), mappings = config.mappings.len(), "Saved mapping configuration");
    Ok(())
}

/// Read a configuration from an arbitrary path.
pub fn load_from_path(path: &Path) -> Result<MappingConfiguration> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let config: MappingConfiguration = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse mapping file {}", path.display()))?;
    tracing::debug!(path = %path.display(), name = %config.name, "Loaded mapping configuration");
    Ok(config)
}

/// File-safe form of a configuration name.
pub fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "mapping".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitized_names_are_file_safe() {
        assert_eq!(sanitize_name("Account import v2"), "Account_import_v2");
        assert_eq!(sanitize_name("../etc/passwd"), "___etc_passwd");
        assert_eq!(sanitize_name("   "), "mapping");
    }
}
