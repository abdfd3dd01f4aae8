//! Persisted CLI settings.
//!
//! Settings live in `settings.toml` under the platform config folder:
//! - macOS: ~/Library/Application Support/com.crm-migrate.CRM-Migrate/
//! - Windows: %APPDATA%/crm-migrate/CRM Migrate/config/
//! - Linux: ~/.config/crm-migrate/
//!
//! Every table is optional; missing keys take their defaults.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use crm_map::llm::DEFAULT_BATCH_SIZE;
use crm_map::{DEFAULT_THRESHOLD, LlmProvider, ResolverConfig};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

const APP_QUALIFIER: &str = "com";
const APP_ORG: &str = "crm-migrate";
const APP_NAME: &str = "CRM Migrate";
const CONFIG_FILENAME: &str = "settings.toml";

/// Environment variable holding the LLM API key. Wins over the file.
pub const LLM_API_KEY_ENV: &str = "CRM_MIGRATE_LLM_API_KEY";

/// Environment variable holding the org access token.
pub const ACCESS_TOKEN_ENV: &str = "CRM_MIGRATE_ACCESS_TOKEN";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub mapping: MappingSettings,
    pub llm: LlmSettings,
    pub connection: ConnectionSettings,
}

/// `[mapping]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingSettings {
    /// Minimum confidence for a proposed mapping.
    pub threshold: f64,
    pub use_semantic: bool,
    /// Where saved mapping configurations are kept.
    pub mappings_dir: Option<PathBuf>,
}

impl Default for MappingSettings {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            use_semantic: true,
            mappings_dir: None,
        }
    }
}

/// `[llm]` table.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub enabled: bool,
    pub provider: LlmProvider,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub batch_size: usize,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: LlmProvider::default(),
            model: None,
            base_url: None,
            api_key: None,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl fmt::Debug for LlmSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmSettings")
            .field("enabled", &self.enabled)
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("batch_size", &self.batch_size)
            .finish()
    }
}

/// `[connection]` table.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionSettings {
    /// e.g. `https://acme.my.salesforce.com`
    pub instance_url: Option<String>,
    pub access_token: Option<String>,
}

impl fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("instance_url", &self.instance_url)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Settings {
    /// Resolver settings. `env_api_key` takes precedence over the file's key.
    pub fn resolver_config(&self, env_api_key: Option<String>) -> ResolverConfig {
        ResolverConfig {
            threshold: self.mapping.threshold,
            use_semantic: self.mapping.use_semantic,
            use_llm: self.llm.enabled,
            llm_provider: self.llm.provider,
            llm_model: self.llm.model.clone(),
            llm_api_key: non_blank(env_api_key).or_else(|| non_blank(self.llm.api_key.clone())),
            llm_base_url: self.llm.base_url.clone(),
            llm_batch_size: self.llm.batch_size.max(1),
        }
    }

    /// Directory for saved mapping configurations.
    pub fn mappings_dir(&self) -> PathBuf {
        self.mapping.mappings_dir.clone().unwrap_or_else(|| {
            ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_NAME).map_or_else(
                || PathBuf::from("mappings"),
                |dirs| dirs.data_dir().join("mappings"),
            )
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Get the path to the default settings file.
///
/// Returns `None` if the platform-specific directory cannot be determined.
pub fn settings_path() -> Option<PathBuf> {
    ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_NAME)
        .map(|dirs| dirs.config_dir().join(CONFIG_FILENAME))
}

/// Parse settings from TOML text.
pub fn parse_settings(content: &str) -> Result<Settings> {
    toml::from_str(content).context("invalid settings file")
}

/// Load settings.
///
/// An explicit `path` must exist and parse. Without one, the default file is
/// read when present; a missing or unreadable default file yields defaults.
pub fn load_settings(path: Option<&Path>) -> Result<Settings> {
    if let Some(path) = path {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings {}", path.display()))?;
        let settings = parse_settings(&content)
            .with_context(|| format!("failed to load settings {}", path.display()))?;
        tracing::info!(path = %path.display(), "Loaded settings");
        return Ok(settings);
    }

    let Some(path) = settings_path() else {
        tracing::warn!("Could not determine settings path, using defaults");
        return Ok(Settings::default());
    };

    match fs::read_to_string(&path) {
        Ok(content) => match parse_settings(&content) {
            Ok(settings) => {
                tracing::info!(path = %path.display(), "Loaded settings");
                Ok(settings)
            }
            Err(error) => {
                tracing::warn!(path = %path.display(), "{error:#}, using defaults");
                Ok(Settings::default())
            }
        },
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "No settings file, using defaults");
            Ok(Settings::default())
        }
        Err(error) => {
            tracing::warn!(path = %path.display(), "Failed to read settings file: {error}, using defaults");
            Ok(Settings::default())
        }
    }
}
