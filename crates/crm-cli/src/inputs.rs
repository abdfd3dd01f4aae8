//! Loading the files a command works from: object describes, saved mapping
//! configurations and record type selections.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use crm_map::{MappingRepository, load_from_path};
use crm_model::{FieldMapping, MappingConfiguration, TargetObject, parse_record_types};
use tracing::{info, warn};

/// Read an object describe payload, optionally with a record type query
/// result (`{"records": [...]}`).
pub fn load_describe(path: &Path, record_types: Option<&Path>) -> Result<TargetObject> {
    let describe = read_json(path)?;
    let record_types = match record_types {
        Some(path) => parse_record_types(&read_json(path)?)
            .with_context(|| format!("invalid record types in {}", path.display()))?,
        None => Vec::new(),
    };
    let object = TargetObject::from_describe(&describe, record_types)
        .with_context(|| format!("invalid describe payload in {}", path.display()))?;
    info!(object = %object.name, fields = object.fields.len(), "Loaded object describe");
    Ok(object)
}

fn read_json(path: &Path) -> Result<serde_json::Value> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
}

/// Build a configuration to save from resolved mappings.
///
/// Each field keeps one source column: the most confident one, or the
/// earliest on a tie.
pub fn build_configuration(
    name: &str,
    object: &str,
    mappings: &[FieldMapping],
    columns: &[String],
) -> MappingConfiguration {
    let mut config = MappingConfiguration::new(name, object);
    for mapping in mappings {
        match config.mapping_for_field(&mapping.target_field) {
            Some(kept) if kept.confidence.unwrap_or(0.0) >= mapping.confidence.unwrap_or(0.0) => {
                warn!(
                    column = %mapping.source_column,
                    field = %mapping.target_field,
                    kept = %kept.source_column,
                    "Field already mapped, dropping column"
                );
            }
            _ => config.add_mapping(mapping.clone()),
        }
    }
    config.set_source_columns(columns);
    config
}

/// Load a mapping configuration by file path, or by name from `repository`
/// when no such file exists.
pub fn load_mapping(reference: &str, repository: &MappingRepository) -> Result<MappingConfiguration> {
    let path = Path::new(reference);
    if path.is_file() {
        return load_from_path(path);
    }
    if repository.exists(reference) {
        return repository.load(reference);
    }
    bail!(
        "no mapping file '{reference}' and no saved mapping of that name in {}",
        repository.dir().display()
    )
}

/// Compare a source file's columns against the configuration's recorded
/// signature. Missing columns are logged and returned; they never block.
pub fn check_signature(config: &MappingConfiguration, columns: &[String]) -> Vec<String> {
    let missing = config.check_source_columns(columns);
    if !missing.is_empty() {
        warn!(
            mapping = %config.name,
            missing = %missing.join(", "),
            "Source file does not match the saved column signature"
        );
    }
    missing
}

/// Pick an active record type by id, developer name or label.
pub fn select_record_type(object: &TargetObject, selector: Option<&str>) -> Result<Option<String>> {
    let Some(selector) = selector.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    let found = object.active_record_types().find(|rt| {
        rt.id == selector
            || rt.developer_name.eq_ignore_ascii_case(selector)
            || rt.name.eq_ignore_ascii_case(selector)
    });
    match found {
        Some(record_type) => Ok(Some(record_type.id.clone())),
        None => bail!("no active record type '{selector}' on {}", object.name),
    }
}
