//! Tests for command inputs and settings files.

use std::fs;
use std::path::Path;

use crm_cli::inputs::{
    build_configuration, check_signature, load_describe, load_mapping, select_record_type,
};
use crm_cli::settings::load_settings;
use crm_map::{MappingRepository, ResolverConfig, resolve_mappings, save_to_path};
use crm_model::{
    FieldMapping, FieldType, MappingConfiguration, MatchMethod, SourceDataset, TargetField,
    TargetObject,
};
use tempfile::TempDir;

const DESCRIBE: &str = r#"{
    "name": "Account",
    "label": "Account",
    "labelPlural": "Accounts",
    "fields": [
        {"name": "Id", "label": "Account ID", "type": "id", "nillable": false},
        {"name": "Name", "label": "Account Name", "type": "string", "nillable": false,
         "createable": true, "updateable": true},
        {"name": "Rating", "type": "picklist", "createable": true, "updateable": true,
         "picklistValues": [{"value": "Hot"}, {"value": "Cold"}]}
    ]
}"#;

const RECORD_TYPES: &str = r#"{
    "records": [
        {"Id": "012000000000001AAA", "Name": "Partner", "DeveloperName": "Partner_Account", "IsActive": true},
        {"Id": "012000000000002AAA", "Name": "Legacy", "DeveloperName": "Legacy", "IsActive": false}
    ]
}"#;

fn write(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).expect("write fixture");
    path
}

#[test]
fn describe_with_record_types() {
    let dir = TempDir::new().expect("temp dir");
    let describe = write(dir.path(), "account.json", DESCRIBE);
    let record_types = write(dir.path(), "record_types.json", RECORD_TYPES);

    let object = load_describe(&describe, Some(&record_types)).expect("load describe");
    assert_eq!(object.name, "Account");
    assert_eq!(object.fields.len(), 3);
    assert_eq!(object.field("Rating").expect("rating").picklist_values, vec!["Hot", "Cold"]);
    assert_eq!(object.record_types.len(), 2);

    assert_eq!(
        select_record_type(&object, Some("partner_account")).expect("select"),
        Some("012000000000001AAA".to_string())
    );
    assert_eq!(
        select_record_type(&object, Some("012000000000001AAA")).expect("select by id"),
        Some("012000000000001AAA".to_string())
    );
    assert_eq!(select_record_type(&object, None).expect("none"), None);
    assert!(select_record_type(&object, Some("Legacy")).is_err());
}

#[test]
fn malformed_describe_names_the_file() {
    let dir = TempDir::new().expect("temp dir");
    let describe = write(dir.path(), "broken.json", r#"{"label": "No name"}"#);
    let err = load_describe(&describe, None).expect_err("missing name");
    assert!(format!("{err:#}").contains("broken.json"));
}

#[test]
fn mapping_by_path_or_saved_name() {
    let dir = TempDir::new().expect("temp dir");
    let repository = MappingRepository::new(dir.path().join("mappings"));

    let mut config = MappingConfiguration::new("Partner Accounts", "Account");
    config.add_mapping(FieldMapping::new("Company", "Name").required(true));
    repository.save(&config).expect("save");

    let loaded = load_mapping("Partner Accounts", &repository).expect("load by name");
    assert_eq!(loaded.id, config.id);

    let path = dir.path().join("export.json");
    save_to_path(&config, &path).expect("save to path");
    let loaded = load_mapping(path.to_str().expect("utf-8 path"), &repository).expect("load by path");
    assert_eq!(loaded.mappings, config.mappings);

    let err = load_mapping("Unknown", &repository).expect_err("missing mapping");
    assert!(err.to_string().contains("Unknown"));
}

#[test]
fn signature_reports_missing_columns() {
    let mut config = MappingConfiguration::new("Contacts", "Contact");
    let columns = ["First Name", "Email Addr", "Amt"].map(String::from);
    assert!(check_signature(&config, &columns).is_empty());

    config.set_source_columns(&columns);
    assert!(check_signature(&config, &columns).is_empty());

    let renamed = ["First Name", "E-mail", "Amt", "Extra"].map(String::from);
    assert_eq!(check_signature(&config, &renamed), vec!["Email Addr".to_string()]);
}

#[test]
fn explicit_settings_file() {
    let dir = TempDir::new().expect("temp dir");
    let path = write(
        dir.path(),
        "settings.toml",
        r#"
        [mapping]
        threshold = 0.8
        use_semantic = false

        [llm]
        enabled = true
        provider = "openai"
        batch_size = 20
        "#,
    );

    let settings = load_settings(Some(&path)).expect("load settings");
    assert_eq!(settings.mapping.threshold, 0.8);
    let config = settings.resolver_config(None);
    assert!(!config.use_semantic);
    assert!(config.use_llm);
    assert!(!config.llm_ready());
    assert_eq!(config.llm_batch_size, 20);
    assert_eq!(config.fuzzy_threshold(config.llm_ready()), 0.8);
    assert_eq!(config.fuzzy_threshold(false), 0.8);

    assert!(load_settings(Some(&dir.path().join("missing.toml"))).is_err());

    let broken = write(dir.path(), "broken.toml", "[mapping\nthreshold = ");
    assert!(load_settings(Some(&broken)).is_err());
}

#[test]
fn saved_configuration_keeps_one_column_per_field() {
    let object = TargetObject::new(
        "Contact",
        "Contact",
        vec![
            TargetField::new("FirstName", "First Name", FieldType::String),
            TargetField::new("Email", "Email", FieldType::Email),
        ],
    );
    let dataset = SourceDataset::from_column_names(["First Name", "first_name", "Email"]);
    let resolution = resolve_mappings(&dataset, &object, &ResolverConfig::fuzzy_only(0.6));
    assert_eq!(
        resolution.mappings.iter().filter(|m| m.target_field == "FirstName").count(),
        2
    );

    let config = build_configuration("Contacts", "Contact", &resolution.mappings, &dataset.column_names());
    assert_eq!(config.mappings.len(), 2);
    assert_eq!(config.mapped_target_fields().len(), config.mappings.len());
    assert_eq!(config.mapping_for_field("FirstName").expect("first name").source_column, "First Name");
    let signature = config.source_file_signature.as_ref().expect("signature");
    assert_eq!(signature.expected_columns.len(), 3);

    let mappings = [
        FieldMapping::new("mail", "Email").with_match(0.65, MatchMethod::Fuzzy),
        FieldMapping::new("Email Address", "Email").with_match(0.9, MatchMethod::Semantic),
        FieldMapping::new("E-mail", "Email"),
    ];
    let config = build_configuration("Contacts", "Contact", &mappings, &[]);
    assert_eq!(config.mappings.len(), 1);
    assert_eq!(config.mappings[0].source_column, "Email Address");
}
