use std::fs;

use crm_map::{MappingRepository, load_from_path, save_to_path};
use crm_model::{FieldMapping, MappingConfiguration};
use tempfile::tempdir;

fn sample_config(name: &str) -> MappingConfiguration {
    let mut config = MappingConfiguration::new(name, "Account").with_description("Legacy accounts");
    config.add_mapping(FieldMapping::new("Company", "Name").required(true));
    config.add_mapping(FieldMapping::new("Tel", "Phone").with_match(0.82, crm_model::MatchMethod::Fuzzy));
    config.set_source_columns(&["Company".to_string(), "Tel".to_string()]);
    config
}

#[test]
fn repository_save_and_load() {
    let dir = tempdir().expect("create temp dir");
    let repo = MappingRepository::new(dir.path());

    let config = sample_config("Legacy accounts");
    let path = repo.save(&config).expect("save mapping");
    assert!(path.ends_with("Legacy_accounts.json"));
    assert!(repo.exists("Legacy accounts"));

    let loaded = repo.load("Legacy accounts").expect("load mapping");
    assert_eq!(loaded.id, config.id);
    assert_eq!(loaded.salesforce_object, "Account");
    assert_eq!(loaded.mappings.len(), 2);
    assert!(loaded.mapping_for_field("Name").expect("name mapping").is_required);
    // Session-only match details are not persisted.
    let phone = loaded.mapping_for_field("Phone").expect("phone mapping");
    assert_eq!(phone.confidence, None);
    assert_eq!(phone.method, None);
    assert_eq!(loaded.created_date, config.created_date);
    assert_eq!(loaded.modified_date, config.modified_date);
    assert!(loaded.check_source_columns(&["Company".to_string()]).contains(&"Tel".to_string()));
}

#[test]
fn repository_list_and_delete() {
    let dir = tempdir().expect("create temp dir");
    let repo = MappingRepository::new(dir.path().join("mappings"));
    assert!(repo.list().expect("list empty").is_empty());

    repo.save(&sample_config("b")).expect("save b");
    repo.save(&sample_config("a")).expect("save a");
    fs::write(dir.path().join("mappings").join("broken.json"), "{not json").expect("write broken");

    let names: Vec<String> = repo.list().expect("list").into_iter().map(|c| c.name).collect();
    assert_eq!(names, vec!["a", "b"]);

    assert!(repo.delete("a").expect("delete a"));
    assert!(!repo.delete("a").expect("delete a again"));
    assert!(!repo.exists("a"));
}

#[test]
fn load_applies_defaults_for_missing_keys() {
    let dir = tempdir().expect("create temp dir");
    let path = dir.path().join("minimal.json");
    fs::write(
        &path,
        r#"{
            "id": "8c1f5f0e-0000-4000-8000-000000000001",
            "name": "Minimal",
            "salesforce_object": "Contact",
            "created_date": "2024-01-05T10:00:00",
            "modified_date": "2024-01-05T10:00:00",
            "mappings": [{"source_column": "Mail", "target_field": "Email"}]
        }"#,
    )
    .expect("write mapping");

    let config = load_from_path(&path).expect("load minimal");
    assert_eq!(config.version, "1.0");
    assert_eq!(config.description, "");
    assert_eq!(config.mappings[0].mapping_type, "direct");
    assert!(!config.mappings[0].is_required);
    assert_eq!(config.mappings[0].transform_expr, None);

    let copy = dir.path().join("nested").join("copy.json");
    save_to_path(&config, &copy).expect("save copy");
    assert_eq!(load_from_path(&copy).expect("reload"), config);
}

#[test]
fn load_reports_the_failing_path() {
    let dir = tempdir().expect("create temp dir");
    let path = dir.path().join("missing.json");
    let error = load_from_path(&path).expect_err("missing file");
    assert!(format!("{error:#}").contains("missing.json"));
}
