use std::sync::Mutex;

use crm_load::{
    BulkApi, Connection, JobInfo, LoadError, MetadataApi, RecordApi, ResultKind, SaveResult,
    SharedSession, fetch_layout_fields, fetch_object, sample_object, sample_records,
    select_preview_fields,
};
use crm_model::{FieldType, LoadOperation, TargetField, TargetObject, TargetRecord};
use serde_json::{Value, json};

/// Answers queries from canned payloads chosen by the `FROM` clause.
#[derive(Default)]
struct QueryOrg {
    queries: Mutex<Vec<String>>,
    tooling: Mutex<Vec<String>>,
    records: Value,
    layout_assignment: Value,
    layout: Value,
}

impl MetadataApi for QueryOrg {
    fn describe_global(&self) -> crm_load::Result<Value> {
        Err(LoadError::NotConnected)
    }

    fn describe_object(&self, _object: &str) -> crm_load::Result<Value> {
        Ok(json!({
            "name": "Account",
            "label": "Account",
            "fields": [
                {"name": "Id", "type": "id", "nillable": false},
                {"name": "Name", "type": "string", "nillable": false, "createable": true}
            ]
        }))
    }

    fn query(&self, soql: &str) -> crm_load::Result<Value> {
        self.queries.lock().expect("queries").push(soql.to_string());
        if soql.contains("FROM RecordType") {
            return Ok(json!({"records": [
                {"attributes": {"type": "RecordType"}, "Id": "012A", "Name": "Partner",
                 "DeveloperName": "Partner", "IsActive": true}
            ]}));
        }
        Ok(self.records.clone())
    }

    fn tooling_query(&self, soql: &str) -> crm_load::Result<Value> {
        self.tooling.lock().expect("tooling").push(soql.to_string());
        if soql.contains("SELECT Metadata") {
            Ok(self.layout.clone())
        } else {
            Ok(self.layout_assignment.clone())
        }
    }
}

impl RecordApi for QueryOrg {
    fn create(&self, _object: &str, _record: &TargetRecord) -> crm_load::Result<SaveResult> {
        Err(LoadError::NotConnected)
    }

    fn update(&self, _object: &str, _id: &str, _record: &TargetRecord) -> crm_load::Result<()> {
        Err(LoadError::NotConnected)
    }
}

impl BulkApi for QueryOrg {
    fn create_job(&self, _object: &str, _operation: LoadOperation) -> crm_load::Result<String> {
        Err(LoadError::NotConnected)
    }

    fn upload_batch(&self, _job_id: &str, _csv: &str) -> crm_load::Result<()> {
        Err(LoadError::NotConnected)
    }

    fn close_job(&self, _job_id: &str) -> crm_load::Result<()> {
        Err(LoadError::NotConnected)
    }

    fn job_status(&self, _job_id: &str) -> crm_load::Result<JobInfo> {
        Err(LoadError::NotConnected)
    }

    fn fetch_results(&self, _job_id: &str, _kind: ResultKind) -> crm_load::Result<String> {
        Err(LoadError::NotConnected)
    }

    fn abort_job(&self, _job_id: &str) -> crm_load::Result<()> {
        Err(LoadError::NotConnected)
    }
}

impl Connection for QueryOrg {
    fn reconnect(&mut self) -> crm_load::Result<()> {
        Ok(())
    }
}

fn account() -> TargetObject {
    let mut id = TargetField::new("Id", "Account ID", FieldType::Id).read_only();
    id.required = true;
    let mut created = TargetField::new("CreatedDate", "Created Date", FieldType::DateTime).read_only();
    created.required = true;
    let mut fields = vec![
        TargetField::new("Industry", "Industry", FieldType::Picklist),
        id,
        TargetField::new("Name", "Account Name", FieldType::String).required(),
        TargetField::new("Region__c", "Region", FieldType::String).required(),
        created,
        TargetField::new("OwnerId", "Owner ID", FieldType::Reference),
    ];
    fields.extend(
        (0..12).map(|i| TargetField::new(format!("Extra{i:02}__c"), format!("Extra {i}"), FieldType::String)),
    );
    TargetObject::new("Account", "Account", fields)
}

#[test]
fn preview_fields_follow_priority_order() {
    let selected = select_preview_fields(&account(), true);
    assert_eq!(&selected[..5], ["Id", "Name", "Region__c", "CreatedDate", "OwnerId"]);
    // Ten createable extras, in describe order.
    assert_eq!(selected.len(), 15);
    assert_eq!(selected[5], "Industry");
    assert_eq!(selected[6], "Extra00__c");
    assert!(!selected.contains(&"Extra09__c".to_string()));

    let without_required = select_preview_fields(&account(), false);
    assert_eq!(&without_required[..4], ["Id", "Name", "CreatedDate", "OwnerId"]);
    assert!(without_required.contains(&"Region__c".to_string()));
}

#[test]
fn sample_strips_attributes_and_filters_by_record_type() {
    let org = QueryOrg {
        records: json!({
            "totalSize": 42,
            "done": false,
            "records": [
                {"attributes": {"type": "Account", "url": "/x"}, "Id": "001A", "Name": "Acme"},
                {"attributes": {"type": "Account"}, "Id": "001B", "Name": null}
            ]
        }),
        ..QueryOrg::default()
    };
    let session = SharedSession::new(org);
    let fields = vec!["Id".to_string(), "Name".to_string()];

    let sample = sample_records(&session, "Account", &fields, 2, Some("012A")).expect("sample");
    assert_eq!(sample.total_size, 42);
    assert_eq!(sample.records.len(), 2);
    assert!(sample.records.iter().all(|r| !r.contains_key("attributes")));
    assert_eq!(sample.records[0]["Name"], json!("Acme"));
    assert_eq!(sample.records[1]["Name"], Value::Null);

    let queries = session.with_session(|org| Ok(org.queries.lock().expect("queries").clone())).expect("log");
    assert_eq!(
        queries,
        vec!["SELECT Id, Name FROM Account WHERE RecordTypeId = '012A' LIMIT 2"]
    );
}

#[test]
fn layout_fields_restrict_the_preview() {
    let org = QueryOrg {
        records: json!({"totalSize": 0, "records": []}),
        layout_assignment: json!({"records": [{"LayoutId": "00hA"}]}),
        layout: json!({"records": [{"Metadata": {"layoutSections": [
            {"layoutColumns": [{"layoutItems": [{"field": "Name"}, {"field": "Rating"}]}]}
        ]}}]}),
        ..QueryOrg::default()
    };
    let session = SharedSession::new(org);

    let layout = fetch_layout_fields(&session, "Account", Some("012A")).expect("layout");
    assert_eq!(layout, vec!["Name", "Rating"]);

    // Rating is not on the described object.
    let sample = sample_object(&session, &account(), 20, None, Some(&layout)).expect("sample");
    assert_eq!(sample.fields, vec!["Name"]);
    assert!(sample.records.is_empty());

    let tooling = session.with_session(|org| Ok(org.tooling.lock().expect("tooling").clone())).expect("log");
    assert_eq!(tooling.len(), 2);
    assert!(tooling[0].contains("RecordTypeId = '012A'"));
    assert!(tooling[1].ends_with("WHERE Id = '00hA'"));
}

#[test]
fn missing_layout_falls_back_to_selected_fields() {
    let org = QueryOrg {
        records: json!({"totalSize": 0, "records": []}),
        layout_assignment: json!({"records": []}),
        ..QueryOrg::default()
    };
    let session = SharedSession::new(org);

    let layout = fetch_layout_fields(&session, "Account", None).expect("layout");
    assert!(layout.is_empty());
    let sample = sample_object(&session, &account(), 5, None, Some(&layout)).expect("sample");
    assert_eq!(sample.fields, select_preview_fields(&account(), true));
}

#[test]
fn non_array_records_are_rejected() {
    let org = QueryOrg {
        records: json!({"records": "nope"}),
        ..QueryOrg::default()
    };
    let session = SharedSession::new(org);
    let err = sample_records(&session, "Account", &["Id".to_string()], 1, None).expect_err("bad payload");
    assert!(matches!(err, LoadError::InvalidResponse(_)));
}

#[test]
fn object_schema_includes_record_types_from_query() {
    let session = SharedSession::new(QueryOrg::default());
    let object = fetch_object(&session, "Account").expect("object");
    assert_eq!(object.record_types.len(), 1);
    assert_eq!(object.record_types[0].developer_name, "Partner");
    let queries = session.with_session(|org| Ok(org.queries.lock().expect("queries").clone())).expect("log");
    assert!(queries[0].contains("SObjectType = 'Account'"));
}
