//! Target object schema: fields, record types and the global object catalog.
//!
//! A [`TargetObject`] is an immutable snapshot of one object's describe
//! result. Re-fetching replaces the snapshot wholesale.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Name of the identifier field present on every object.
pub const ID_FIELD: &str = "Id";

/// Name of the record type lookup field.
pub const RECORD_TYPE_FIELD: &str = "RecordTypeId";

/// Field data types as reported by the describe call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum FieldType {
    Id,
    String,
    TextArea,
    Email,
    Phone,
    Url,
    Picklist,
    MultiPicklist,
    Reference,
    MasterDetail,
    Boolean,
    Int,
    Integer,
    Long,
    Double,
    Currency,
    Percent,
    Date,
    DateTime,
    /// Any type this crate does not interpret (e.g. `address`, `location`).
    Other(String),
}

impl FieldType {
    pub fn as_str(&self) -> &str {
        match self {
            FieldType::Id => "id",
            FieldType::String => "string",
            FieldType::TextArea => "textarea",
            FieldType::Email => "email",
            FieldType::Phone => "phone",
            FieldType::Url => "url",
            FieldType::Picklist => "picklist",
            FieldType::MultiPicklist => "multipicklist",
            FieldType::Reference => "reference",
            FieldType::MasterDetail => "masterDetail",
            FieldType::Boolean => "boolean",
            FieldType::Int => "int",
            FieldType::Integer => "integer",
            FieldType::Long => "long",
            FieldType::Double => "double",
            FieldType::Currency => "currency",
            FieldType::Percent => "percent",
            FieldType::Date => "date",
            FieldType::DateTime => "datetime",
            FieldType::Other(name) => name.as_str(),
        }
    }

    pub fn is_picklist(&self) -> bool {
        matches!(self, FieldType::Picklist | FieldType::MultiPicklist)
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, FieldType::Reference | FieldType::MasterDetail)
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, FieldType::Int | FieldType::Integer | FieldType::Long)
    }

    pub fn is_decimal(&self) -> bool {
        matches!(
            self,
            FieldType::Double | FieldType::Currency | FieldType::Percent
        )
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed = match s.trim() {
            "id" => FieldType::Id,
            "string" => FieldType::String,
            "textarea" => FieldType::TextArea,
            "email" => FieldType::Email,
            "phone" => FieldType::Phone,
            "url" => FieldType::Url,
            "picklist" => FieldType::Picklist,
            "multipicklist" => FieldType::MultiPicklist,
            "reference" => FieldType::Reference,
            "masterDetail" => FieldType::MasterDetail,
            "boolean" => FieldType::Boolean,
            "int" => FieldType::Int,
            "integer" => FieldType::Integer,
            "long" => FieldType::Long,
            "double" => FieldType::Double,
            "currency" => FieldType::Currency,
            "percent" => FieldType::Percent,
            "date" => FieldType::Date,
            "datetime" => FieldType::DateTime,
            other => FieldType::Other(other.to_string()),
        };
        Ok(parsed)
    }
}

impl From<FieldType> for String {
    fn from(value: FieldType) -> Self {
        value.as_str().to_string()
    }
}

impl TryFrom<String> for FieldType {
    type Error = std::convert::Infallible;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// One field on a target object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetField {
    pub name: String,
    pub label: String,
    pub field_type: FieldType,
    #[serde(default)]
    pub length: Option<u32>,
    /// True when the field is not nillable.
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub createable: bool,
    #[serde(default)]
    pub updateable: bool,
    #[serde(default)]
    pub calculated: bool,
    #[serde(default)]
    pub auto_number: bool,
    #[serde(default)]
    pub reference_to: Vec<String>,
    #[serde(default)]
    pub picklist_values: Vec<String>,
}

impl TargetField {
    /// Create a plain createable and updateable field.
    pub fn new(name: impl Into<String>, label: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            field_type,
            length: None,
            required: false,
            createable: true,
            updateable: true,
            calculated: false,
            auto_number: false,
            reference_to: Vec::new(),
            picklist_values: Vec::new(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_picklist_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.picklist_values = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_reference_to(mut self, objects: &[&str]) -> Self {
        self.reference_to = objects.iter().map(|o| (*o).to_string()).collect();
        self
    }

    pub fn read_only(mut self) -> Self {
        self.createable = false;
        self.updateable = false;
        self
    }

    /// Whether values may ever be written to this field on insert.
    ///
    /// Calculated and auto-number fields are never writable, whatever
    /// `createable` says.
    pub fn is_writable(&self) -> bool {
        self.createable && !self.calculated && !self.auto_number
    }

    pub fn is_id(&self) -> bool {
        self.name == ID_FIELD
    }
}

/// A record type (sub-schema variant) of an object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordType {
    pub id: String,
    pub developer_name: String,
    pub name: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// Full schema snapshot for one object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetObject {
    pub name: String,
    pub label: String,
    #[serde(default)]
    pub label_plural: String,
    #[serde(default)]
    pub custom: bool,
    pub fields: Vec<TargetField>,
    #[serde(default)]
    pub record_types: Vec<RecordType>,
}

impl TargetObject {
    pub fn new(name: impl Into<String>, label: impl Into<String>, fields: Vec<TargetField>) -> Self {
        let label = label.into();
        Self {
            name: name.into(),
            label_plural: label.clone(),
            label,
            custom: false,
            fields,
            record_types: Vec::new(),
        }
    }

    /// Look up a field by its exact API name.
    pub fn field(&self, name: &str) -> Option<&TargetField> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|field| field.name.as_str()).collect()
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &TargetField> {
        self.fields.iter().filter(|field| field.required)
    }

    pub fn createable_fields(&self) -> impl Iterator<Item = &TargetField> {
        self.fields.iter().filter(|field| field.is_writable())
    }

    pub fn active_record_types(&self) -> impl Iterator<Item = &RecordType> {
        self.record_types.iter().filter(|rt| rt.is_active)
    }
}

/// One row of the global object catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectSummary {
    pub name: String,
    pub label: String,
    pub label_plural: String,
    pub custom: bool,
    pub queryable: bool,
}

/// Case-insensitive substring filter over object names and labels.
pub fn search_objects<'a>(query: &str, objects: &'a [ObjectSummary]) -> Vec<&'a ObjectSummary> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return objects.iter().collect();
    }
    objects
        .iter()
        .filter(|obj| {
            obj.name.to_lowercase().contains(&query) || obj.label.to_lowercase().contains(&query)
        })
        .collect()
}
