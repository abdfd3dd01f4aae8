//! Prompt construction for LLM-assisted mapping.

use std::fmt::Write as _;

use crm_model::{SourceColumn, TargetObject};

/// Fields listed in a prompt, to bound its size.
pub const MAX_PROMPT_FIELDS: usize = 100;

/// Build the mapping prompt for one batch of columns.
pub fn build_prompt(columns: &[&SourceColumn], object: &TargetObject) -> String {
    let mut column_lines = String::new();
    for column in columns {
        let _ = writeln!(column_lines, "- {} (type: {})", column.name, column.inferred_type);
    }

    let mut field_lines = String::new();
    for field in object.fields.iter().take(MAX_PROMPT_FIELDS) {
        let _ = writeln!(
            field_lines,
            "- {} ({}) - {}, required: {}",
            field.name, field.label, field.field_type, field.required
        );
    }

    format!(
        "Map CSV columns to Salesforce fields.\n\
         \n\
         CSV columns:\n\
         {columns}\n\
         Salesforce {label} fields:\n\
         {fields}\n\
         For each CSV column, find the best matching Salesforce field. Consider:\n\
         - Semantic meaning (email vs e-mail, phone vs telephone)\n\
         - Data types (date columns -> date fields)\n\
         - Common abbreviations (amt=amount, num=number, qty=quantity)\n\
         - Business context (BillingStreet vs ShippingStreet)\n\
         \n\
         Respond with ONLY a JSON array, no other text. Format:\n\
         [\n  \
           {{\"source\": \"csv_column_name\", \"target\": \"SalesforceField__c\", \"confidence\": 0.95, \"reasoning\": \"why this matches\"}},\n  \
           {{\"source\": \"another_column\", \"target\": \"AnotherField__c\", \"confidence\": 0.85, \"reasoning\": \"semantic similarity\"}}\n\
         ]\n\
         \n\
         If no good matches, return: []",
        columns = column_lines,
        label = object.label,
        fields = field_lines,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crm_model::{FieldType, InferredType, TargetField};

    #[test]
    fn prompt_lists_columns_and_fields() {
        let object = TargetObject::new(
            "Claim__c",
            "Claim",
            vec![TargetField::new("Loss_Date__c", "Loss Date", FieldType::Date).required()],
        );
        let column = SourceColumn::new("DOL", 0).with_type(InferredType::Date);
        let prompt = build_prompt(&[&column], &object);

        assert!(prompt.contains("- DOL (type: date)"));
        assert!(prompt.contains("Salesforce Claim fields:"));
        assert!(prompt.contains("- Loss_Date__c (Loss Date) - date, required: true"));
        assert!(prompt.contains("Respond with ONLY a JSON array"));
        assert!(prompt.ends_with("If no good matches, return: []"));
    }

    #[test]
    fn prompt_caps_field_catalog() {
        let fields = (0..150)
            .map(|i| TargetField::new(format!("F{i}__c"), format!("Field {i}"), FieldType::String))
            .collect();
        let object = TargetObject::new("Big__c", "Big", fields);
        let column = SourceColumn::new("x", 0);
        let prompt = build_prompt(&[&column], &object);
        assert!(prompt.contains("- F99__c "));
        assert!(!prompt.contains("- F100__c "));
    }
}
