//! Schema lookups through a shared session.

use crm_model::{ObjectSummary, TargetObject, parse_describe_global, parse_record_types};

use crate::api::CrmApi;
use crate::error::Result;
use crate::session::SharedSession;

/// Queryable objects of the org, sorted by label.
pub fn fetch_catalog<C: CrmApi>(
    session: &SharedSession<C>,
    include_custom: bool,
    include_standard: bool,
) -> Result<Vec<ObjectSummary>> {
    let payload = session.with_session(|api| api.describe_global())?;
    let objects = parse_describe_global(&payload, include_custom, include_standard)?;
    tracing::info!(objects = objects.len(), "Fetched object catalog");
    Ok(objects)
}

/// Describe `object` including its active record types.
pub fn fetch_object<C: CrmApi>(session: &SharedSession<C>, object: &str) -> Result<TargetObject> {
    let describe = session.with_session(|api| api.describe_object(object))?;
    let soql = record_types_query(object);
    let record_types = session.with_session(|api| api.query(&soql))?;
    let target = TargetObject::from_describe(&describe, parse_record_types(&record_types)?)?;
    tracing::info!(
        object = %target.name,
        fields = target.fields.len(),
        record_types = target.record_types.len(),
        "Fetched object schema"
    );
    Ok(target)
}

fn record_types_query(object: &str) -> String {
    format!(
        "SELECT Id, Name, DeveloperName, IsActive FROM RecordType \
         WHERE SObjectType = {} AND IsActive = TRUE",
        soql_literal(object)
    )
}

/// Quote `value` as a SOQL string literal.
pub(crate) fn soql_literal(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literals_are_escaped() {
        assert_eq!(soql_literal("Account"), "'Account'");
        assert_eq!(soql_literal("O'Brien\\"), "'O\\'Brien\\\\'");
        assert!(record_types_query("Claim__c").contains("SObjectType = 'Claim__c'"));
    }
}
