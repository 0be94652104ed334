//! Per-record-type allow-lists (spec §4.2): `identifier-path -> physical
//! column name`, plus the field's type for type-checking and lowering.

use once_cell::sync::Lazy;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Int,
    Timestamp,
    Map,
}

#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub name: &'static str,
    pub field_type: FieldType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    Audit,
    Activity,
    Event,
}

pub type AllowList = HashMap<&'static str, Column>;

static AUDIT_ALLOW_LIST: Lazy<AllowList> = Lazy::new(|| {
    use FieldType::*;
    HashMap::from([
        ("verb", Column { name: "verb", field_type: String }),
        ("stage", Column { name: "stage", field_type: String }),
        ("requestReceivedTimestamp", Column { name: "request_received_timestamp", field_type: Timestamp }),
        ("stageTimestamp", Column { name: "stage_timestamp", field_type: Timestamp }),
        ("user.username", Column { name: "user_username", field_type: String }),
        ("user.uid", Column { name: "user_uid", field_type: String }),
        ("objectRef.apiGroup", Column { name: "object_api_group", field_type: String }),
        ("objectRef.resource", Column { name: "object_resource", field_type: String }),
        ("objectRef.name", Column { name: "object_name", field_type: String }),
        ("objectRef.namespace", Column { name: "object_namespace", field_type: String }),
        ("objectRef.subresource", Column { name: "object_subresource", field_type: String }),
        ("objectRef.uid", Column { name: "object_uid", field_type: String }),
        ("responseStatus.code", Column { name: "response_status_code", field_type: Int }),
    ])
});

static ACTIVITY_ALLOW_LIST: Lazy<AllowList> = Lazy::new(|| {
    use FieldType::*;
    HashMap::from([
        ("summary", Column { name: "summary", field_type: String }),
        ("changeSource", Column { name: "change_source", field_type: String }),
        ("actor.name", Column { name: "actor_name", field_type: String }),
        ("actor.type", Column { name: "actor_type", field_type: String }),
        ("actor.uid", Column { name: "actor_uid", field_type: String }),
        ("resource.apiGroup", Column { name: "resource_api_group", field_type: String }),
        ("resource.kind", Column { name: "resource_kind", field_type: String }),
        ("resource.name", Column { name: "resource_name", field_type: String }),
        ("resource.namespace", Column { name: "resource_namespace", field_type: String }),
        ("resource.uid", Column { name: "resource_uid", field_type: String }),
        ("origin.type", Column { name: "origin_type", field_type: String }),
        ("origin.id", Column { name: "origin_id", field_type: String }),
    ])
});

static EVENT_ALLOW_LIST: Lazy<AllowList> = Lazy::new(|| {
    use FieldType::*;
    HashMap::from([
        ("namespace", Column { name: "namespace", field_type: String }),
        ("name", Column { name: "name", field_type: String }),
        ("uid", Column { name: "uid", field_type: String }),
        ("involvedObject.apiVersion", Column { name: "involved_object_api_version", field_type: String }),
        ("involvedObject.kind", Column { name: "involved_object_kind", field_type: String }),
        ("involvedObject.namespace", Column { name: "involved_object_namespace", field_type: String }),
        ("involvedObject.name", Column { name: "involved_object_name", field_type: String }),
        ("involvedObject.uid", Column { name: "involved_object_uid", field_type: String }),
        ("involvedObject.fieldPath", Column { name: "involved_object_field_path", field_type: String }),
        ("reason", Column { name: "reason", field_type: String }),
        ("message", Column { name: "message", field_type: String }),
        ("type", Column { name: "event_type", field_type: String }),
        ("count", Column { name: "count", field_type: Int }),
        ("firstTimestamp", Column { name: "first_timestamp", field_type: Timestamp }),
        ("lastTimestamp", Column { name: "last_timestamp", field_type: Timestamp }),
        ("source.component", Column { name: "source_component", field_type: String }),
        ("source.host", Column { name: "source_host", field_type: String }),
        ("reportingComponent", Column { name: "reporting_component", field_type: String }),
        ("reportingInstance", Column { name: "reporting_instance", field_type: String }),
    ])
});

pub fn allow_list_for(record_type: RecordType) -> &'static AllowList {
    match record_type {
        RecordType::Audit => &AUDIT_ALLOW_LIST,
        RecordType::Activity => &ACTIVITY_ALLOW_LIST,
        RecordType::Event => &EVENT_ALLOW_LIST,
    }
}

/// Siblings of `path` in the same allow-list, for "available fields" error text.
pub fn sibling_fields(allow_list: &AllowList) -> Vec<&'static str> {
    let mut fields: Vec<&'static str> = allow_list.keys().copied().collect();
    fields.sort_unstable();
    fields
}
