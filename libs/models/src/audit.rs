use crate::scope::{Scope, ScopeType};
use crate::value::{MapBuilder, RecordValue};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use strum::{Display, EnumString};

/// Verb recorded against a control-plane API call (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Verb {
    Get,
    List,
    Create,
    Update,
    Patch,
    Delete,
    Watch,
}

/// Audit stage. Only `ResponseComplete` rows are retained by the store
/// (spec §3) — earlier stages (RequestReceived, ResponseStarted, Panic)
/// are filtered out by the ingestion pipeline before they ever reach us.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
pub enum Stage {
    ResponseComplete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    pub username: String,
    pub uid: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ObjectRef {
    pub api_group: Option<String>,
    pub resource: String,
    pub name: String,
    pub namespace: Option<String>,
    pub subresource: Option<String>,
    pub uid: Option<String>,
}

/// Immutable, append-only audit log entry (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AuditRecord {
    pub audit_id: String,
    pub verb: String,
    pub stage: String,
    pub request_received_timestamp: DateTime<Utc>,
    pub stage_timestamp: DateTime<Utc>,
    pub user_username: String,
    pub user_uid: String,
    pub object_api_group: Option<String>,
    pub object_resource: String,
    pub object_name: String,
    pub object_namespace: Option<String>,
    pub object_subresource: Option<String>,
    pub object_uid: Option<String>,
    pub response_status_code: i32,
    pub request_object: Option<serde_json::Value>,
    pub response_object: Option<serde_json::Value>,
    pub scope_type: String,
    pub scope_name: String,
    pub inserted_at: DateTime<Utc>,
}

/// Nested-JSON view of an `AuditRecord` returned to API clients — the
/// shape spec §3 describes (`user.username`, `objectRef.namespace`, …)
/// rather than the flattened column layout the store persists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecordView {
    pub audit_id: String,
    pub verb: String,
    pub stage: String,
    pub request_received_timestamp: DateTime<Utc>,
    pub stage_timestamp: DateTime<Utc>,
    pub user: UserRef,
    pub object_ref: ObjectRef,
    pub response_status_code: i32,
    pub resource_version: String,
}

impl From<&AuditRecord> for AuditRecordView {
    fn from(r: &AuditRecord) -> Self {
        Self {
            audit_id: r.audit_id.clone(),
            verb: r.verb.clone(),
            stage: r.stage.clone(),
            request_received_timestamp: r.request_received_timestamp,
            stage_timestamp: r.stage_timestamp,
            user: UserRef {
                username: r.user_username.clone(),
                uid: r.user_uid.clone(),
            },
            object_ref: ObjectRef {
                api_group: r.object_api_group.clone(),
                resource: r.object_resource.clone(),
                name: r.object_name.clone(),
                namespace: r.object_namespace.clone(),
                subresource: r.object_subresource.clone(),
                uid: r.object_uid.clone(),
            },
            response_status_code: r.response_status_code,
            resource_version: r
                .inserted_at
                .timestamp_nanos_opt()
                .unwrap_or_else(|| r.inserted_at.timestamp() * 1_000_000_000)
                .to_string(),
        }
    }
}

impl AuditRecord {
    pub fn scope(&self) -> Scope {
        Scope {
            scope_type: self.scope_type.parse().unwrap_or(ScopeType::Platform),
            scope_name: self.scope_name.clone(),
        }
    }

    /// Build the `audit` binding consumed by the C2/C3 expression
    /// environment (spec §4.2, §4.3): the full record as a nested map.
    pub fn to_record_value(&self) -> RecordValue {
        let object_ref = MapBuilder::new()
            .field(
                "apiGroup",
                self.object_api_group
                    .clone()
                    .map(RecordValue::String)
                    .unwrap_or(RecordValue::Null),
            )
            .field("resource", RecordValue::String(self.object_resource.clone()))
            .field("name", RecordValue::String(self.object_name.clone()))
            .field(
                "namespace",
                self.object_namespace
                    .clone()
                    .map(RecordValue::String)
                    .unwrap_or(RecordValue::Null),
            )
            .field(
                "subresource",
                self.object_subresource
                    .clone()
                    .map(RecordValue::String)
                    .unwrap_or(RecordValue::Null),
            )
            .field(
                "uid",
                self.object_uid
                    .clone()
                    .map(RecordValue::String)
                    .unwrap_or(RecordValue::Null),
            )
            .build();

        let user = MapBuilder::new()
            .field("username", RecordValue::String(self.user_username.clone()))
            .field("uid", RecordValue::String(self.user_uid.clone()))
            .build();

        let response_status = MapBuilder::new()
            .field("code", RecordValue::Int(self.response_status_code as i64))
            .build();

        MapBuilder::new()
            .field("auditID", RecordValue::String(self.audit_id.clone()))
            .field("verb", RecordValue::String(self.verb.clone()))
            .field("stage", RecordValue::String(self.stage.clone()))
            .field(
                "requestReceivedTimestamp",
                RecordValue::Timestamp(self.request_received_timestamp),
            )
            .field("stageTimestamp", RecordValue::Timestamp(self.stage_timestamp))
            .field("user", user)
            .field("objectRef", object_ref)
            .field("responseStatus", response_status)
            .field(
                "requestObject",
                self.request_object
                    .clone()
                    .map(RecordValue::from)
                    .unwrap_or(RecordValue::Null),
            )
            .field(
                "responseObject",
                self.response_object
                    .clone()
                    .map(RecordValue::from)
                    .unwrap_or(RecordValue::Null),
            )
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AuditRecord {
        AuditRecord {
            audit_id: "a-1".into(),
            verb: "delete".into(),
            stage: "ResponseComplete".into(),
            request_received_timestamp: Utc::now(),
            stage_timestamp: Utc::now(),
            user_username: "alice@example.com".into(),
            user_uid: "uid-1".into(),
            object_api_group: None,
            object_resource: "secrets".into(),
            object_name: "db".into(),
            object_namespace: Some("production".into()),
            object_subresource: None,
            object_uid: None,
            response_status_code: 200,
            request_object: None,
            response_object: None,
            scope_type: "Platform".into(),
            scope_name: String::new(),
            inserted_at: Utc::now(),
        }
    }

    #[test]
    fn to_record_value_exposes_nested_paths() {
        let record = sample();
        let value = record.to_record_value();
        assert_eq!(
            value.get_path("objectRef.namespace").unwrap().as_str(),
            Some("production")
        );
        assert_eq!(value.get_path("user.username").unwrap().as_str(), Some("alice@example.com"));
    }
}
