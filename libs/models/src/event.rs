use crate::scope::Scope;
use crate::value::{MapBuilder, RecordValue};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use strum::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "PascalCase")]
#[strum(serialize_all = "PascalCase")]
pub enum EventType {
    Normal,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct InvolvedObject {
    pub api_version: Option<String>,
    pub kind: String,
    pub namespace: Option<String>,
    pub name: String,
    pub uid: Option<String>,
    pub field_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EventSource {
    pub component: Option<String>,
    pub host: Option<String>,
}

/// Cluster-lifecycle notification, namespaced and UID-keyed (spec §3).
/// The store keeps multiple versions by `(namespace, name, uid, insertedAt)`
/// and merge-on-read surfaces the newest.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EventRecord {
    pub namespace: String,
    pub name: String,
    pub uid: String,
    pub involved_object_api_version: Option<String>,
    pub involved_object_kind: String,
    pub involved_object_namespace: Option<String>,
    pub involved_object_name: String,
    pub involved_object_uid: Option<String>,
    pub involved_object_field_path: Option<String>,
    pub reason: String,
    pub message: String,
    pub event_type: String,
    pub count: i64,
    pub first_timestamp: DateTime<Utc>,
    pub last_timestamp: DateTime<Utc>,
    pub source_component: Option<String>,
    pub source_host: Option<String>,
    pub reporting_component: Option<String>,
    pub reporting_instance: Option<String>,
    pub scope_type: String,
    pub scope_name: String,
    pub inserted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecordView {
    pub namespace: String,
    pub name: String,
    pub uid: String,
    pub involved_object: InvolvedObject,
    pub reason: String,
    pub message: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub count: i64,
    pub first_timestamp: DateTime<Utc>,
    pub last_timestamp: DateTime<Utc>,
    pub source: EventSource,
    pub resource_version: String,
}

impl From<&EventRecord> for EventRecordView {
    fn from(r: &EventRecord) -> Self {
        Self {
            namespace: r.namespace.clone(),
            name: r.name.clone(),
            uid: r.uid.clone(),
            involved_object: InvolvedObject {
                api_version: r.involved_object_api_version.clone(),
                kind: r.involved_object_kind.clone(),
                namespace: r.involved_object_namespace.clone(),
                name: r.involved_object_name.clone(),
                uid: r.involved_object_uid.clone(),
                field_path: r.involved_object_field_path.clone(),
            },
            reason: r.reason.clone(),
            message: r.message.clone(),
            event_type: r.event_type.parse().unwrap_or(EventType::Normal),
            count: r.count,
            first_timestamp: r.first_timestamp,
            last_timestamp: r.last_timestamp,
            source: EventSource {
                component: r.source_component.clone(),
                host: r.source_host.clone(),
            },
            resource_version: r
                .inserted_at
                .timestamp_nanos_opt()
                .unwrap_or_else(|| r.inserted_at.timestamp() * 1_000_000_000)
                .to_string(),
        }
    }
}

impl EventRecordView {
    /// Same shape as `EventRecord::to_record_value`, built from the
    /// client-facing view instead of the stored row — used to evaluate a
    /// field selector against frames arriving off the bus (spec §4.7).
    pub fn to_record_value(&self) -> RecordValue {
        let involved_object = MapBuilder::new()
            .field(
                "apiVersion",
                self.involved_object.api_version.clone().map(RecordValue::String).unwrap_or(RecordValue::Null),
            )
            .field("kind", RecordValue::String(self.involved_object.kind.clone()))
            .field(
                "namespace",
                self.involved_object.namespace.clone().map(RecordValue::String).unwrap_or(RecordValue::Null),
            )
            .field("name", RecordValue::String(self.involved_object.name.clone()))
            .field(
                "uid",
                self.involved_object.uid.clone().map(RecordValue::String).unwrap_or(RecordValue::Null),
            )
            .field(
                "fieldPath",
                self.involved_object.field_path.clone().map(RecordValue::String).unwrap_or(RecordValue::Null),
            )
            .build();

        let source = MapBuilder::new()
            .field(
                "component",
                self.source.component.clone().map(RecordValue::String).unwrap_or(RecordValue::Null),
            )
            .field("host", self.source.host.clone().map(RecordValue::String).unwrap_or(RecordValue::Null))
            .build();

        MapBuilder::new()
            .field("namespace", RecordValue::String(self.namespace.clone()))
            .field("name", RecordValue::String(self.name.clone()))
            .field("uid", RecordValue::String(self.uid.clone()))
            .field("involvedObject", involved_object)
            .field("reason", RecordValue::String(self.reason.clone()))
            .field("message", RecordValue::String(self.message.clone()))
            .field("type", RecordValue::String(self.event_type.to_string()))
            .field("count", RecordValue::Int(self.count))
            .field("firstTimestamp", RecordValue::Timestamp(self.first_timestamp))
            .field("lastTimestamp", RecordValue::Timestamp(self.last_timestamp))
            .field("source", source)
            .build()
    }
}

impl EventRecord {
    pub fn scope(&self) -> Scope {
        Scope {
            scope_type: self.scope_type.parse().unwrap_or(crate::scope::ScopeType::Platform),
            scope_name: self.scope_name.clone(),
        }
    }

    /// Build the `event` binding consumed by the C3 expression environment
    /// (spec §4.3): policy rules bind `actor` from `reportingController`
    /// or `source.component`.
    pub fn to_record_value(&self) -> RecordValue {
        let involved_object = MapBuilder::new()
            .field(
                "apiVersion",
                self.involved_object_api_version
                    .clone()
                    .map(RecordValue::String)
                    .unwrap_or(RecordValue::Null),
            )
            .field("kind", RecordValue::String(self.involved_object_kind.clone()))
            .field(
                "namespace",
                self.involved_object_namespace
                    .clone()
                    .map(RecordValue::String)
                    .unwrap_or(RecordValue::Null),
            )
            .field("name", RecordValue::String(self.involved_object_name.clone()))
            .field(
                "uid",
                self.involved_object_uid
                    .clone()
                    .map(RecordValue::String)
                    .unwrap_or(RecordValue::Null),
            )
            .field(
                "fieldPath",
                self.involved_object_field_path
                    .clone()
                    .map(RecordValue::String)
                    .unwrap_or(RecordValue::Null),
            )
            .build();

        let source = MapBuilder::new()
            .field(
                "component",
                self.source_component
                    .clone()
                    .map(RecordValue::String)
                    .unwrap_or(RecordValue::Null),
            )
            .field(
                "host",
                self.source_host
                    .clone()
                    .map(RecordValue::String)
                    .unwrap_or(RecordValue::Null),
            )
            .build();

        MapBuilder::new()
            .field("namespace", RecordValue::String(self.namespace.clone()))
            .field("name", RecordValue::String(self.name.clone()))
            .field("uid", RecordValue::String(self.uid.clone()))
            .field("involvedObject", involved_object)
            .field("reason", RecordValue::String(self.reason.clone()))
            .field("message", RecordValue::String(self.message.clone()))
            .field("type", RecordValue::String(self.event_type.clone()))
            .field("count", RecordValue::Int(self.count))
            .field("firstTimestamp", RecordValue::Timestamp(self.first_timestamp))
            .field("lastTimestamp", RecordValue::Timestamp(self.last_timestamp))
            .field("source", source)
            .build()
    }

    /// Actor string for policy evaluation: `reportingController`, falling
    /// back to `source.component` (spec §4.3).
    pub fn reporting_actor(&self) -> &str {
        self.reporting_component
            .as_deref()
            .or(self.source_component.as_deref())
            .unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> EventRecord {
        EventRecord {
            namespace: "default".into(),
            name: "pod-1.16d9f".into(),
            uid: "uid-1".into(),
            involved_object_api_version: Some("v1".into()),
            involved_object_kind: "Pod".into(),
            involved_object_namespace: Some("default".into()),
            involved_object_name: "pod-1".into(),
            involved_object_uid: Some("pod-uid-1".into()),
            involved_object_field_path: None,
            reason: "Scheduled".into(),
            message: "Successfully assigned".into(),
            event_type: "Normal".into(),
            count: 1,
            first_timestamp: Utc::now(),
            last_timestamp: Utc::now(),
            source_component: Some("default-scheduler".into()),
            source_host: None,
            reporting_component: Some("default-scheduler".into()),
            reporting_instance: None,
            scope_type: "Platform".into(),
            scope_name: String::new(),
            inserted_at: Utc::now(),
        }
    }

    #[test]
    fn to_record_value_exposes_involved_object() {
        let record = sample();
        let value = record.to_record_value();
        assert_eq!(
            value.get_path("involvedObject.kind").unwrap().as_str(),
            Some("Pod")
        );
    }

    #[test]
    fn reporting_actor_prefers_reporting_component() {
        let record = sample();
        assert_eq!(record.reporting_actor(), "default-scheduler");
    }

    #[test]
    fn reporting_actor_falls_back_to_source_component() {
        let mut record = sample();
        record.reporting_component = None;
        assert_eq!(record.reporting_actor(), "default-scheduler");
    }
}
