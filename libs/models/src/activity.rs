use crate::scope::Scope;
use crate::value::{MapBuilder, RecordValue};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use strum::{Display, EnumString};
use chrono::{DateTime, Utc};

/// Who or what caused the underlying audit/event record (spec §3, §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ChangeSource {
    Human,
    System,
}

/// Actor kind, resolved from the audit username or the event's reporting
/// controller (spec §4.3 actor resolution).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ActorType {
    User,
    ServiceAccount,
    System,
    Controller,
    Unknown,
}

/// Where an activity was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OriginType {
    Audit,
    Event,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub name: String,
    #[serde(rename = "type")]
    pub actor_type: ActorType,
    pub uid: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ActivityResource {
    pub api_group: Option<String>,
    pub kind: String,
    pub name: String,
    pub namespace: Option<String>,
    pub uid: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Origin {
    #[serde(rename = "type")]
    pub origin_type: OriginType,
    pub id: String,
}

/// One `link(displayText, resourceRef)` captured while rendering a summary
/// template (spec §4.3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub marker: String,
    pub resource: serde_json::Value,
}

/// Policy-derived, human-readable description of an audit record or event.
/// One audit/event record produces at most one activity per matching
/// policy rule (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ActivityRecord {
    pub activity_id: String,
    pub summary: String,
    pub change_source: String,
    pub actor_name: String,
    pub actor_type: String,
    pub actor_uid: String,
    pub resource_api_group: Option<String>,
    pub resource_kind: String,
    pub resource_name: String,
    pub resource_namespace: Option<String>,
    pub resource_uid: Option<String>,
    pub origin_type: String,
    pub origin_id: String,
    pub links: serde_json::Value,
    pub scope_type: String,
    pub scope_name: String,
    pub inserted_at: DateTime<Utc>,
}

/// Nested-JSON view returned to API clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityRecordView {
    pub activity_id: String,
    pub summary: String,
    pub change_source: ChangeSource,
    pub actor: Actor,
    pub resource: ActivityResource,
    pub origin: Origin,
    pub links: Vec<Link>,
    pub resource_version: String,
}

impl ActivityRecordView {
    /// Record tree over the allow-listed `actor.*`/`resource.*`/`origin.*`
    /// identifier paths, used to evaluate a C2 filter against frames
    /// arriving off the bus (spec §4.7).
    pub fn to_record_value(&self) -> RecordValue {
        let actor = MapBuilder::new()
            .field("name", RecordValue::String(self.actor.name.clone()))
            .field("type", RecordValue::String(self.actor.actor_type.to_string()))
            .field("uid", RecordValue::String(self.actor.uid.clone()))
            .build();

        let resource = MapBuilder::new()
            .field(
                "apiGroup",
                self.resource.api_group.clone().map(RecordValue::String).unwrap_or(RecordValue::Null),
            )
            .field("kind", RecordValue::String(self.resource.kind.clone()))
            .field("name", RecordValue::String(self.resource.name.clone()))
            .field(
                "namespace",
                self.resource.namespace.clone().map(RecordValue::String).unwrap_or(RecordValue::Null),
            )
            .field("uid", self.resource.uid.clone().map(RecordValue::String).unwrap_or(RecordValue::Null))
            .build();

        let origin = MapBuilder::new()
            .field("type", RecordValue::String(self.origin.origin_type.to_string()))
            .field("id", RecordValue::String(self.origin.id.clone()))
            .build();

        MapBuilder::new()
            .field("summary", RecordValue::String(self.summary.clone()))
            .field("changeSource", RecordValue::String(self.change_source.to_string()))
            .field("actor", actor)
            .field("resource", resource)
            .field("origin", origin)
            .build()
    }
}

impl From<&ActivityRecord> for ActivityRecordView {
    fn from(r: &ActivityRecord) -> Self {
        Self {
            activity_id: r.activity_id.clone(),
            summary: r.summary.clone(),
            change_source: r.change_source.parse().unwrap_or(ChangeSource::System),
            actor: Actor {
                name: r.actor_name.clone(),
                actor_type: r.actor_type.parse().unwrap_or(ActorType::Unknown),
                uid: r.actor_uid.clone(),
            },
            resource: ActivityResource {
                api_group: r.resource_api_group.clone(),
                kind: r.resource_kind.clone(),
                name: r.resource_name.clone(),
                namespace: r.resource_namespace.clone(),
                uid: r.resource_uid.clone(),
            },
            origin: Origin {
                origin_type: r.origin_type.parse().unwrap_or(OriginType::Audit),
                id: r.origin_id.clone(),
            },
            links: serde_json::from_value(r.links.clone()).unwrap_or_default(),
            resource_version: r
                .inserted_at
                .timestamp_nanos_opt()
                .unwrap_or_else(|| r.inserted_at.timestamp() * 1_000_000_000)
                .to_string(),
        }
    }
}

impl ActivityRecord {
    pub fn scope(&self) -> Scope {
        Scope {
            scope_type: self.scope_type.parse().unwrap_or(crate::scope::ScopeType::Platform),
            scope_name: self.scope_name.clone(),
        }
    }
}

/// Resolve an actor from an audit username (spec §4.3).
pub fn resolve_actor_from_username(username: &str, uid: &str) -> Actor {
    if username.is_empty() {
        return Actor {
            name: String::new(),
            actor_type: ActorType::Unknown,
            uid: uid.to_string(),
        };
    }
    if let Some(name) = username.strip_prefix("system:serviceaccount:") {
        return Actor {
            name: name.to_string(),
            actor_type: ActorType::ServiceAccount,
            uid: uid.to_string(),
        };
    }
    if username.starts_with("system:") {
        return Actor {
            name: username.to_string(),
            actor_type: ActorType::System,
            uid: uid.to_string(),
        };
    }
    Actor {
        name: username.to_string(),
        actor_type: ActorType::User,
        uid: uid.to_string(),
    }
}

/// Resolve an actor for an event rule from `reportingController`/`source.component`.
pub fn resolve_actor_from_controller(controller: &str) -> Actor {
    Actor {
        name: controller.to_string(),
        actor_type: ActorType::Controller,
        uid: String::new(),
    }
}

/// Classify an actor type into human/system (spec §4.3).
pub fn classify_change_source(actor_type: ActorType) -> ChangeSource {
    match actor_type {
        ActorType::ServiceAccount | ActorType::System | ActorType::Controller => {
            ChangeSource::System
        }
        ActorType::User | ActorType::Unknown => ChangeSource::Human,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_serviceaccount_username() {
        let actor = resolve_actor_from_username("system:serviceaccount:kube-system:default", "u1");
        assert_eq!(actor.actor_type, ActorType::ServiceAccount);
        assert_eq!(actor.name, "kube-system:default");
    }

    #[test]
    fn resolves_system_username() {
        let actor = resolve_actor_from_username("system:apiserver", "u1");
        assert_eq!(actor.actor_type, ActorType::System);
    }

    #[test]
    fn empty_username_is_unknown() {
        let actor = resolve_actor_from_username("", "");
        assert_eq!(actor.actor_type, ActorType::Unknown);
        assert_eq!(actor.name, "");
    }

    #[test]
    fn ordinary_username_is_user() {
        let actor = resolve_actor_from_username("alice@example.com", "u1");
        assert_eq!(actor.actor_type, ActorType::User);
    }

    #[test]
    fn change_source_classification_matches_table() {
        assert_eq!(classify_change_source(ActorType::ServiceAccount), ChangeSource::System);
        assert_eq!(classify_change_source(ActorType::System), ChangeSource::System);
        assert_eq!(classify_change_source(ActorType::Controller), ChangeSource::System);
        assert_eq!(classify_change_source(ActorType::User), ChangeSource::Human);
        assert_eq!(classify_change_source(ActorType::Unknown), ChangeSource::Human);
    }
}
