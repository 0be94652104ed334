//! Request-scoped "ephemeral" resources (spec §3). A client submits a
//! `spec`; the API executes once and returns the result in the same
//! response's `status`. None of these are persisted — no `FromRow`, no
//! backing table, just spec/status pairs shaped like Kubernetes
//! aggregated-API objects.

use crate::activity::ActivityRecordView;
use crate::audit::AuditRecordView;
use crate::event::EventRecordView;
use crate::policy::{PolicyResource, PolicyRule};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Raw time bounds as submitted by the client (spec §4.1) — parsed against
/// a single per-request `now` before execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: String,
    pub end: String,
}

/// One `(field, perFieldLimit)` request for a facet query (spec §4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacetFieldRequest {
    pub field: String,
    #[serde(default)]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacetBucket {
    pub value: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacetResult {
    pub field: String,
    pub buckets: Vec<FacetBucket>,
}

// ---------------------------------------------------------------------
// AuditLogQuery
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogQuerySpec {
    #[serde(flatten)]
    pub time_range: TimeRange,
    pub filter: Option<String>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(rename = "continue", default)]
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogQueryStatus {
    pub results: Vec<AuditRecordView>,
    #[serde(rename = "continue")]
    pub continue_token: String,
    pub effective_start_time: DateTime<Utc>,
    pub effective_end_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogQuery {
    pub spec: AuditLogQuerySpec,
    pub status: Option<AuditLogQueryStatus>,
}

// ---------------------------------------------------------------------
// ActivityQuery
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityQuerySpec {
    #[serde(flatten)]
    pub time_range: TimeRange,
    pub filter: Option<String>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(rename = "continue", default)]
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityQueryStatus {
    pub results: Vec<ActivityRecordView>,
    #[serde(rename = "continue")]
    pub continue_token: String,
    pub effective_start_time: DateTime<Utc>,
    pub effective_end_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityQuery {
    pub spec: ActivityQuerySpec,
    pub status: Option<ActivityQueryStatus>,
}

// ---------------------------------------------------------------------
// EventQuery
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventQuerySpec {
    #[serde(flatten)]
    pub time_range: TimeRange,
    pub namespace: Option<String>,
    pub field_selector: Option<String>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(rename = "continue", default)]
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventQueryStatus {
    pub results: Vec<EventRecordView>,
    #[serde(rename = "continue")]
    pub continue_token: String,
    pub effective_start_time: DateTime<Utc>,
    pub effective_end_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventQuery {
    pub spec: EventQuerySpec,
    pub status: Option<EventQueryStatus>,
}

// ---------------------------------------------------------------------
// Facet queries
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogFacetsQuerySpec {
    #[serde(flatten)]
    pub time_range: TimeRange,
    pub filter: Option<String>,
    pub fields: Vec<FacetFieldRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogFacetsQueryStatus {
    pub results: Vec<FacetResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogFacetsQuery {
    pub spec: AuditLogFacetsQuerySpec,
    pub status: Option<AuditLogFacetsQueryStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityFacetQuerySpec {
    #[serde(flatten)]
    pub time_range: TimeRange,
    pub filter: Option<String>,
    pub fields: Vec<FacetFieldRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityFacetQueryStatus {
    pub results: Vec<FacetResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityFacetQuery {
    pub spec: ActivityFacetQuerySpec,
    pub status: Option<ActivityFacetQueryStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventFacetQuerySpec {
    #[serde(flatten)]
    pub time_range: TimeRange,
    pub field_selector: Option<String>,
    pub fields: Vec<FacetFieldRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventFacetQueryStatus {
    pub results: Vec<FacetResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventFacetQuery {
    pub spec: EventFacetQuerySpec,
    pub status: Option<EventFacetQueryStatus>,
}

// ---------------------------------------------------------------------
// PolicyPreview
// ---------------------------------------------------------------------

/// Which record type a sample input represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicySampleKind {
    Audit,
    Event,
}

/// One sample input submitted for preview — the raw JSON shape of either
/// an audit or event record, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicySample {
    pub kind: PolicySampleKind,
    pub record: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyPreviewSpec {
    pub resource: PolicyResource,
    pub audit_rules: Vec<PolicyRule>,
    pub event_rules: Vec<PolicyRule>,
    pub samples: Vec<PolicySample>,
}

/// Result of running one sample through the compiled policy (spec §4.9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyPreviewResult {
    pub matched: bool,
    pub rule_index: Option<usize>,
    pub rule_type: Option<PolicySampleKind>,
    pub error: Option<String>,
    pub activity: Option<ActivityRecordView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyPreviewStatus {
    pub results: Vec<PolicyPreviewResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyPreview {
    pub spec: PolicyPreviewSpec,
    pub status: Option<PolicyPreviewStatus>,
}
