//! Store gateway: C5 query planner (audit, activity) and C8 event
//! gateway, sharing one WHERE-clause composition layer (`predicate`) and
//! one metrics surface (`metrics`).

pub mod activity;
pub mod audit;
pub mod event;
pub mod facets;
pub mod metrics;
pub mod predicate;

pub use activity::{delete_activity, get_activity, query_activities, ActivityQueryResult};
pub use audit::{query_audit_logs, AuditQueryResult};
pub use event::{create_event, delete_event, get_event, list_events, update_event, EventQueryResult, EventUpdate, NewEvent};
pub use facets::{run_facets, FacetBucket, FacetFieldResult};
