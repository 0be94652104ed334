//! End-to-end scenario tests against the pure compilers/evaluators (C1-C4,
//! C7 selector). Scenarios that require a live Postgres row set (pagination
//! over 250 rows, facet counts) live in `scenarios_db_test.rs` instead,
//! against a containerised Postgres.

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use telemetry_models::activity::{classify_change_source, resolve_actor_from_username};
use telemetry_models::event::{EventRecordView, EventSource, EventType, InvolvedObject};
use telemetry_models::value::RecordValue;
use telemetry_query_engine::cursor::{decode, encode};
use telemetry_models::cursor::CursorPosition;
use telemetry_query_engine::filter::{CompiledFilter, RecordType};
use telemetry_query_engine::selector;
use telemetry_query_engine::time::parse_time;

fn ref_now() -> DateTime<Utc> {
    "2024-06-01T12:00:00Z".parse().unwrap()
}

fn audit_record(verb: &str, namespace: &str) -> RecordValue {
    RecordValue::from(json!({
        "verb": verb,
        "user": {"username": "alice@example.com", "uid": "u-1"},
        "objectRef": {
            "namespace": namespace,
            "resource": "secrets",
            "name": "db",
        },
    }))
}

/// Scenario 1: one delete-in-production audit row matches a filter over a
/// one-hour window anchored one minute after the event.
#[test]
fn scenario_one_audit_filter_and_window() {
    let t0 = ref_now();
    let now = t0 + Duration::minutes(1);

    let effective_start = parse_time("now-1h", now).unwrap();
    let effective_end = parse_time("now", now).unwrap();
    assert_eq!(effective_start, now - Duration::hours(1));
    assert_eq!(effective_end, now);

    let filter = CompiledFilter::compile(
        "verb == 'delete' && objectRef.namespace == 'production'",
        RecordType::Audit,
    )
    .unwrap();

    assert!(filter.evaluate(&audit_record("delete", "production")).unwrap());
    assert!(!filter.evaluate(&audit_record("get", "production")).unwrap());
    assert!(!filter.evaluate(&audit_record("delete", "staging")).unwrap());
}

/// Scenario 3: a policy preview over one sample create audit produces the
/// expected summary, a single link, and a human change source for a user
/// actor.
#[test]
fn scenario_three_policy_preview_end_to_end() {
    use telemetry_models::policy::{ActivityPolicy, PolicyResource, PolicyRule};
    use telemetry_query_engine::policy::CompiledPolicy;

    let policy = ActivityPolicy {
        name: "httpproxies".into(),
        resource: PolicyResource { api_group: "networking.example.com".into(), kind: "HTTPProxy".into() },
        audit_rules: vec![PolicyRule {
            match_expression: "audit.verb == 'create'".into(),
            summary_template:
                "{{ actor }} created {{ link('HTTPProxy ' + audit.objectRef.name, audit.responseObject) }}".into(),
        }],
        event_rules: vec![],
    };
    let compiled = CompiledPolicy::compile(&policy).unwrap();

    let sample = json!({
        "verb": "create",
        "user": {"username": "bob", "uid": "u-2"},
        "objectRef": {"name": "api-gw"},
        "responseObject": {"kind": "HTTPProxy", "name": "api-gw"},
    });
    let env = RecordValue::from(json!({"audit": sample}));
    let actor = resolve_actor_from_username("bob", "u-2");

    let draft = compiled.evaluate_audit(&env, &actor).unwrap().unwrap();
    assert_eq!(draft.summary, "bob created HTTPProxy api-gw");
    assert_eq!(draft.links.len(), 1);
    assert_eq!(classify_change_source(actor.actor_type), telemetry_models::activity::ChangeSource::Human);
    assert_eq!(actor.name, "bob");
}

/// Scenario 5: a created event matches a compound field selector iff it
/// satisfies both clauses.
#[test]
fn scenario_five_event_field_selector() {
    let matching = EventRecordView {
        namespace: "default".into(),
        name: "pod-restart".into(),
        uid: "uid-1".into(),
        involved_object: InvolvedObject { kind: "Pod".into(), name: "web-0".into(), ..Default::default() },
        reason: "Started".into(),
        message: "Container started".into(),
        event_type: EventType::Normal,
        count: 1,
        first_timestamp: ref_now(),
        last_timestamp: ref_now(),
        source: EventSource::default(),
        resource_version: "1".into(),
    };

    let mut non_matching_kind = matching.clone();
    non_matching_kind.involved_object.kind = "Service".into();

    let mut non_matching_type = matching.clone();
    non_matching_type.event_type = EventType::Warning;

    let selector_src = "involvedObject.kind=Pod,type!=Warning";

    assert!(selector::evaluate(selector_src, RecordType::Event, &matching.to_record_value()).unwrap());
    assert!(!selector::evaluate(selector_src, RecordType::Event, &non_matching_kind.to_record_value()).unwrap());
    assert!(!selector::evaluate(selector_src, RecordType::Event, &non_matching_type.to_record_value()).unwrap());
}

/// Scenario 6: a cursor issued under one filter is rejected once the
/// filter changes, with an error naming the cause.
#[test]
fn scenario_six_cursor_invalidated_by_changed_filter() {
    let now = ref_now();
    let position = CursorPosition::TimestampTieBreak { timestamp: now, tie_breaker: "audit-100".into() };
    let original_params = "start=now-7d&end=now&filter=verb%3D%3D'delete'&limit=100";
    let changed_params = "start=now-7d&end=now&filter=verb%3D%3D'get'&limit=100";

    let token = encode(position, original_params, now);
    let err = decode(&token, changed_params, now).unwrap_err();
    assert!(err.to_string().contains("parameters changed"));
}
