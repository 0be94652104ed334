//! Policy-preview endpoint (spec §4.9): compiles the submitted policy
//! per request (never persisted) and runs each sample through C3.
//! Compilation errors surface in the response rather than failing the
//! request, so authors can iterate.

use actix_web::{post, web, HttpResponse};
use serde_json::Value;
use telemetry_common::error::AppError;
use telemetry_models::activity::{
    classify_change_source, resolve_actor_from_controller, resolve_actor_from_username, Actor, ActivityResource,
    Origin, OriginType,
};
use telemetry_models::policy::{ActivityPolicy, PolicyResource};
use telemetry_models::query::{PolicyPreview, PolicyPreviewResult, PolicyPreviewStatus, PolicySampleKind};
use telemetry_models::{ActivityRecordView, RecordValue};
use telemetry_query_engine::CompiledPolicy;

fn actor_for_sample(kind: PolicySampleKind, record: &Value) -> Actor {
    match kind {
        PolicySampleKind::Audit => {
            let username = record.pointer("/user/username").and_then(Value::as_str).unwrap_or("");
            let uid = record.pointer("/user/uid").and_then(Value::as_str).unwrap_or("");
            resolve_actor_from_username(username, uid)
        }
        PolicySampleKind::Event => {
            let controller = record
                .pointer("/reportingController")
                .and_then(Value::as_str)
                .or_else(|| record.pointer("/source/component").and_then(Value::as_str))
                .unwrap_or("");
            resolve_actor_from_controller(controller)
        }
    }
}

/// Resource reference for the preview activity: the policy's declared
/// `(apiGroup, kind)` plus name/namespace/uid read from the sample's
/// `objectRef`/`involvedObject`, whichever applies.
fn resource_for_sample(kind: PolicySampleKind, record: &Value, policy_resource: &PolicyResource) -> ActivityResource {
    let pointer_prefix = match kind {
        PolicySampleKind::Audit => "/objectRef",
        PolicySampleKind::Event => "/involvedObject",
    };
    let field = |suffix: &str| record.pointer(&format!("{pointer_prefix}{suffix}")).and_then(Value::as_str);

    ActivityResource {
        api_group: Some(policy_resource.api_group.clone()),
        kind: policy_resource.kind.clone(),
        name: field("/name").unwrap_or("").to_string(),
        namespace: field("/namespace").map(str::to_string),
        uid: field("/uid").map(str::to_string),
    }
}

#[post("/policypreviews")]
async fn submit(body: web::Json<PolicyPreview>) -> Result<HttpResponse, AppError> {
    let mut preview = body.into_inner();

    let policy = ActivityPolicy {
        name: "preview".to_string(),
        resource: preview.spec.resource.clone(),
        audit_rules: preview.spec.audit_rules.clone(),
        event_rules: preview.spec.event_rules.clone(),
    };

    let compiled = match CompiledPolicy::compile(&policy) {
        Ok(compiled) => compiled,
        Err(e) => {
            let results = preview
                .spec
                .samples
                .iter()
                .map(|_| PolicyPreviewResult {
                    matched: false,
                    rule_index: None,
                    rule_type: None,
                    error: Some(e.to_string()),
                    activity: None,
                })
                .collect();
            preview.status = Some(PolicyPreviewStatus { results });
            return Ok(HttpResponse::Ok().json(preview));
        }
    };

    let mut results = Vec::with_capacity(preview.spec.samples.len());
    for sample in &preview.spec.samples {
        let record_value = RecordValue::from(sample.record.clone());
        let actor = actor_for_sample(sample.kind, &sample.record);

        let evaluated = match sample.kind {
            PolicySampleKind::Audit => compiled.evaluate_audit(&record_value, &actor),
            PolicySampleKind::Event => compiled.evaluate_event(&record_value, &actor),
        };

        results.push(match evaluated {
            Ok(Some(draft)) => {
                let origin_type = match sample.kind {
                    PolicySampleKind::Audit => OriginType::Audit,
                    PolicySampleKind::Event => OriginType::Event,
                };
                let activity = ActivityRecordView {
                    activity_id: String::new(),
                    summary: draft.summary,
                    change_source: classify_change_source(actor.actor_type),
                    resource: resource_for_sample(sample.kind, &sample.record, &preview.spec.resource),
                    origin: Origin { origin_type, id: String::new() },
                    links: draft.links,
                    resource_version: String::new(),
                    actor,
                };
                PolicyPreviewResult {
                    matched: true,
                    rule_index: Some(draft.rule_index),
                    rule_type: Some(sample.kind),
                    error: None,
                    activity: Some(activity),
                }
            }
            Ok(None) => PolicyPreviewResult {
                matched: false,
                rule_index: None,
                rule_type: None,
                error: None,
                activity: None,
            },
            Err(e) => PolicyPreviewResult {
                matched: false,
                rule_index: None,
                rule_type: None,
                error: Some(format!("{}: {}", e.category.as_str(), e.source)),
                activity: None,
            },
        });
    }

    preview.status = Some(PolicyPreviewStatus { results });
    Ok(HttpResponse::Ok().json(preview))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(submit);
}
