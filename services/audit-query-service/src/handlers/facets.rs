//! Ephemeral facet-query submit endpoints (spec §4.6, §4.9), backed by C6.

use crate::config::Config;
use crate::identity::Identity;
use crate::validation::validate_time_range;
use actix_web::{post, web, HttpRequest, HttpResponse};
use chrono::Utc;
use telemetry_common::error::AppError;
use telemetry_database::PgPool;
use telemetry_models::query::{
    ActivityFacetQuery, ActivityFacetQueryStatus, AuditLogFacetsQuery, AuditLogFacetsQueryStatus, EventFacetQuery,
    EventFacetQueryStatus, FacetBucket, FacetFieldRequest, FacetResult,
};
use telemetry_query_engine::filter::RecordType;

fn field_requests(fields: &[FacetFieldRequest]) -> Vec<(String, Option<u32>)> {
    fields.iter().map(|f| (f.field.clone(), f.limit)).collect()
}

fn to_facet_results(results: Vec<telemetry_store::FacetFieldResult>) -> Vec<FacetResult> {
    results
        .into_iter()
        .map(|r| FacetResult {
            field: r.field,
            buckets: r
                .buckets
                .into_iter()
                .map(|b| FacetBucket { value: b.value, count: b.count })
                .collect(),
        })
        .collect()
}

#[post("/auditlogfacetsqueries")]
async fn submit_audit(
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    req: HttpRequest,
    body: web::Json<AuditLogFacetsQuery>,
) -> Result<HttpResponse, AppError> {
    let now = Utc::now();
    let scope = Identity::from_request(&req).scope();
    let mut query = body.into_inner();

    let (start, end) = validate_time_range(&query.spec.time_range, config.max_audit_window_days, now)?;
    let results = telemetry_store::run_facets(
        pool.get_ref(),
        RecordType::Audit,
        &scope,
        start,
        end,
        query.spec.filter.as_deref(),
        &field_requests(&query.spec.fields),
    )
    .await?;

    query.status = Some(AuditLogFacetsQueryStatus { results: to_facet_results(results) });
    Ok(HttpResponse::Ok().json(query))
}

#[post("/activityfacetqueries")]
async fn submit_activity(
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    req: HttpRequest,
    body: web::Json<ActivityFacetQuery>,
) -> Result<HttpResponse, AppError> {
    let now = Utc::now();
    let scope = Identity::from_request(&req).scope();
    let mut query = body.into_inner();

    let (start, end) = validate_time_range(&query.spec.time_range, config.max_audit_window_days, now)?;
    let results = telemetry_store::run_facets(
        pool.get_ref(),
        RecordType::Activity,
        &scope,
        start,
        end,
        query.spec.filter.as_deref(),
        &field_requests(&query.spec.fields),
    )
    .await?;

    query.status = Some(ActivityFacetQueryStatus { results: to_facet_results(results) });
    Ok(HttpResponse::Ok().json(query))
}

#[post("/eventfacetqueries")]
async fn submit_event(
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    req: HttpRequest,
    body: web::Json<EventFacetQuery>,
) -> Result<HttpResponse, AppError> {
    let now = Utc::now();
    let scope = Identity::from_request(&req).scope();
    let mut query = body.into_inner();

    let (start, end) = validate_time_range(&query.spec.time_range, config.max_event_window_days, now)?;
    let results = telemetry_store::run_facets(
        pool.get_ref(),
        RecordType::Event,
        &scope,
        start,
        end,
        query.spec.field_selector.as_deref(),
        &field_requests(&query.spec.fields),
    )
    .await?;

    query.status = Some(EventFacetQueryStatus { results: to_facet_results(results) });
    Ok(HttpResponse::Ok().json(query))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(submit_audit).service(submit_activity).service(submit_event);
}
