//! Native Activity resource surface (spec §6): list and get are
//! read-through C5, delete removes a derived record outright, watch is C7.

use crate::config::Config;
use crate::identity::Identity;
use crate::streaming::WatchStream;
use crate::validation::{validate_limit, validate_time_range};
use actix_web::{delete, get, web, HttpRequest, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use telemetry_common::error::AppError;
use telemetry_database::PgPool;
use telemetry_models::query::TimeRange;
use telemetry_query_engine::filter::{CompiledFilter, RecordType};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    start: Option<String>,
    end: Option<String>,
    filter: Option<String>,
    limit: Option<u32>,
    #[serde(rename = "continue")]
    cursor: Option<String>,
}

#[get("/activities")]
async fn list(
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    req: HttpRequest,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, AppError> {
    let now = Utc::now();
    let scope = Identity::from_request(&req).scope();
    let time_range = TimeRange {
        start: query.start.clone().unwrap_or_else(|| "-1h".to_string()),
        end: query.end.clone().unwrap_or_else(|| "now".to_string()),
    };
    let (start, end) = validate_time_range(&time_range, config.max_audit_window_days, now)?;
    let limit = validate_limit(query.limit, config.default_page_size, config.max_page_size)?;

    let result = telemetry_store::query_activities(
        pool.get_ref(),
        &scope,
        start,
        end,
        query.filter.as_deref(),
        query.cursor.as_deref(),
        limit,
        now,
    )
    .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "items": result.records,
        "continue": result.continue_token,
    })))
}

#[get("/activities/{activity_id}")]
async fn get_one(
    pool: web::Data<PgPool>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let scope = Identity::from_request(&req).scope();
    let activity = telemetry_store::get_activity(pool.get_ref(), &scope, &path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(activity))
}

#[delete("/activities/{activity_id}")]
async fn delete_one(
    pool: web::Data<PgPool>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let scope = Identity::from_request(&req).scope();
    telemetry_store::delete_activity(pool.get_ref(), &scope, &path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[derive(Debug, Deserialize)]
pub struct WatchQuery {
    filter: Option<String>,
}

#[get("/activities/watch")]
async fn watch(
    bus: web::Data<async_nats::Client>,
    req: HttpRequest,
    query: web::Query<WatchQuery>,
) -> Result<HttpResponse, AppError> {
    let scope = Identity::from_request(&req).scope();
    let compiled_filter = query
        .filter
        .as_deref()
        .map(|src| CompiledFilter::compile(src, RecordType::Activity))
        .transpose()?;

    let subject = telemetry_bus::activity_subject(&scope);
    let predicate = move |record: &telemetry_models::ActivityRecordView| -> bool {
        let Some(filter) = &compiled_filter else { return true };
        filter.evaluate(&record.to_record_value()).unwrap_or(false)
    };

    let watch = telemetry_bus::start_watch(bus.get_ref().clone(), subject, predicate, 128).await?;
    Ok(HttpResponse::Ok()
        .content_type("application/json-seq")
        .streaming(WatchStream::new(watch)))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(watch).service(list).service(get_one).service(delete_one);
}
