//! Ephemeral ActivityQuery submit endpoint (spec §4.9), backed by C5.

use crate::config::Config;
use crate::identity::Identity;
use crate::validation::{validate_limit, validate_time_range};
use actix_web::{post, web, HttpRequest, HttpResponse};
use chrono::Utc;
use telemetry_common::error::AppError;
use telemetry_database::PgPool;
use telemetry_models::query::{ActivityQuery, ActivityQueryStatus};

#[post("/activityqueries")]
async fn submit(
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    req: HttpRequest,
    body: web::Json<ActivityQuery>,
) -> Result<HttpResponse, AppError> {
    let now = Utc::now();
    let scope = Identity::from_request(&req).scope();
    let mut query = body.into_inner();

    let (start, end) = validate_time_range(&query.spec.time_range, config.max_audit_window_days, now)?;
    let limit = validate_limit(query.spec.limit, config.default_page_size, config.max_page_size)?;

    let result = telemetry_store::query_activities(
        pool.get_ref(),
        &scope,
        start,
        end,
        query.spec.filter.as_deref(),
        query.spec.cursor.as_deref(),
        limit,
        now,
    )
    .await?;

    query.status = Some(ActivityQueryStatus {
        results: result.records,
        continue_token: result.continue_token,
        effective_start_time: start,
        effective_end_time: end,
    });

    Ok(HttpResponse::Ok().json(query))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(submit);
}
