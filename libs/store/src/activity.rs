//! Activity query store gateway — the read path sharing C5's planner
//! shape (spec §4.5) over `activity_records`, keyed by `inserted_at`
//! rather than a request-received timestamp since activities are
//! policy-derived rather than directly observed.

use crate::audit::bind_param;
use crate::metrics;
use crate::predicate::{scope_condition, time_condition, ParamSink};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, Row};
use telemetry_common::error::{classify_db_error, AppError};
use telemetry_database::PgPool;
use telemetry_models::activity::{ActivityRecord, ActivityRecordView};
use telemetry_models::cursor::CursorPosition;
use telemetry_models::scope::Scope;
use telemetry_query_engine::cursor;
use telemetry_query_engine::filter::{CompiledFilter, RecordType, SqlParam};
use tracing::Instrument;

const COLUMNS: &str = "activity_id, summary, change_source, actor_name, actor_type, actor_uid, \
    resource_api_group, resource_kind, resource_name, resource_namespace, resource_uid, \
    origin_type, origin_id, links, scope_type, scope_name, inserted_at";

fn canonical_params(start: DateTime<Utc>, end: DateTime<Utc>, filter: Option<&str>, limit: u32) -> String {
    format!(
        "start={}&end={}&filter={}&limit={}",
        start.to_rfc3339(),
        end.to_rfc3339(),
        filter.unwrap_or(""),
        limit
    )
}

pub struct ActivityQueryResult {
    pub records: Vec<ActivityRecordView>,
    pub continue_token: String,
}

#[tracing::instrument(skip(pool))]
pub async fn get_activity(pool: &PgPool, scope: &Scope, activity_id: &str) -> Result<ActivityRecordView, AppError> {
    let mut sink = ParamSink::default();
    let id_ph = sink.push(SqlParam::String(activity_id.to_string()));
    let mut conditions = vec![format!("activity_id = {id_ph}")];
    if let Some(cond) = scope_condition(scope, "actor_uid", &mut sink) {
        conditions.push(cond);
    }

    let sql = format!("SELECT {COLUMNS} FROM activity_records WHERE {}", conditions.join(" AND "));
    let mut query = sqlx::query(&sql);
    for param in &sink.params {
        query = bind_param(query, param);
    }

    let row = query.fetch_optional(pool).await.map_err(AppError::Database)?;
    let row = row.ok_or_else(|| AppError::NotFound(format!("activity {activity_id} not found")))?;
    let record = ActivityRecord::from_row(&row).map_err(AppError::Database)?;
    Ok(ActivityRecordView::from(&record))
}

#[tracing::instrument(skip(pool))]
pub async fn delete_activity(pool: &PgPool, scope: &Scope, activity_id: &str) -> Result<(), AppError> {
    get_activity(pool, scope, activity_id).await?;

    let mut sink = ParamSink::default();
    let id_ph = sink.push(SqlParam::String(activity_id.to_string()));
    let mut conditions = vec![format!("activity_id = {id_ph}")];
    if let Some(cond) = scope_condition(scope, "actor_uid", &mut sink) {
        conditions.push(cond);
    }

    let sql = format!("DELETE FROM activity_records WHERE {}", conditions.join(" AND "));
    let mut query = sqlx::query(&sql);
    for param in &sink.params {
        query = bind_param(query, param);
    }
    query.execute(pool).await.map_err(AppError::Database)?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub async fn query_activities(
    pool: &PgPool,
    scope: &Scope,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    filter_source: Option<&str>,
    cursor_token: Option<&str>,
    limit: u32,
    now: DateTime<Utc>,
) -> Result<ActivityQueryResult, AppError> {
    let span = tracing::info_span!(
        "store.query_activities",
        filter = filter_source.unwrap_or(""),
        limit,
        row_count = tracing::field::Empty,
        has_more = tracing::field::Empty,
    );
    async move {
        let overall_start = std::time::Instant::now();
        let result = run_query(pool, scope, start, end, filter_source, cursor_token, limit, now).await;
        metrics::QUERY_OVERALL_LATENCY
            .with_label_values(&["activity"])
            .observe(overall_start.elapsed().as_secs_f64());
        match &result {
            Ok(r) => {
                tracing::Span::current().record("row_count", r.records.len());
                tracing::Span::current().record("has_more", !r.continue_token.is_empty());
                metrics::record_success("activity");
            }
            Err(AppError::Database(e)) => metrics::record_error("activity", classify_db_error(e).as_str()),
            Err(_) => metrics::record_error("activity", "unknown"),
        }
        result
    }
    .instrument(span)
    .await
}

async fn run_query(
    pool: &PgPool,
    scope: &Scope,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    filter_source: Option<&str>,
    cursor_token: Option<&str>,
    limit: u32,
    now: DateTime<Utc>,
) -> Result<ActivityQueryResult, AppError> {
    let canonical = canonical_params(start, end, filter_source, limit);

    let compiled_filter = filter_source
        .map(|src| CompiledFilter::compile(src, RecordType::Activity))
        .transpose()?;

    let cursor_position = cursor_token
        .map(|token| cursor::decode(token, &canonical, now))
        .transpose()?;

    let mut sink = ParamSink::default();
    let mut conditions = Vec::new();

    if let Some(cond) = scope_condition(scope, "actor_uid", &mut sink) {
        conditions.push(cond);
    }
    conditions.push(time_condition("inserted_at", start, end, &mut sink));

    if let Some(filter) = &compiled_filter {
        let lowered = filter.to_sql(sink.len());
        sink.params.extend(lowered.params);
        conditions.push(lowered.fragment);
    }

    if let Some(CursorPosition::TimestampTieBreak { timestamp, tie_breaker }) = &cursor_position {
        let ts_ph = sink.push(SqlParam::Timestamp(*timestamp));
        let id_ph = sink.push(SqlParam::String(tie_breaker.clone()));
        conditions.push(format!(
            "(inserted_at < {ts_ph} OR (inserted_at = {ts_ph} AND activity_id < {id_ph}))"
        ));
    }

    let where_clause = conditions.join(" AND ");
    let sql = format!(
        "SELECT {COLUMNS} FROM activity_records WHERE {where_clause} \
         ORDER BY inserted_at DESC, activity_id DESC LIMIT {}",
        limit as i64 + 1
    );

    let mut query = sqlx::query(&sql);
    for param in &sink.params {
        query = bind_param(query, param);
    }

    let exec_start = std::time::Instant::now();
    let rows = query.fetch_all(pool).await.map_err(AppError::Database)?;
    metrics::QUERY_EXEC_LATENCY
        .with_label_values(&["activity"])
        .observe(exec_start.elapsed().as_secs_f64());

    let has_more = rows.len() > limit as usize;

    let mut records = Vec::with_capacity(rows.len());
    for row in &rows {
        match ActivityRecord::from_row(row) {
            Ok(record) => records.push(record),
            Err(e) => tracing::warn!(error = %e, "skipping undecodable activity row"),
        }
    }

    if has_more {
        records.truncate(limit as usize);
    }

    let continue_token = if has_more {
        let last = records.last().expect("has_more implies at least one record");
        cursor::encode(
            CursorPosition::TimestampTieBreak {
                timestamp: last.inserted_at,
                tie_breaker: last.activity_id.clone(),
            },
            &canonical,
            now,
        )
    } else {
        String::new()
    };

    Ok(ActivityQueryResult {
        records: records.iter().map(ActivityRecordView::from).collect(),
        continue_token,
    })
}
