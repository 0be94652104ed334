//! Audit log query planner & store gateway (C5, spec §4.5).

use crate::metrics;
use crate::predicate::{scope_condition, time_condition, ParamSink};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, Row};
use telemetry_common::error::{classify_db_error, AppError};
use telemetry_database::PgPool;
use telemetry_models::audit::{AuditRecord, AuditRecordView};
use telemetry_models::scope::Scope;
use telemetry_query_engine::cursor;
use telemetry_models::cursor::CursorPosition;
use telemetry_query_engine::filter::{CompiledFilter, RecordType, SqlParam};
use tracing::Instrument;

const COLUMNS: &str = "audit_id, verb, stage, request_received_timestamp, stage_timestamp, \
    user_username, user_uid, object_api_group, object_resource, object_name, object_namespace, \
    object_subresource, object_uid, response_status_code, request_object, response_object, \
    scope_type, scope_name, inserted_at";

/// Which pre-built secondary ordering the planner picked for this query.
/// Exposed only for tracing/observability — the actual `ORDER BY`/cursor
/// tie-break is always `(request_received_timestamp, audit_id)` (spec
/// §4.5: "projections are read-optimisations, not the ordering contract").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKeyHint {
    PlatformNoUserFilter,
    PlatformUserFilter,
    UserScope,
    TenantScope,
}

impl SortKeyHint {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKeyHint::PlatformNoUserFilter => "timestamp,apiGroup,resource,auditID",
            SortKeyHint::PlatformUserFilter => "timestamp,user,apiGroup,resource",
            SortKeyHint::UserScope => "timestamp,user,apiGroup,resource",
            SortKeyHint::TenantScope => "timestamp,scopeType,scopeName,user,auditID",
        }
    }
}

fn choose_sort_key(scope: &Scope, filter_source: Option<&str>) -> SortKeyHint {
    use telemetry_models::scope::ScopeType::*;
    match scope.scope_type {
        User => SortKeyHint::UserScope,
        Organization | Project => SortKeyHint::TenantScope,
        Platform => {
            if filter_source.map(|f| f.contains("user.")).unwrap_or(false) {
                SortKeyHint::PlatformUserFilter
            } else {
                SortKeyHint::PlatformNoUserFilter
            }
        }
    }
}

fn canonical_params(start: DateTime<Utc>, end: DateTime<Utc>, filter: Option<&str>, limit: u32) -> String {
    format!(
        "start={}&end={}&filter={}&limit={}",
        start.to_rfc3339(),
        end.to_rfc3339(),
        filter.unwrap_or(""),
        limit
    )
}

pub struct AuditQueryResult {
    pub records: Vec<AuditRecordView>,
    pub continue_token: String,
}

/// Run one audit-log query (spec §4.5). `filter_source` is the raw,
/// not-yet-compiled expression from the request spec.
#[allow(clippy::too_many_arguments)]
pub async fn query_audit_logs(
    pool: &PgPool,
    scope: &Scope,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    filter_source: Option<&str>,
    cursor_token: Option<&str>,
    limit: u32,
    now: DateTime<Utc>,
) -> Result<AuditQueryResult, AppError> {
    let span = tracing::info_span!(
        "store.query_audit_logs",
        filter = filter_source.unwrap_or(""),
        limit,
        row_count = tracing::field::Empty,
        has_more = tracing::field::Empty,
    );
    async move {
        let overall_start = std::time::Instant::now();
        let result = run_audit_query(pool, scope, start, end, filter_source, cursor_token, limit, now).await;
        metrics::QUERY_OVERALL_LATENCY
            .with_label_values(&["audit"])
            .observe(overall_start.elapsed().as_secs_f64());
        match &result {
            Ok(r) => {
                tracing::Span::current().record("row_count", r.records.len());
                tracing::Span::current().record("has_more", !r.continue_token.is_empty());
                metrics::record_success("audit");
            }
            Err(AppError::Database(e)) => {
                metrics::record_error("audit", classify_db_error(e).as_str());
            }
            Err(_) => metrics::record_error("audit", "unknown"),
        }
        result
    }
    .instrument(span)
    .await
}

async fn run_audit_query(
    pool: &PgPool,
    scope: &Scope,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    filter_source: Option<&str>,
    cursor_token: Option<&str>,
    limit: u32,
    now: DateTime<Utc>,
) -> Result<AuditQueryResult, AppError> {
    let sort_hint = choose_sort_key(scope, filter_source);
    tracing::debug!(sort_key = sort_hint.as_str(), "chosen sort-key hint");

    let canonical = canonical_params(start, end, filter_source, limit);

    let compiled_filter = filter_source
        .map(|src| CompiledFilter::compile(src, RecordType::Audit))
        .transpose()?;

    let cursor_position = cursor_token
        .map(|token| cursor::decode(token, &canonical, now))
        .transpose()?;

    let mut sink = ParamSink::default();
    let mut conditions = Vec::new();

    if let Some(cond) = scope_condition(scope, "user_uid", &mut sink) {
        conditions.push(cond);
    }
    conditions.push(time_condition("request_received_timestamp", start, end, &mut sink));

    if let Some(filter) = &compiled_filter {
        let lowered = filter.to_sql(sink.len());
        sink.params.extend(lowered.params);
        conditions.push(lowered.fragment);
    }

    if let Some(CursorPosition::TimestampTieBreak { timestamp, tie_breaker }) = &cursor_position {
        let ts_ph = sink.push(SqlParam::Timestamp(*timestamp));
        let id_ph = sink.push(SqlParam::String(tie_breaker.clone()));
        conditions.push(format!(
            "(request_received_timestamp < {ts_ph} OR (request_received_timestamp = {ts_ph} AND audit_id < {id_ph}))"
        ));
    }

    let where_clause = conditions.join(" AND ");
    let sql = format!(
        "SELECT {COLUMNS} FROM audit_records WHERE {where_clause} \
         ORDER BY request_received_timestamp DESC, audit_id DESC LIMIT {}",
        limit as i64 + 1
    );

    let mut query = sqlx::query(&sql);
    for param in &sink.params {
        query = bind_param(query, param);
    }

    let exec_start = std::time::Instant::now();
    let rows = query.fetch_all(pool).await.map_err(AppError::Database)?;
    metrics::QUERY_EXEC_LATENCY
        .with_label_values(&["audit"])
        .observe(exec_start.elapsed().as_secs_f64());

    let has_more = rows.len() > limit as usize;

    let mut records = Vec::with_capacity(rows.len());
    for row in &rows {
        match AuditRecord::from_row(row) {
            Ok(record) => records.push(record),
            Err(e) => tracing::warn!(error = %e, "skipping undecodable audit row"),
        }
    }

    if has_more {
        records.truncate(limit as usize);
    }

    let continue_token = if has_more {
        let last = records.last().expect("has_more implies at least one record");
        cursor::encode(
            CursorPosition::TimestampTieBreak {
                timestamp: last.request_received_timestamp,
                tie_breaker: last.audit_id.clone(),
            },
            &canonical,
            now,
        )
    } else {
        String::new()
    };

    Ok(AuditQueryResult {
        records: records.iter().map(AuditRecordView::from).collect(),
        continue_token,
    })
}

pub(crate) type PgQuery<'q> = sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>;

pub(crate) fn bind_param(query: PgQuery<'_>, param: &SqlParam) -> PgQuery<'_> {
    match param.clone() {
        SqlParam::String(s) => query.bind(s),
        SqlParam::Int(i) => query.bind(i),
        SqlParam::Double(d) => query.bind(d),
        SqlParam::Bool(b) => query.bind(b),
        SqlParam::Timestamp(t) => query.bind(t),
    }
}
