//! Event store gateway (C8, spec §4.8): create, get, list, update,
//! delete over `event_records`. Watch is delegated to `telemetry_bus`.

use crate::metrics;
use crate::predicate::{scope_condition_tenant_only, time_condition, ParamSink};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, Row};
use telemetry_common::error::{classify_db_error, AppError};
use telemetry_database::PgPool;
use telemetry_models::cursor::CursorPosition;
use telemetry_models::event::{EventRecord, EventRecordView, EventSource, EventType, InvolvedObject};
use telemetry_models::scope::Scope;
use telemetry_query_engine::cursor;
use telemetry_query_engine::filter::{RecordType, SqlParam};
use telemetry_query_engine::selector;
use tracing::Instrument;

const COLUMNS: &str = "namespace, name, uid, involved_object_api_version, involved_object_kind, \
    involved_object_namespace, involved_object_name, involved_object_uid, involved_object_field_path, \
    reason, message, event_type, count, first_timestamp, last_timestamp, source_component, source_host, \
    reporting_component, reporting_instance, scope_type, scope_name, inserted_at";

/// Fields a client supplies to create an event (spec §4.8 "Create").
pub struct NewEvent {
    pub namespace: String,
    pub name: String,
    pub uid: Option<String>,
    pub involved_object: InvolvedObject,
    pub reason: String,
    pub message: String,
    pub event_type: EventType,
    pub first_timestamp: Option<DateTime<Utc>>,
    pub last_timestamp: Option<DateTime<Utc>>,
    pub source: EventSource,
    pub reporting_component: Option<String>,
    pub reporting_instance: Option<String>,
}

/// Fields a client supplies to update an event (spec §4.8 "Update").
/// `uid` and `firstTimestamp` are never accepted here — they are
/// preserved from the existing row.
pub struct EventUpdate {
    pub reason: Option<String>,
    pub message: Option<String>,
    pub event_type: Option<EventType>,
    pub last_timestamp: Option<DateTime<Utc>>,
    pub source: Option<EventSource>,
    pub reporting_component: Option<String>,
    pub reporting_instance: Option<String>,
}

fn canonical_list_params(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    namespace: Option<&str>,
    field_selector: Option<&str>,
    limit: u32,
) -> String {
    format!(
        "start={}&end={}&namespace={}&fieldSelector={}&limit={}",
        start.to_rfc3339(),
        end.to_rfc3339(),
        namespace.unwrap_or(""),
        field_selector.unwrap_or(""),
        limit
    )
}

#[tracing::instrument(skip(pool, bus, input), fields(namespace = %input.namespace, name = %input.name))]
#[allow(clippy::too_many_arguments)]
pub async fn create_event(
    pool: &PgPool,
    bus: Option<&async_nats::Client>,
    scope: &Scope,
    input: NewEvent,
    now: DateTime<Utc>,
) -> Result<EventRecordView, AppError> {
    let uid = input.uid.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let first_timestamp = input.first_timestamp.unwrap_or(now);
    let last_timestamp = input.last_timestamp.unwrap_or(now);

    let sql = format!(
        "INSERT INTO event_records ({COLUMNS}) \
         VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18,$19,$20,$21,$22)"
    );

    sqlx::query(&sql)
        .bind(&input.namespace)
        .bind(&input.name)
        .bind(&uid)
        .bind(&input.involved_object.api_version)
        .bind(&input.involved_object.kind)
        .bind(&input.involved_object.namespace)
        .bind(&input.involved_object.name)
        .bind(&input.involved_object.uid)
        .bind(&input.involved_object.field_path)
        .bind(&input.reason)
        .bind(&input.message)
        .bind(input.event_type.to_string())
        .bind(1i64)
        .bind(first_timestamp)
        .bind(last_timestamp)
        .bind(&input.source.component)
        .bind(&input.source.host)
        .bind(&input.reporting_component)
        .bind(&input.reporting_instance)
        .bind(scope.scope_type.to_string())
        .bind(&scope.scope_name)
        .bind(now)
        .execute(pool)
        .await
        .map_err(AppError::Database)?;

    let record = EventRecord {
        namespace: input.namespace,
        name: input.name,
        uid: uid.clone(),
        involved_object_api_version: input.involved_object.api_version,
        involved_object_kind: input.involved_object.kind,
        involved_object_namespace: input.involved_object.namespace,
        involved_object_name: input.involved_object.name,
        involved_object_uid: input.involved_object.uid,
        involved_object_field_path: input.involved_object.field_path,
        reason: input.reason,
        message: input.message,
        event_type: input.event_type.to_string(),
        count: 1,
        first_timestamp,
        last_timestamp,
        source_component: input.source.component,
        source_host: input.source.host,
        reporting_component: input.reporting_component,
        reporting_instance: input.reporting_instance,
        scope_type: scope.scope_type.to_string(),
        scope_name: scope.scope_name.clone(),
        inserted_at: now,
    };
    let view = EventRecordView::from(&record);

    if let Some(client) = bus {
        let subject = telemetry_bus::event_subject(scope, Some(&record.namespace));
        let op = telemetry_bus::FrameType::Added;
        if let Err(e) = telemetry_bus::publish(client, subject, &uid, op, &view).await {
            tracing::warn!(error = %e, "failed to publish created event to bus");
        }
    }

    Ok(view)
}

#[tracing::instrument(skip(pool))]
pub async fn get_event(
    pool: &PgPool,
    scope: &Scope,
    namespace: &str,
    name: &str,
) -> Result<EventRecordView, AppError> {
    let mut sink = ParamSink::default();
    let namespace_ph = sink.push(SqlParam::String(namespace.to_string()));
    let name_ph = sink.push(SqlParam::String(name.to_string()));
    let mut conditions = vec![format!("namespace = {namespace_ph}"), format!("name = {name_ph}")];
    if let Some(cond) = scope_condition_tenant_only(scope, &mut sink) {
        conditions.push(cond);
    }

    let sql = format!(
        "SELECT {COLUMNS} FROM event_records WHERE {} ORDER BY inserted_at DESC LIMIT 1",
        conditions.join(" AND ")
    );

    let mut query = sqlx::query(&sql);
    for param in &sink.params {
        query = crate::audit::bind_param(query, param);
    }

    let row = query.fetch_optional(pool).await.map_err(AppError::Database)?;
    let row = row.ok_or_else(|| AppError::NotFound(format!("event {namespace}/{name} not found")))?;
    let record = EventRecord::from_row(&row).map_err(AppError::Database)?;
    Ok(EventRecordView::from(&record))
}

pub struct EventQueryResult {
    pub records: Vec<EventRecordView>,
    pub continue_token: String,
}

/// List events over `[start, end]`, merge-on-read deduplicated to the
/// newest row per `(namespace, name, uid)` (spec §4.8). Callers pick the
/// window: 24h for the native list surface, up to 60d for `EventQuery`.
#[allow(clippy::too_many_arguments)]
pub async fn list_events(
    pool: &PgPool,
    scope: &Scope,
    namespace: Option<&str>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    field_selector: Option<&str>,
    cursor_token: Option<&str>,
    limit: u32,
    now: DateTime<Utc>,
) -> Result<EventQueryResult, AppError> {
    let span = tracing::info_span!(
        "store.list_events",
        selector = field_selector.unwrap_or(""),
        limit,
        row_count = tracing::field::Empty,
        has_more = tracing::field::Empty,
    );
    async move {
        let overall_start = std::time::Instant::now();
        let result = run_list(pool, scope, namespace, start, end, field_selector, cursor_token, limit, now).await;
        metrics::QUERY_OVERALL_LATENCY
            .with_label_values(&["event"])
            .observe(overall_start.elapsed().as_secs_f64());
        match &result {
            Ok(r) => {
                tracing::Span::current().record("row_count", r.records.len());
                tracing::Span::current().record("has_more", !r.continue_token.is_empty());
                metrics::record_success("event");
            }
            Err(AppError::Database(e)) => metrics::record_error("event", classify_db_error(e).as_str()),
            Err(_) => metrics::record_error("event", "unknown"),
        }
        result
    }
    .instrument(span)
    .await
}

#[allow(clippy::too_many_arguments)]
async fn run_list(
    pool: &PgPool,
    scope: &Scope,
    namespace: Option<&str>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    field_selector: Option<&str>,
    cursor_token: Option<&str>,
    limit: u32,
    now: DateTime<Utc>,
) -> Result<EventQueryResult, AppError> {
    let canonical = canonical_list_params(start, end, namespace, field_selector, limit);

    let offset = match cursor_token
        .map(|token| cursor::decode(token, &canonical, now))
        .transpose()?
    {
        Some(CursorPosition::Offset(n)) => n,
        Some(CursorPosition::TimestampTieBreak { .. }) => {
            return Err(AppError::InvalidArgument("cursor does not belong to an event query".into()))
        }
        None => 0,
    };

    let mut sink = ParamSink::default();
    let mut conditions = Vec::new();

    if let Some(cond) = scope_condition_tenant_only(scope, &mut sink) {
        conditions.push(cond);
    }
    conditions.push(time_condition("last_timestamp", start, end, &mut sink));
    if let Some(ns) = namespace {
        let ph = sink.push(SqlParam::String(ns.to_string()));
        conditions.push(format!("namespace = {ph}"));
    }
    if let Some(selector_src) = field_selector {
        let lowered = selector::compile(selector_src, RecordType::Event, sink.len())?;
        sink.params.extend(lowered.params);
        if !lowered.fragment.is_empty() {
            conditions.push(lowered.fragment);
        }
    }

    let where_clause = conditions.join(" AND ");
    let sql = format!(
        "WITH latest AS ( \
            SELECT DISTINCT ON (namespace, name, uid) {COLUMNS} \
            FROM event_records \
            ORDER BY namespace, name, uid, inserted_at DESC \
         ) \
         SELECT {COLUMNS} FROM latest WHERE {where_clause} \
         ORDER BY last_timestamp DESC, uid DESC \
         LIMIT {} OFFSET {}",
        limit as i64 + 1,
        offset
    );

    let mut query = sqlx::query(&sql);
    for param in &sink.params {
        query = crate::audit::bind_param(query, param);
    }

    let exec_start = std::time::Instant::now();
    let rows = query.fetch_all(pool).await.map_err(AppError::Database)?;
    metrics::QUERY_EXEC_LATENCY
        .with_label_values(&["event"])
        .observe(exec_start.elapsed().as_secs_f64());

    let has_more = rows.len() > limit as usize;

    let mut records = Vec::with_capacity(rows.len());
    for row in &rows {
        match EventRecord::from_row(row) {
            Ok(record) => records.push(record),
            Err(e) => tracing::warn!(error = %e, "skipping undecodable event row"),
        }
    }

    if has_more {
        records.truncate(limit as usize);
    }

    let continue_token = if has_more {
        cursor::encode(CursorPosition::Offset(offset + limit as u64), &canonical, now)
    } else {
        String::new()
    };

    Ok(EventQueryResult {
        records: records.iter().map(EventRecordView::from).collect(),
        continue_token,
    })
}

#[tracing::instrument(skip(pool, bus, patch))]
pub async fn update_event(
    pool: &PgPool,
    bus: Option<&async_nats::Client>,
    scope: &Scope,
    namespace: &str,
    name: &str,
    uid: &str,
    patch: EventUpdate,
    now: DateTime<Utc>,
) -> Result<EventRecordView, AppError> {
    let existing = find_by_identity(pool, scope, namespace, name, uid).await?;

    let last_timestamp = patch.last_timestamp.unwrap_or(now);
    let record = EventRecord {
        namespace: existing.namespace,
        name: existing.name,
        uid: existing.uid.clone(),
        involved_object_api_version: existing.involved_object_api_version,
        involved_object_kind: existing.involved_object_kind,
        involved_object_namespace: existing.involved_object_namespace,
        involved_object_name: existing.involved_object_name,
        involved_object_uid: existing.involved_object_uid,
        involved_object_field_path: existing.involved_object_field_path,
        reason: patch.reason.unwrap_or(existing.reason),
        message: patch.message.unwrap_or(existing.message),
        event_type: patch.event_type.map(|t| t.to_string()).unwrap_or(existing.event_type),
        count: existing.count + 1,
        first_timestamp: existing.first_timestamp,
        last_timestamp,
        source_component: patch.source.as_ref().and_then(|s| s.component.clone()).or(existing.source_component),
        source_host: patch.source.as_ref().and_then(|s| s.host.clone()).or(existing.source_host),
        reporting_component: patch.reporting_component.or(existing.reporting_component),
        reporting_instance: patch.reporting_instance.or(existing.reporting_instance),
        scope_type: existing.scope_type,
        scope_name: existing.scope_name,
        inserted_at: now,
    };

    let sql = format!(
        "INSERT INTO event_records ({COLUMNS}) \
         VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18,$19,$20,$21,$22)"
    );
    sqlx::query(&sql)
        .bind(&record.namespace)
        .bind(&record.name)
        .bind(&record.uid)
        .bind(&record.involved_object_api_version)
        .bind(&record.involved_object_kind)
        .bind(&record.involved_object_namespace)
        .bind(&record.involved_object_name)
        .bind(&record.involved_object_uid)
        .bind(&record.involved_object_field_path)
        .bind(&record.reason)
        .bind(&record.message)
        .bind(&record.event_type)
        .bind(record.count)
        .bind(record.first_timestamp)
        .bind(record.last_timestamp)
        .bind(&record.source_component)
        .bind(&record.source_host)
        .bind(&record.reporting_component)
        .bind(&record.reporting_instance)
        .bind(&record.scope_type)
        .bind(&record.scope_name)
        .bind(record.inserted_at)
        .execute(pool)
        .await
        .map_err(AppError::Database)?;

    let view = EventRecordView::from(&record);
    let resource_version = view.resource_version.clone();

    if let Some(client) = bus {
        let subject = telemetry_bus::event_subject(scope, Some(&record.namespace));
        let dedup_key = format!("{uid}-{resource_version}");
        let op = telemetry_bus::FrameType::Modified;
        if let Err(e) = telemetry_bus::publish(client, subject, &dedup_key, op, &view).await {
            tracing::warn!(error = %e, "failed to publish updated event to bus");
        }
    }

    Ok(view)
}

#[tracing::instrument(skip(pool, bus))]
pub async fn delete_event(
    pool: &PgPool,
    bus: Option<&async_nats::Client>,
    scope: &Scope,
    namespace: &str,
    name: &str,
    uid: &str,
) -> Result<(), AppError> {
    let existing = find_by_identity(pool, scope, namespace, name, uid).await?;

    let mut sink = ParamSink::default();
    let namespace_ph = sink.push(SqlParam::String(namespace.to_string()));
    let name_ph = sink.push(SqlParam::String(name.to_string()));
    let uid_ph = sink.push(SqlParam::String(uid.to_string()));
    let mut conditions = vec![
        format!("namespace = {namespace_ph}"),
        format!("name = {name_ph}"),
        format!("uid = {uid_ph}"),
    ];
    if let Some(cond) = scope_condition_tenant_only(scope, &mut sink) {
        conditions.push(cond);
    }

    let sql = format!("DELETE FROM event_records WHERE {}", conditions.join(" AND "));
    let mut query = sqlx::query(&sql);
    for param in &sink.params {
        query = crate::audit::bind_param(query, param);
    }
    query.execute(pool).await.map_err(AppError::Database)?;

    if let Some(client) = bus {
        let view = EventRecordView::from(&existing);
        let subject = telemetry_bus::event_subject(scope, Some(&existing.namespace));
        let op = telemetry_bus::FrameType::Deleted;
        if let Err(e) = telemetry_bus::publish(client, subject, uid, op, &view).await {
            tracing::warn!(error = %e, "failed to publish deleted event to bus");
        }
    }

    Ok(())
}

async fn find_by_identity(
    pool: &PgPool,
    scope: &Scope,
    namespace: &str,
    name: &str,
    uid: &str,
) -> Result<EventRecord, AppError> {
    let mut sink = ParamSink::default();
    let namespace_ph = sink.push(SqlParam::String(namespace.to_string()));
    let name_ph = sink.push(SqlParam::String(name.to_string()));
    let uid_ph = sink.push(SqlParam::String(uid.to_string()));
    let mut conditions = vec![
        format!("namespace = {namespace_ph}"),
        format!("name = {name_ph}"),
        format!("uid = {uid_ph}"),
    ];
    if let Some(cond) = scope_condition_tenant_only(scope, &mut sink) {
        conditions.push(cond);
    }

    let sql = format!(
        "SELECT {COLUMNS} FROM event_records WHERE {} ORDER BY inserted_at DESC LIMIT 1",
        conditions.join(" AND ")
    );
    let mut query = sqlx::query(&sql);
    for param in &sink.params {
        query = crate::audit::bind_param(query, param);
    }
    let row = query.fetch_optional(pool).await.map_err(AppError::Database)?;
    let row = row.ok_or_else(|| AppError::NotFound(format!("event {namespace}/{name} (uid {uid}) not found")))?;
    EventRecord::from_row(&row).map_err(AppError::Database)
}
