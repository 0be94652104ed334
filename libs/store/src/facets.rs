//! Facet execution (C6, spec §4.6): runs one `GROUP BY`/`COUNT` statement
//! per requested field over the same scope/time/filter predicate C5 builds,
//! against the record type's table and time column.

use crate::audit::bind_param;
use crate::metrics;
use crate::predicate::{scope_condition, scope_condition_tenant_only, time_condition, ParamSink};
use chrono::{DateTime, Utc};
use sqlx::Row;
use telemetry_common::error::{classify_db_error, AppError};
use telemetry_database::PgPool;
use telemetry_models::scope::Scope;
use telemetry_query_engine::facets::plan_facets;
use telemetry_query_engine::filter::{CompiledFilter, RecordType};
use telemetry_query_engine::selector;

pub struct FacetBucket {
    pub value: String,
    pub count: i64,
}

pub struct FacetFieldResult {
    pub field: String,
    pub buckets: Vec<FacetBucket>,
}

struct TableShape {
    table: &'static str,
    time_column: &'static str,
    user_column: Option<&'static str>,
}

fn shape_for(record_type: RecordType) -> TableShape {
    match record_type {
        RecordType::Audit => TableShape {
            table: "audit_records",
            time_column: "request_received_timestamp",
            user_column: Some("user_uid"),
        },
        RecordType::Activity => TableShape {
            table: "activity_records",
            time_column: "inserted_at",
            user_column: Some("actor_uid"),
        },
        RecordType::Event => TableShape {
            table: "event_records",
            time_column: "last_timestamp",
            user_column: None,
        },
    }
}

fn metrics_label(record_type: RecordType) -> &'static str {
    match record_type {
        RecordType::Audit => "audit_facets",
        RecordType::Activity => "activity_facets",
        RecordType::Event => "event_facets",
    }
}

#[allow(clippy::too_many_arguments)]
pub async fn run_facets(
    pool: &PgPool,
    record_type: RecordType,
    scope: &Scope,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    filter_source: Option<&str>,
    fields: &[(String, Option<u32>)],
) -> Result<Vec<FacetFieldResult>, AppError> {
    let label = metrics_label(record_type);
    let overall_start = std::time::Instant::now();
    let result = run_facets_inner(pool, record_type, scope, start, end, filter_source, fields).await;
    metrics::QUERY_OVERALL_LATENCY
        .with_label_values(&[label])
        .observe(overall_start.elapsed().as_secs_f64());
    match &result {
        Ok(_) => metrics::record_success(label),
        Err(AppError::Database(e)) => metrics::record_error(label, classify_db_error(e).as_str()),
        Err(_) => metrics::record_error(label, "unknown"),
    }
    result
}

#[allow(clippy::too_many_arguments)]
async fn run_facets_inner(
    pool: &PgPool,
    record_type: RecordType,
    scope: &Scope,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    filter_source: Option<&str>,
    fields: &[(String, Option<u32>)],
) -> Result<Vec<FacetFieldResult>, AppError> {
    let shape = shape_for(record_type);
    let plans = plan_facets(record_type, fields)?;

    // Events are predicated with C8's field-selector grammar, not the C2
    // expression language the other two record types use.
    let compiled_filter = if record_type == RecordType::Event {
        None
    } else {
        filter_source.map(|src| CompiledFilter::compile(src, record_type)).transpose()?
    };

    let mut results = Vec::with_capacity(plans.len());
    for plan in &plans {
        let mut sink = ParamSink::default();
        let mut conditions = Vec::new();

        let scope_cond = match shape.user_column {
            Some(column) => scope_condition(scope, column, &mut sink),
            None => scope_condition_tenant_only(scope, &mut sink),
        };
        if let Some(cond) = scope_cond {
            conditions.push(cond);
        }
        conditions.push(time_condition(shape.time_column, start, end, &mut sink));

        if let Some(filter) = &compiled_filter {
            let lowered = filter.to_sql(sink.len());
            sink.params.extend(lowered.params);
            conditions.push(lowered.fragment);
        } else if record_type == RecordType::Event {
            if let Some(src) = filter_source {
                let lowered = selector::compile(src, record_type, sink.len())?;
                if !lowered.fragment.is_empty() {
                    sink.params.extend(lowered.params);
                    conditions.push(lowered.fragment);
                }
            }
        }

        let where_clause = conditions.join(" AND ");
        let sql = format!(
            "SELECT {col}::text AS facet_value, count(*) AS bucket_count FROM {table} \
             WHERE {where_clause} GROUP BY {col} ORDER BY bucket_count DESC, facet_value ASC LIMIT {limit}",
            col = plan.column,
            table = shape.table,
            limit = plan.limit,
        );

        let mut query = sqlx::query(&sql);
        for param in &sink.params {
            query = bind_param(query, param);
        }

        let rows = query.fetch_all(pool).await.map_err(AppError::Database)?;
        let mut buckets = Vec::with_capacity(rows.len());
        for row in &rows {
            let value: Option<String> = row.try_get("facet_value").map_err(AppError::Database)?;
            let count: i64 = row.try_get("bucket_count").map_err(AppError::Database)?;
            buckets.push(FacetBucket { value: value.unwrap_or_default(), count });
        }

        results.push(FacetFieldResult { field: plan.field.clone(), buckets });
    }

    Ok(results)
}
