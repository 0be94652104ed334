//! Query-execution metrics (spec §4.5 "Observability"). Counters are
//! broken down by record type and status; execution latency (the time
//! spent inside the driver) is tracked separately from overall latency
//! (query building + binding + execution + row decode).

use once_cell::sync::Lazy;
use prometheus::{register_histogram_vec, register_int_counter_vec, HistogramVec, IntCounterVec};

pub static QUERY_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "telemetry_store_queries_total",
        "Store gateway queries by record type and outcome",
        &["record_type", "status"]
    )
    .expect("metric registration is infallible at startup")
});

pub static QUERY_ERROR_KIND: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "telemetry_store_query_errors_total",
        "Store gateway query errors by classified kind",
        &["record_type", "kind"]
    )
    .expect("metric registration is infallible at startup")
});

pub static QUERY_OVERALL_LATENCY: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "telemetry_store_query_duration_seconds",
        "Total time to plan, execute, and decode a store query",
        &["record_type"]
    )
    .expect("metric registration is infallible at startup")
});

pub static QUERY_EXEC_LATENCY: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "telemetry_store_query_exec_duration_seconds",
        "Time spent inside the database driver for a store query",
        &["record_type"]
    )
    .expect("metric registration is infallible at startup")
});

pub fn record_success(record_type: &str) {
    QUERY_TOTAL.with_label_values(&[record_type, "success"]).inc();
}

pub fn record_error(record_type: &str, kind: &str) {
    QUERY_TOTAL.with_label_values(&[record_type, "error"]).inc();
    QUERY_ERROR_KIND.with_label_values(&[record_type, kind]).inc();
}
