use crate::adapters::BenchTarget;
use crate::result::BenchmarkResult;
use std::time::Instant;
use telemetry_models::value::{MapBuilder, RecordValue};
use telemetry_query_engine::filter::{CompiledFilter, RecordType};

/// Benchmark adapter for the C2 filter compiler: parse+typecheck+validate,
/// lower to SQL, and evaluate in-memory against a sample record.
pub struct FilterCompilationBench;

fn sample_audit_record() -> RecordValue {
    MapBuilder::new()
        .field("verb", RecordValue::String("delete".into()))
        .field(
            "objectRef",
            MapBuilder::new()
                .field("apiGroup", RecordValue::String("networking.example.com".into()))
                .field("resource", RecordValue::String("httpproxies".into()))
                .field("namespace", RecordValue::String("production".into()))
                .field("name", RecordValue::String("edge-proxy".into()))
                .build(),
        )
        .field(
            "user",
            MapBuilder::new().field("username", RecordValue::String("bob".into())).build(),
        )
        .field(
            "responseStatus",
            MapBuilder::new().field("code", RecordValue::Int(200)).build(),
        )
        .build()
}

impl BenchTarget for FilterCompilationBench {
    fn id(&self) -> String {
        "filter_compilation".to_string()
    }

    fn run(&self) -> BenchmarkResult {
        let source = "objectRef.namespace == 'production' && verb == 'delete' && responseStatus.code < 300";
        let record = sample_audit_record();

        let start = Instant::now();
        let iterations = 1000;
        let mut matches = 0usize;

        for _ in 0..iterations {
            let compiled = CompiledFilter::compile(source, RecordType::Audit).expect("filter compiles");
            let _ = compiled.to_sql(0);
            if compiled.evaluate(&record).unwrap_or(false) {
                matches += 1;
            }
        }

        let duration = start.elapsed();
        let avg_latency_ms = duration.as_secs_f64() * 1000.0 / iterations as f64;

        BenchmarkResult::new(
            self.id(),
            serde_json::json!({
                "iterations": iterations,
                "total_duration_ms": duration.as_millis(),
                "avg_latency_ms": avg_latency_ms,
                "matches": matches,
                "throughput_ops_per_sec": iterations as f64 / duration.as_secs_f64(),
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_compilation_bench() {
        let bench = FilterCompilationBench;
        assert_eq!(bench.id(), "filter_compilation");
        let result = bench.run();
        assert_eq!(result.target_id, "filter_compilation");
        assert!(result.metrics.get("matches").is_some());
    }
}
