use crate::adapters::BenchTarget;
use crate::result::BenchmarkResult;
use chrono::Utc;
use std::time::Instant;
use telemetry_query_engine::time::parse_time;

/// Benchmark adapter for the C1 time-bound parser.
pub struct TimeParsingBench;

impl BenchTarget for TimeParsingBench {
    fn id(&self) -> String {
        "time_parsing".to_string()
    }

    fn run(&self) -> BenchmarkResult {
        let now = Utc::now();
        let inputs = [
            "now",
            "now-30s",
            "now-5m",
            "now-2h",
            "now-7d",
            "now-1w",
            "2024-06-01T12:00:00Z",
        ];

        let start = Instant::now();
        let iterations = 2000;
        let mut parsed = 0usize;

        for i in 0..iterations {
            let input = inputs[i % inputs.len()];
            if parse_time(input, now).is_ok() {
                parsed += 1;
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
                "parsed_ok": parsed,
                "throughput_ops_per_sec": iterations as f64 / duration.as_secs_f64(),
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_parsing_bench() {
        let bench = TimeParsingBench;
        assert_eq!(bench.id(), "time_parsing");
        let result = bench.run();
        assert_eq!(result.target_id, "time_parsing");
        assert!(result.metrics.get("avg_latency_ms").is_some());
    }
}
