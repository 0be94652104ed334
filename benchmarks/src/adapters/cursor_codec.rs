use crate::adapters::BenchTarget;
use crate::result::BenchmarkResult;
use chrono::Utc;
use std::time::Instant;
use telemetry_models::cursor::CursorPosition;
use telemetry_query_engine::cursor::{decode, encode};

/// Benchmark adapter for the C4 cursor codec: encode then decode a
/// pagination token.
pub struct CursorCodecBench;

impl BenchTarget for CursorCodecBench {
    fn id(&self) -> String {
        "cursor_codec".to_string()
    }

    fn run(&self) -> BenchmarkResult {
        let now = Utc::now();
        let params = "start=now-7d&end=now&filter=verb%3D%3D'delete'&limit=100";
        let position = CursorPosition::TimestampTieBreak {
            timestamp: now,
            tie_breaker: "audit-00000001".into(),
        };

        let start = Instant::now();
        let iterations = 2000;
        let mut decoded_ok = 0usize;

        for _ in 0..iterations {
            let token = encode(position.clone(), params, now);
            if decode(&token, params, now).is_ok() {
                decoded_ok += 1;
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
                "decoded_ok": decoded_ok,
                "throughput_ops_per_sec": iterations as f64 / duration.as_secs_f64(),
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_codec_bench() {
        let bench = CursorCodecBench;
        assert_eq!(bench.id(), "cursor_codec");
        let result = bench.run();
        assert_eq!(result.target_id, "cursor_codec");
        assert!(result.metrics.get("decoded_ok").is_some());
    }
}
