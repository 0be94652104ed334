use crate::adapters::BenchTarget;
use crate::result::BenchmarkResult;
use std::time::Instant;
use telemetry_models::activity::{Actor, ActorType};
use telemetry_models::policy::{ActivityPolicy, PolicyResource, PolicyRule};
use telemetry_models::value::{MapBuilder, RecordValue};
use telemetry_query_engine::policy::CompiledPolicy;

/// Benchmark adapter for the C3 policy compiler and rule evaluator.
pub struct PolicyEvaluationBench;

fn sample_policy() -> ActivityPolicy {
    ActivityPolicy {
        name: "httpproxies".into(),
        resource: PolicyResource { api_group: "networking.example.com".into(), kind: "HTTPProxy".into() },
        audit_rules: vec![
            PolicyRule {
                match_expression: "audit.verb == 'delete'".into(),
                summary_template: "{{ actor }} deleted {{ audit.objectRef.name }}".into(),
            },
            PolicyRule {
                match_expression: "audit.verb == 'update'".into(),
                summary_template: "{{ actor }} updated {{ audit.objectRef.name }}".into(),
            },
            PolicyRule {
                match_expression: "audit.verb == 'create'".into(),
                summary_template: "{{ actor }} created {{ audit.objectRef.name }}".into(),
            },
        ],
        event_rules: vec![],
    }
}

fn sample_audit_record() -> RecordValue {
    MapBuilder::new()
        .field("verb", RecordValue::String("delete".into()))
        .field(
            "objectRef",
            MapBuilder::new().field("name", RecordValue::String("edge-proxy".into())).build(),
        )
        .build()
}

impl BenchTarget for PolicyEvaluationBench {
    fn id(&self) -> String {
        "policy_evaluation".to_string()
    }

    fn run(&self) -> BenchmarkResult {
        let policy = sample_policy();
        let compiled = CompiledPolicy::compile(&policy).expect("policy compiles");
        let actor = Actor { name: "bob".into(), actor_type: ActorType::User, uid: "1".into() };
        let record = sample_audit_record();

        let start = Instant::now();
        let iterations = 1000;
        let mut matched = 0usize;

        for _ in 0..iterations {
            if compiled.evaluate_audit(&record, &actor).ok().flatten().is_some() {
                matched += 1;
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
                "rules_per_policy": policy.audit_rules.len(),
                "matched": matched,
                "throughput_ops_per_sec": iterations as f64 / duration.as_secs_f64(),
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_evaluation_bench() {
        let bench = PolicyEvaluationBench;
        assert_eq!(bench.id(), "policy_evaluation");
        let result = bench.run();
        assert_eq!(result.target_id, "policy_evaluation");
        assert!(result.metrics.get("matched").is_some());
    }
}
