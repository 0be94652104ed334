use serde::{Deserialize, Serialize};

/// A single `(matchExpression, summaryTemplate)` pair (spec §3, §4.3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRule {
    pub match_expression: String,
    pub summary_template: String,
}

/// Resource a policy applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyResource {
    pub api_group: String,
    pub kind: String,
}

/// Declarative per-resource policy, owned durably by an external
/// lifecycle controller (spec §3). This crate only ever consumes a
/// read-only snapshot seeded at startup and refreshed via the
/// controller's change feed — there is no write path here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityPolicy {
    pub name: String,
    pub resource: PolicyResource,
    pub audit_rules: Vec<PolicyRule>,
    pub event_rules: Vec<PolicyRule>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_keys_by_resource() {
        let policy = ActivityPolicy {
            name: "httpproxy-policy".into(),
            resource: PolicyResource {
                api_group: "networking.example.com".into(),
                kind: "HTTPProxy".into(),
            },
            audit_rules: vec![PolicyRule {
                match_expression: "audit.verb == 'create'".into(),
                summary_template: "{{ actor }} created {{ audit.objectRef.name }}".into(),
            }],
            event_rules: vec![],
        };
        assert_eq!(policy.audit_rules.len(), 1);
        assert!(policy.event_rules.is_empty());
    }
}
