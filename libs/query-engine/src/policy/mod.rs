//! Policy compiler and evaluator (C3, spec §4.3). A policy pairs one
//! resource (`apiGroup`, `kind`) with ordered audit/event rules; each rule
//! is a boolean match expression plus a summary template. Compiled policies
//! are cached process-wide behind an `ArcSwap` (spec §9 "Global
//! compiled-policy cache") and re-swapped wholesale whenever the
//! controller-owned policy list changes.

pub mod template;

use crate::filter::ast::Expr;
use crate::filter::eval::evaluate as evaluate_filter;
use crate::filter::lexer::Lexer;
use crate::filter::parser::parse_tokens;
use arc_swap::ArcSwap;
use std::collections::HashMap;
use std::sync::Arc;
use telemetry_common::error::AppError;
use telemetry_models::activity::{Actor, ActorType, Link};
use telemetry_models::policy::{ActivityPolicy, PolicyResource};
use telemetry_models::value::{MapBuilder, RecordValue};
use template::CompiledTemplate;

/// Why a record produced no activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NoMatchingPolicy,
}

/// Runtime evaluation error category (spec §4.3 "Failure semantics").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalErrorCategory {
    CelEvaluation,
    JsonUnmarshal,
    Publish,
    ActivityCreation,
}

impl EvalErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvalErrorCategory::CelEvaluation => "cel_evaluation",
            EvalErrorCategory::JsonUnmarshal => "json_unmarshal",
            EvalErrorCategory::Publish => "publish",
            EvalErrorCategory::ActivityCreation => "activity_creation",
        }
    }
}

#[derive(Debug)]
pub struct EvalError {
    pub policy_name: String,
    pub category: EvalErrorCategory,
    pub source: AppError,
}

/// A single compiled rule: match expression plus summary template.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    match_expr: Expr,
    template: CompiledTemplate,
}

impl CompiledRule {
    fn compile(match_expression: &str, summary_template: &str) -> Result<Self, AppError> {
        let tokens = Lexer::new(match_expression)
            .tokenize()
            .map_err(|e| AppError::InvalidArgument(format!("invalid match expression: {e}")))?;
        let match_expr = parse_tokens(tokens)
            .map_err(|e| AppError::InvalidArgument(format!("invalid match expression: {e}")))?;
        let template = CompiledTemplate::compile(summary_template)?;
        Ok(Self { match_expr, template })
    }
}

/// A policy whose rules have all compiled successfully and are ready to
/// evaluate. Policies that fail to compile never reach the index — the
/// caller marks them not-ready in their status instead.
#[derive(Debug, Clone)]
pub struct CompiledPolicy {
    pub name: String,
    pub resource: PolicyResource,
    audit_rules: Vec<CompiledRule>,
    event_rules: Vec<CompiledRule>,
}

impl CompiledPolicy {
    pub fn compile(policy: &ActivityPolicy) -> Result<Self, AppError> {
        let audit_rules = policy
            .audit_rules
            .iter()
            .map(|r| CompiledRule::compile(&r.match_expression, &r.summary_template))
            .collect::<Result<Vec<_>, _>>()?;
        let event_rules = policy
            .event_rules
            .iter()
            .map(|r| CompiledRule::compile(&r.match_expression, &r.summary_template))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            name: policy.name.clone(),
            resource: policy.resource.clone(),
            audit_rules,
            event_rules,
        })
    }
}

/// The outcome of running a record through a policy's rule set.
pub struct ActivityDraft {
    pub summary: String,
    pub links: Vec<Link>,
    /// Index, within the evaluated rule list, of the rule that matched —
    /// surfaced by the policy-preview endpoint (spec §4.9).
    pub rule_index: usize,
}

fn eval_rules(
    policy_name: &str,
    rules: &[CompiledRule],
    record: &RecordValue,
) -> Result<Option<ActivityDraft>, EvalError> {
    for (rule_index, rule) in rules.iter().enumerate() {
        let matched = evaluate_filter(&rule.match_expr, record).map_err(|e| EvalError {
            policy_name: policy_name.to_string(),
            category: EvalErrorCategory::CelEvaluation,
            source: e,
        })?;
        if matched {
            let (summary, links) = rule.template.render(record).map_err(|e| EvalError {
                policy_name: policy_name.to_string(),
                category: EvalErrorCategory::ActivityCreation,
                source: e,
            })?;
            return Ok(Some(ActivityDraft { summary, links, rule_index }));
        }
    }
    Ok(None)
}

impl CompiledPolicy {
    /// Evaluate an audit record's environment: `audit` (full record),
    /// `actor` (username string), `actorRef` (`{type, name}`).
    pub fn evaluate_audit(
        &self,
        audit: &RecordValue,
        actor: &Actor,
    ) -> Result<Option<ActivityDraft>, EvalError> {
        let env = audit_environment(audit, actor);
        eval_rules(&self.name, &self.audit_rules, &env)
    }

    /// Evaluate an event record's environment: `event` (full record),
    /// `actor` (derived from the reporting controller), `actorRef`
    /// (`{type: controller, name}`).
    pub fn evaluate_event(
        &self,
        event: &RecordValue,
        actor: &Actor,
    ) -> Result<Option<ActivityDraft>, EvalError> {
        let env = event_environment(event, actor);
        eval_rules(&self.name, &self.event_rules, &env)
    }
}

fn actor_ref_map(actor: &Actor) -> RecordValue {
    MapBuilder::new()
        .field("type", RecordValue::String(actor.actor_type.to_string()))
        .field("name", RecordValue::String(actor.name.clone()))
        .build()
}

fn audit_environment(audit: &RecordValue, actor: &Actor) -> RecordValue {
    MapBuilder::new()
        .field("audit", audit.clone())
        .field("actor", RecordValue::String(actor.name.clone()))
        .field("actorRef", actor_ref_map(actor))
        .build()
}

fn event_environment(event: &RecordValue, actor: &Actor) -> RecordValue {
    MapBuilder::new()
        .field("event", event.clone())
        .field("actor", RecordValue::String(actor.name.clone()))
        .field("actorRef", actor_ref_map(actor))
        .build()
}

/// Build the `actorRef` for event rules: always `type = controller`
/// regardless of the resolved actor name, per spec §4.3.
pub fn event_actor(name: &str) -> Actor {
    Actor {
        name: name.to_string(),
        actor_type: ActorType::Controller,
        uid: String::new(),
    }
}

/// Process-wide compiled-policy cache keyed by `(apiGroup, kind)`, held
/// behind an `ArcSwap` so readers never block a reload (spec §9).
pub struct PolicyIndex {
    by_resource: HashMap<(String, String), Vec<Arc<CompiledPolicy>>>,
}

impl PolicyIndex {
    pub fn build(policies: impl IntoIterator<Item = Arc<CompiledPolicy>>) -> Self {
        let mut by_resource: HashMap<(String, String), Vec<Arc<CompiledPolicy>>> = HashMap::new();
        for policy in policies {
            let key = (policy.resource.api_group.clone(), policy.resource.kind.clone());
            by_resource.entry(key).or_default().push(policy);
        }
        Self { by_resource }
    }

    pub fn for_resource(&self, api_group: &str, kind: &str) -> &[Arc<CompiledPolicy>] {
        self.by_resource
            .get(&(api_group.to_string(), kind.to_string()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Shared handle a service hands to every worker; the controller-owned
/// policy reconciler calls `store` on reload, readers call `load`.
pub struct PolicyCache {
    inner: ArcSwap<PolicyIndex>,
}

impl PolicyCache {
    pub fn new(index: PolicyIndex) -> Self {
        Self { inner: ArcSwap::from_pointee(index) }
    }

    pub fn load(&self) -> arc_swap::Guard<Arc<PolicyIndex>> {
        self.inner.load()
    }

    pub fn store(&self, index: PolicyIndex) {
        self.inner.store(Arc::new(index));
    }
}

impl Default for PolicyCache {
    fn default() -> Self {
        Self::new(PolicyIndex::build(std::iter::empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use telemetry_models::policy::PolicyRule;

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
            ],
            event_rules: vec![],
        }
    }

    fn audit_record() -> RecordValue {
        MapBuilder::new()
            .field("verb", RecordValue::String("delete".into()))
            .field(
                "objectRef",
                MapBuilder::new().field("name", RecordValue::String("edge-proxy".into())).build(),
            )
            .build()
    }

    #[test]
    fn first_matching_rule_wins() {
        let compiled = CompiledPolicy::compile(&sample_policy()).unwrap();
        let actor = Actor { name: "bob".into(), actor_type: ActorType::User, uid: "1".into() };
        let draft = compiled.evaluate_audit(&audit_record(), &actor).unwrap().unwrap();
        assert_eq!(draft.summary, "bob deleted edge-proxy");
    }

    #[test]
    fn no_matching_rule_yields_none() {
        let compiled = CompiledPolicy::compile(&sample_policy()).unwrap();
        let actor = Actor { name: "bob".into(), actor_type: ActorType::User, uid: "1".into() };
        let mut record_map = match audit_record() {
            RecordValue::Map(m) => m,
            _ => unreachable!(),
        };
        record_map.insert("verb".into(), RecordValue::String("get".into()));
        let result = compiled.evaluate_audit(&RecordValue::Map(record_map), &actor).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn policy_index_groups_by_resource() {
        let compiled = Arc::new(CompiledPolicy::compile(&sample_policy()).unwrap());
        let index = PolicyIndex::build(vec![compiled]);
        let found = index.for_resource("networking.example.com", "HTTPProxy");
        assert_eq!(found.len(), 1);
        assert!(index.for_resource("other", "Other").is_empty());
    }
}
