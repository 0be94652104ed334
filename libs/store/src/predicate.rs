//! Shared WHERE-clause composition for C5 (audit/activity) and C6
//! (facets): scope predicate, time-range predicate, and a `ParamSink` that
//! lets scope/time/filter/cursor predicates share one growing `$N`
//! parameter list, the same positional-binding discipline the filter
//! compiler's lowering stage uses (spec §4.2).

use chrono::{DateTime, Utc};
use telemetry_models::scope::{Scope, ScopeType};
use telemetry_query_engine::filter::SqlParam;

#[derive(Default)]
pub struct ParamSink {
    pub params: Vec<SqlParam>,
}

impl ParamSink {
    pub fn push(&mut self, param: SqlParam) -> String {
        self.params.push(param);
        format!("${}", self.params.len())
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }
}

/// Platform scope adds nothing; Organization/Project compare
/// `(scope_type, scope_name)`; User scope on audit/activity compares
/// `user_uid`/`actor_uid` directly (spec §4.5).
pub fn scope_condition(scope: &Scope, user_column: &str, sink: &mut ParamSink) -> Option<String> {
    match scope.scope_type {
        ScopeType::Platform => None,
        ScopeType::User => {
            let ph = sink.push(SqlParam::String(scope.scope_name.clone()));
            Some(format!("{user_column} = {ph}"))
        }
        ScopeType::Organization | ScopeType::Project => {
            let type_ph = sink.push(SqlParam::String(scope.scope_type.to_string()));
            let name_ph = sink.push(SqlParam::String(scope.scope_name.clone()));
            Some(format!("scope_type = {type_ph} AND scope_name = {name_ph}"))
        }
    }
}

/// Event user-scope falls back to `(scope_type, scope_name)` rather than a
/// dedicated user column, per spec §4.5's open question.
pub fn scope_condition_tenant_only(scope: &Scope, sink: &mut ParamSink) -> Option<String> {
    if scope.is_platform() {
        return None;
    }
    let type_ph = sink.push(SqlParam::String(scope.scope_type.to_string()));
    let name_ph = sink.push(SqlParam::String(scope.scope_name.clone()));
    Some(format!("scope_type = {type_ph} AND scope_name = {name_ph}"))
}

pub fn time_condition(
    column: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    sink: &mut ParamSink,
) -> String {
    let start_ph = sink.push(SqlParam::Timestamp(start));
    let end_ph = sink.push(SqlParam::Timestamp(end));
    format!("{column} >= {start_ph} AND {column} <= {end_ph}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_scope_adds_no_condition() {
        let mut sink = ParamSink::default();
        assert!(scope_condition(&Scope::platform(), "user_uid", &mut sink).is_none());
        assert_eq!(sink.len(), 0);
    }

    #[test]
    fn user_scope_compares_user_column_directly() {
        let mut sink = ParamSink::default();
        let scope = Scope { scope_type: ScopeType::User, scope_name: "uid-1".into() };
        let cond = scope_condition(&scope, "user_uid", &mut sink).unwrap();
        assert_eq!(cond, "user_uid = $1");
        assert_eq!(sink.params, vec![SqlParam::String("uid-1".into())]);
    }

    #[test]
    fn tenant_scope_compares_type_and_name() {
        let mut sink = ParamSink::default();
        let scope = Scope { scope_type: ScopeType::Organization, scope_name: "acme".into() };
        let cond = scope_condition(&scope, "user_uid", &mut sink).unwrap();
        assert_eq!(cond, "scope_type = $1 AND scope_name = $2");
    }
}
