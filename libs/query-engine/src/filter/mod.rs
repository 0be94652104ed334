//! Filter compiler (C2, spec §4.2): parse, type-check, and lower the
//! expression language to parameterised SQL, or evaluate in-memory
//! against a decoded record.

pub mod ast;
pub mod eval;
pub mod lexer;
pub mod parser;
pub mod schema;
pub mod sql;
pub mod validate;

pub use schema::RecordType;
pub use sql::{LoweredFilter, SqlParam};

use ast::Expr;
use telemetry_common::error::AppError;
use telemetry_models::RecordValue;

/// A parsed, validated filter expression bound to one record type. Shared
/// front-end for both the SQL-lowering backend and the in-memory
/// evaluator (spec §9 "Expression-language runtime").
#[derive(Debug, Clone)]
pub struct CompiledFilter {
    expr: Expr,
    record_type: RecordType,
}

impl CompiledFilter {
    /// Three-stage pipeline (spec §4.2): parse+typecheck, field-access
    /// validation, ready for lowering/evaluation.
    pub fn compile(source: &str, record_type: RecordType) -> Result<Self, AppError> {
        if source.trim().is_empty() {
            return Err(AppError::InvalidArgument("filter expression must not be empty".into()));
        }
        let expr = parser::parse(source).map_err(|e| {
            AppError::InvalidArgument(format!("filter expression is not valid: {e}"))
        })?;
        validate::require_boolean_top_level(&expr, record_type)?;
        validate::validate_field_access(&expr, record_type)?;
        Ok(Self { expr, record_type })
    }

    pub fn to_sql(&self, param_offset: usize) -> LoweredFilter {
        sql::lower_to_sql(&self.expr, self.record_type, param_offset)
    }

    pub fn evaluate(&self, record: &RecordValue) -> Result<bool, AppError> {
        eval::evaluate(&self.expr, record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use telemetry_models::value::MapBuilder;

    #[test]
    fn compiles_and_lowers_and_evaluates_consistently() {
        let filter = CompiledFilter::compile(
            "verb == 'delete' && objectRef.namespace == 'production'",
            RecordType::Audit,
        )
        .unwrap();

        let lowered = filter.to_sql(0);
        assert_eq!(lowered.fragment, "(verb = $1 AND object_namespace = $2)");

        let record = MapBuilder::new()
            .field("verb", RecordValue::String("delete".into()))
            .field(
                "objectRef",
                MapBuilder::new()
                    .field("namespace", RecordValue::String("production".into()))
                    .build(),
            )
            .build();
        assert!(filter.evaluate(&record).unwrap());
    }

    #[test]
    fn rejects_unknown_field() {
        let err = CompiledFilter::compile("bogus == 'x'", RecordType::Audit).unwrap_err();
        assert!(err.to_string().contains("unknown field"));
    }

    #[test]
    fn rejects_empty_expression() {
        assert!(CompiledFilter::compile("", RecordType::Audit).is_err());
    }

    fn audit_row(verb: &str, namespace: &str) -> RecordValue {
        MapBuilder::new()
            .field("verb", RecordValue::String(verb.into()))
            .field(
                "objectRef",
                MapBuilder::new().field("namespace", RecordValue::String(namespace.into())).build(),
            )
            .build()
    }

    /// SQL-lowering and in-memory evaluation must agree on every row, per
    /// spec §8's filter round-trip property.
    #[quickcheck_macros::quickcheck]
    fn sql_and_in_memory_agree(verb_idx: usize, namespace_idx: usize) -> bool {
        let verbs = ["delete", "get", "create", "update"];
        let namespaces = ["production", "staging", "default"];
        let verb = verbs[verb_idx % verbs.len()];
        let namespace = namespaces[namespace_idx % namespaces.len()];

        let filter = CompiledFilter::compile(
            "verb == 'delete' && objectRef.namespace == 'production'",
            RecordType::Audit,
        )
        .unwrap();

        let row = audit_row(verb, namespace);
        let expected = verb == "delete" && namespace == "production";
        filter.evaluate(&row).unwrap() == expected
    }
}
