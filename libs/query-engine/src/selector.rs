//! Event field-selector compiler (spec §4.8): a small comma-joined
//! `field=value` grammar, distinct from the C2 expression language, over
//! the event record's published selector table. `namespace`/`name`/`uid`
//! are accepted as aliases for the `metadata.*` forms.

use crate::filter::schema::{allow_list_for, RecordType};
use crate::filter::SqlParam;
use telemetry_common::error::AppError;
use telemetry_models::value::RecordValue;

pub struct LoweredSelector {
    pub fragment: String,
    pub params: Vec<SqlParam>,
}

fn normalize_field(field: &str) -> &str {
    match field {
        "metadata.namespace" => "namespace",
        "metadata.name" => "name",
        "metadata.uid" => "uid",
        other => other,
    }
}

/// Lower a selector string into a parameterised WHERE fragment joined by
/// AND. `param_offset` reserves `$1..=offset` for predicates the caller
/// has already bound. An empty selector lowers to an empty fragment.
pub fn compile(source: &str, record_type: RecordType, param_offset: usize) -> Result<LoweredSelector, AppError> {
    let allow_list = allow_list_for(record_type);
    let mut params = Vec::new();
    let mut next_param = param_offset + 1;
    let mut conditions = Vec::new();

    for term in source.split(',') {
        let term = term.trim();
        if term.is_empty() {
            continue;
        }
        let (field, op, value) = parse_term(term)?;
        let field = normalize_field(field);
        let column = allow_list.get(field).ok_or_else(|| {
            let mut fields: Vec<&str> = allow_list.keys().copied().collect();
            fields.sort_unstable();
            AppError::InvalidArgument(format!(
                "unknown field selector '{field}'; supported selectors: {}",
                fields.join(", ")
            ))
        })?;
        let placeholder = format!("${next_param}");
        next_param += 1;
        params.push(SqlParam::String(value.to_string()));
        let sql_op = if op == "!=" { "!=" } else { "=" };
        conditions.push(format!("{} {sql_op} {placeholder}", column.name));
    }

    Ok(LoweredSelector {
        fragment: conditions.join(" AND "),
        params,
    })
}

/// Evaluate a field selector against an in-memory record (spec §4.7
/// watch predicate), reusing the same identifier paths the SQL lowering
/// validates against the allow-list.
pub fn evaluate(source: &str, record_type: RecordType, record: &RecordValue) -> Result<bool, AppError> {
    let allow_list = allow_list_for(record_type);
    for term in source.split(',') {
        let term = term.trim();
        if term.is_empty() {
            continue;
        }
        let (field, op, value) = parse_term(term)?;
        let field = normalize_field(field);
        if !allow_list.contains_key(field) {
            let mut fields: Vec<&str> = allow_list.keys().copied().collect();
            fields.sort_unstable();
            return Err(AppError::InvalidArgument(format!(
                "unknown field selector '{field}'; supported selectors: {}",
                fields.join(", ")
            )));
        }
        let actual = record.get_path(field).map(RecordValue::render).unwrap_or_default();
        let matches = actual == value;
        let satisfied = if op == "!=" { !matches } else { matches };
        if !satisfied {
            return Ok(false);
        }
    }
    Ok(true)
}

fn parse_term(term: &str) -> Result<(&str, &str, &str), AppError> {
    for op in ["!=", "==", "="] {
        if let Some(idx) = term.find(op) {
            let field = term[..idx].trim();
            let value = term[idx + op.len()..].trim();
            if field.is_empty() {
                return Err(AppError::InvalidArgument(format!(
                    "field selector term '{term}' is missing a field name"
                )));
            }
            return Ok((field, op, value));
        }
    }
    Err(AppError::InvalidArgument(format!(
        "field selector term '{term}' has no recognised operator (=, ==, !=)"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_comma_joined_terms_as_and() {
        let lowered = compile("involvedObject.kind=Pod,type!=Warning", RecordType::Event, 0).unwrap();
        assert_eq!(lowered.fragment, "involved_object_kind = $1 AND event_type != $2");
        assert_eq!(lowered.params.len(), 2);
    }

    #[test]
    fn namespace_name_uid_alias_to_canonical_columns() {
        let lowered = compile("namespace=default,name=pod-1,uid=u1", RecordType::Event, 0).unwrap();
        assert_eq!(lowered.fragment, "namespace = $1 AND name = $2 AND uid = $3");
    }

    #[test]
    fn unknown_field_lists_supported_selectors() {
        let err = compile("bogus=1", RecordType::Event, 0).unwrap_err();
        assert!(err.to_string().contains("unknown field selector"));
    }

    #[test]
    fn empty_selector_lowers_to_empty_fragment() {
        let lowered = compile("", RecordType::Event, 0).unwrap();
        assert!(lowered.fragment.is_empty());
        assert!(lowered.params.is_empty());
    }

    #[test]
    fn param_offset_continues_numbering() {
        let lowered = compile("reason=Scheduled", RecordType::Event, 2).unwrap();
        assert_eq!(lowered.fragment, "reason = $3");
    }
}
