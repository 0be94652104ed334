use super::ast::Expr;
use super::schema::{allow_list_for, sibling_fields, RecordType};
use telemetry_common::error::AppError;

/// Stage 1 (spec §4.2): the top-level expression must itself be boolean.
/// A bare identifier or literal at the top level is rejected even though
/// it is syntactically valid as an operand elsewhere.
pub fn require_boolean_top_level(expr: &Expr, record_type: RecordType) -> Result<(), AppError> {
    let is_boolean_shaped = matches!(
        expr,
        Expr::Compare(..) | Expr::In(..) | Expr::And(..) | Expr::Or(..) | Expr::Not(..) | Expr::StringMethodCall(..)
    );
    if is_boolean_shaped {
        return Ok(());
    }
    let fields = sibling_fields(allow_list_for(record_type));
    Err(AppError::InvalidArgument(format!(
        "filter expression must evaluate to boolean; available fields: {}",
        fields.join(", ")
    )))
}

/// Stage 2 (spec §4.2): every identifier referenced in the AST must be in
/// the record type's allow-list.
pub fn validate_field_access(expr: &Expr, record_type: RecordType) -> Result<(), AppError> {
    let allow_list = allow_list_for(record_type);
    walk(expr, allow_list)
}

fn walk(expr: &Expr, allow_list: &super::schema::AllowList) -> Result<(), AppError> {
    match expr {
        Expr::Identifier(path) => {
            let key = path.join(".");
            if allow_list.contains_key(key.as_str()) {
                Ok(())
            } else {
                let fields = sibling_fields(allow_list);
                Err(AppError::InvalidArgument(format!(
                    "unknown field {key:?}; available fields: {}",
                    fields.join(", ")
                )))
            }
        }
        Expr::Literal(_) => Ok(()),
        Expr::Compare(_, lhs, rhs) => {
            walk(lhs, allow_list)?;
            walk(rhs, allow_list)
        }
        Expr::In(lhs, items) => {
            walk(lhs, allow_list)?;
            for item in items {
                walk(item, allow_list)?;
            }
            Ok(())
        }
        Expr::And(lhs, rhs) | Expr::Or(lhs, rhs) => {
            walk(lhs, allow_list)?;
            walk(rhs, allow_list)
        }
        Expr::Not(inner) => walk(inner, allow_list),
        Expr::StringMethodCall(_, receiver, arg) => {
            walk(receiver, allow_list)?;
            walk(arg, allow_list)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::parser::parse;
    use super::*;

    #[test]
    fn known_field_passes() {
        let expr = parse("verb == 'delete'").unwrap();
        assert!(require_boolean_top_level(&expr, RecordType::Audit).is_ok());
        assert!(validate_field_access(&expr, RecordType::Audit).is_ok());
    }

    #[test]
    fn unknown_field_fails_with_sibling_list() {
        let expr = parse("notAField == 'x'").unwrap();
        let err = validate_field_access(&expr, RecordType::Audit).unwrap_err();
        assert!(err.to_string().contains("unknown field"));
    }

    #[test]
    fn bare_identifier_at_top_level_fails() {
        let expr = parse("verb").unwrap();
        let err = require_boolean_top_level(&expr, RecordType::Audit).unwrap_err();
        assert!(err.to_string().to_lowercase().contains("boolean"));
    }
}
