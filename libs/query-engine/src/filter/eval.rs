use super::ast::{CompareOp, Expr, Literal, StringMethod};
use std::cmp::Ordering;
use telemetry_common::error::AppError;
use telemetry_models::RecordValue;

/// In-memory evaluator sharing the AST and allow-list with [`super::sql`]'s
/// SQL backend (spec §9 "Expression-language runtime"). Used for C7 watch
/// filters and for the round-trip property tests in §8.
pub fn evaluate(expr: &Expr, record: &RecordValue) -> Result<bool, AppError> {
    match expr {
        Expr::Compare(op, lhs, rhs) => {
            let left = resolve(lhs, record)?;
            let right = resolve(rhs, record)?;
            let ordering = compare(&left, &right)?;
            Ok(match op {
                CompareOp::Eq => ordering == Ordering::Equal,
                CompareOp::Ne => ordering != Ordering::Equal,
                CompareOp::Lt => ordering == Ordering::Less,
                CompareOp::Le => ordering != Ordering::Greater,
                CompareOp::Gt => ordering == Ordering::Greater,
                CompareOp::Ge => ordering != Ordering::Less,
            })
        }
        Expr::In(lhs, items) => {
            let left = resolve(lhs, record)?;
            for item in items {
                let candidate = resolve(item, record)?;
                if compare(&left, &candidate)? == Ordering::Equal {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        Expr::And(lhs, rhs) => Ok(evaluate(lhs, record)? && evaluate(rhs, record)?),
        Expr::Or(lhs, rhs) => Ok(evaluate(lhs, record)? || evaluate(rhs, record)?),
        Expr::Not(inner) => Ok(!evaluate(inner, record)?),
        Expr::StringMethodCall(method, receiver, arg) => {
            let haystack = resolve(receiver, record)?;
            let needle = resolve(arg, record)?;
            let (haystack, needle) = match (haystack, needle) {
                (RecordValue::String(h), RecordValue::String(n)) => (h, n),
                _ => {
                    return Err(AppError::Internal(
                        "string method applied to non-string operand".into(),
                    ))
                }
            };
            Ok(match method {
                StringMethod::StartsWith => haystack.starts_with(&needle),
                StringMethod::EndsWith => haystack.ends_with(&needle),
                StringMethod::Contains => haystack.contains(&needle),
            })
        }
        Expr::Literal(_) | Expr::Identifier(_) => Err(AppError::Internal(
            "bare literal/identifier is not boolean-shaped".into(),
        )),
    }
}

fn resolve(expr: &Expr, record: &RecordValue) -> Result<RecordValue, AppError> {
    match expr {
        Expr::Literal(Literal::String(s)) => Ok(RecordValue::String(s.clone())),
        Expr::Literal(Literal::Int(i)) => Ok(RecordValue::Int(*i)),
        Expr::Literal(Literal::Double(d)) => Ok(RecordValue::Double(*d)),
        Expr::Literal(Literal::Bool(b)) => Ok(RecordValue::Bool(*b)),
        Expr::Literal(Literal::Timestamp(t)) => Ok(RecordValue::Timestamp(*t)),
        Expr::Identifier(path) => Ok(record
            .get_path(&path.join("."))
            .cloned()
            .unwrap_or(RecordValue::Null)),
        other => Err(AppError::Internal(format!(
            "unexpected operand shape in evaluator: {other:?}"
        ))),
    }
}

fn compare(left: &RecordValue, right: &RecordValue) -> Result<Ordering, AppError> {
    match (left, right) {
        (RecordValue::String(a), RecordValue::String(b)) => Ok(a.cmp(b)),
        (RecordValue::Int(a), RecordValue::Int(b)) => Ok(a.cmp(b)),
        (RecordValue::Double(a), RecordValue::Double(b)) => {
            a.partial_cmp(b).ok_or_else(|| AppError::Internal("NaN comparison".into()))
        }
        (RecordValue::Int(a), RecordValue::Double(b)) => (*a as f64)
            .partial_cmp(b)
            .ok_or_else(|| AppError::Internal("NaN comparison".into())),
        (RecordValue::Double(a), RecordValue::Int(b)) => a
            .partial_cmp(&(*b as f64))
            .ok_or_else(|| AppError::Internal("NaN comparison".into())),
        (RecordValue::Bool(a), RecordValue::Bool(b)) => Ok(a.cmp(b)),
        (RecordValue::Timestamp(a), RecordValue::Timestamp(b)) => Ok(a.cmp(b)),
        (RecordValue::Null, RecordValue::Null) => Ok(Ordering::Equal),
        _ => Ok(Ordering::Less), // mismatched/missing types never compare equal
    }
}

#[cfg(test)]
mod tests {
    use super::super::parser::parse;
    use super::*;
    use telemetry_models::value::MapBuilder;

    fn sample_record() -> RecordValue {
        let object_ref = MapBuilder::new()
            .field("namespace", RecordValue::String("production".into()))
            .field("name", RecordValue::String("db".into()))
            .build();
        MapBuilder::new()
            .field("verb", RecordValue::String("delete".into()))
            .field("objectRef", object_ref)
            .build()
    }

    #[test]
    fn evaluates_equality() {
        let expr = parse("verb == 'delete'").unwrap();
        assert!(evaluate(&expr, &sample_record()).unwrap());
    }

    #[test]
    fn evaluates_nested_and() {
        let expr = parse("verb == 'delete' && objectRef.namespace == 'production'").unwrap();
        assert!(evaluate(&expr, &sample_record()).unwrap());
    }

    #[test]
    fn evaluates_string_method() {
        let expr = parse("objectRef.name.startsWith('d')").unwrap();
        assert!(evaluate(&expr, &sample_record()).unwrap());
    }

    #[test]
    fn missing_field_does_not_match() {
        let expr = parse("objectRef.uid == 'x'").unwrap();
        assert!(!evaluate(&expr, &sample_record()).unwrap());
    }
}
