use super::ast::{CompareOp, Expr, Literal, StringMethod};
use super::schema::{allow_list_for, RecordType};
use chrono::{DateTime, Utc};

/// A literal lowered to a bound parameter. No literal text is ever
/// interpolated into the SQL fragment (spec §4.2).
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    String(String),
    Int(i64),
    Double(f64),
    Bool(bool),
    Timestamp(DateTime<Utc>),
}

pub struct LoweredFilter {
    /// WHERE fragment using positional `$N` placeholders, `N` starting
    /// after whatever the caller has already bound.
    pub fragment: String,
    pub params: Vec<SqlParam>,
}

/// Stage 3 (spec §4.2): recursive walk emitting a parameterised WHERE
/// fragment. `param_offset` lets the caller reserve earlier `$1..$offset`
/// placeholders for scope/time/cursor predicates composed alongside this one.
pub fn lower_to_sql(expr: &Expr, record_type: RecordType, param_offset: usize) -> LoweredFilter {
    let allow_list = allow_list_for(record_type);
    let mut ctx = LowerCtx {
        allow_list,
        next_param: param_offset + 1,
        params: Vec::new(),
    };
    let fragment = ctx.lower(expr);
    LoweredFilter {
        fragment,
        params: ctx.params,
    }
}

struct LowerCtx<'a> {
    allow_list: &'a super::schema::AllowList,
    next_param: usize,
    params: Vec<SqlParam>,
}

impl<'a> LowerCtx<'a> {
    fn column(&self, expr: &Expr) -> String {
        let path = expr.identifier_path().expect("identifier operand");
        self.allow_list
            .get(path.as_str())
            .map(|c| c.name.to_string())
            .unwrap_or(path)
    }

    fn bind(&mut self, literal: &Literal) -> String {
        let placeholder = format!("${}", self.next_param);
        self.next_param += 1;
        self.params.push(match literal {
            Literal::String(s) => SqlParam::String(s.clone()),
            Literal::Int(i) => SqlParam::Int(*i),
            Literal::Double(d) => SqlParam::Double(*d),
            Literal::Bool(b) => SqlParam::Bool(*b),
            Literal::Timestamp(t) => SqlParam::Timestamp(*t),
        });
        placeholder
    }

    fn lower(&mut self, expr: &Expr) -> String {
        match expr {
            Expr::Compare(op, lhs, rhs) => {
                let col = self.column(lhs);
                let literal = match &**rhs {
                    Expr::Literal(l) => l,
                    _ => panic!("comparison rhs must be a literal after validation"),
                };
                let placeholder = self.bind(literal);
                let sql_op = match op {
                    CompareOp::Eq => "=",
                    CompareOp::Ne => "!=",
                    CompareOp::Lt => "<",
                    CompareOp::Le => "<=",
                    CompareOp::Gt => ">",
                    CompareOp::Ge => ">=",
                };
                format!("{col} {sql_op} {placeholder}")
            }
            Expr::In(lhs, items) => {
                let col = self.column(lhs);
                let placeholders: Vec<String> = items
                    .iter()
                    .map(|item| match item {
                        Expr::Literal(l) => self.bind(l),
                        _ => panic!("`in` list entries must be literals after validation"),
                    })
                    .collect();
                format!("{col} IN ({})", placeholders.join(", "))
            }
            Expr::And(lhs, rhs) => {
                format!("({} AND {})", self.lower(lhs), self.lower(rhs))
            }
            Expr::Or(lhs, rhs) => {
                format!("({} OR {})", self.lower(lhs), self.lower(rhs))
            }
            Expr::Not(inner) => format!("NOT ({})", self.lower(inner)),
            Expr::StringMethodCall(method, receiver, arg) => {
                let col = self.column(receiver);
                let literal = match &**arg {
                    Expr::Literal(l) => l,
                    _ => panic!("string method argument must be a literal after validation"),
                };
                let placeholder = self.bind(literal);
                match method {
                    // `LIKE`-based prefix/suffix checks would let `%`/`_` in
                    // the bound value act as SQL wildcards instead of
                    // literal characters; use non-wildcard constructs
                    // instead, matching `Contains`'s `position(...)` approach.
                    StringMethod::StartsWith => format!("starts_with({col}, {placeholder})"),
                    StringMethod::EndsWith => {
                        format!("right({col}, length({placeholder})) = {placeholder}")
                    }
                    StringMethod::Contains => format!("position({placeholder} in {col}) > 0"),
                }
            }
            Expr::Literal(_) | Expr::Identifier(_) => {
                panic!("bare literal/identifier is not boolean-shaped; rejected at validation")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::parser::parse;
    use super::*;

    #[test]
    fn literal_becomes_bound_parameter_not_inline_text() {
        let expr = parse("verb == 'delete'").unwrap();
        let lowered = lower_to_sql(&expr, RecordType::Audit, 0);
        assert!(!lowered.fragment.contains("delete"));
        assert_eq!(lowered.params, vec![SqlParam::String("delete".into())]);
        assert_eq!(lowered.fragment, "verb = $1");
    }

    #[test]
    fn and_expression_parenthesised() {
        let expr = parse("verb == 'delete' && objectRef.namespace == 'production'").unwrap();
        let lowered = lower_to_sql(&expr, RecordType::Audit, 0);
        assert_eq!(lowered.fragment, "(verb = $1 AND object_namespace = $2)");
        assert_eq!(lowered.params.len(), 2);
    }

    #[test]
    fn param_offset_continues_numbering() {
        let expr = parse("verb == 'delete'").unwrap();
        let lowered = lower_to_sql(&expr, RecordType::Audit, 2);
        assert_eq!(lowered.fragment, "verb = $3");
    }

    #[test]
    fn in_list_lowers_to_in_clause() {
        let expr = parse("verb in ['get', 'list']").unwrap();
        let lowered = lower_to_sql(&expr, RecordType::Audit, 0);
        assert_eq!(lowered.fragment, "verb IN ($1, $2)");
    }

    #[test]
    fn starts_with_lowers_to_starts_with_call() {
        let expr = parse("verb.startsWith('del')").unwrap();
        let lowered = lower_to_sql(&expr, RecordType::Audit, 0);
        assert_eq!(lowered.fragment, "starts_with(verb, $1)");
        assert_eq!(lowered.params, vec![SqlParam::String("del".into())]);
    }

    #[test]
    fn ends_with_lowers_to_right_comparison() {
        let expr = parse("verb.endsWith('ete')").unwrap();
        let lowered = lower_to_sql(&expr, RecordType::Audit, 0);
        assert_eq!(lowered.fragment, "right(verb, length($1)) = $1");
        assert_eq!(lowered.params, vec![SqlParam::String("ete".into())]);
    }

    #[test]
    fn contains_lowers_to_position_call() {
        let expr = parse("verb.contains('le')").unwrap();
        let lowered = lower_to_sql(&expr, RecordType::Audit, 0);
        assert_eq!(lowered.fragment, "position($1 in verb) > 0");
    }

    /// A literal containing `%`/`_` must never be interpreted as a SQL
    /// wildcard: `starts_with`/`right(...) =` treat the bound value as
    /// an exact literal, unlike a `LIKE` pattern would.
    #[test]
    fn wildcard_characters_in_the_value_are_not_treated_as_sql_wildcards() {
        let expr = parse("verb.startsWith('100%_off')").unwrap();
        let lowered = lower_to_sql(&expr, RecordType::Audit, 0);
        assert!(!lowered.fragment.contains("LIKE"));
        assert_eq!(lowered.fragment, "starts_with(verb, $1)");
        assert_eq!(lowered.params, vec![SqlParam::String("100%_off".into())]);

        let expr = parse("verb.endsWith('100%_off')").unwrap();
        let lowered = lower_to_sql(&expr, RecordType::Audit, 0);
        assert!(!lowered.fragment.contains("LIKE"));
        assert_eq!(lowered.fragment, "right(verb, length($1)) = $1");
    }
}
