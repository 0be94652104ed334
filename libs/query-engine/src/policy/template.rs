//! Summary template compiler/evaluator (spec §4.3). A template is literal
//! text interleaved with `{{ expression }}` segments; each embedded
//! expression is compiled individually and its rendered output is
//! substituted. The `link(displayText, resourceRef)` function returns its
//! display text and records a `(marker, resourceMap)` pair in a
//! per-evaluation collector — `link` may appear inside a ternary and is
//! captured iff its branch is actually evaluated.

use crate::filter::ast::Expr as FilterExpr;
use crate::filter::eval::evaluate as evaluate_filter;
use crate::filter::lexer::{Lexer, Token};
use crate::filter::parser::parse_tokens;
use telemetry_common::error::AppError;
use telemetry_models::activity::Link;
use telemetry_models::value::RecordValue;

#[derive(Debug, Clone)]
enum TplExpr {
    Str(String),
    Path(Vec<String>),
    Concat(Box<TplExpr>, Box<TplExpr>),
    Link(Box<TplExpr>, Box<TplExpr>),
    Ternary(FilterExpr, Box<TplExpr>, Box<TplExpr>),
}

#[derive(Debug, Clone)]
enum Segment {
    Text(String),
    Expr(TplExpr),
}

/// A compiled summary template, ready to render against any record.
#[derive(Debug, Clone)]
pub struct CompiledTemplate {
    segments: Vec<Segment>,
}

impl CompiledTemplate {
    pub fn compile(source: &str) -> Result<Self, AppError> {
        let mut segments = Vec::new();
        let mut rest = source;
        loop {
            match rest.find("{{") {
                None => {
                    if !rest.is_empty() {
                        segments.push(Segment::Text(rest.to_string()));
                    }
                    break;
                }
                Some(start) => {
                    if start > 0 {
                        segments.push(Segment::Text(rest[..start].to_string()));
                    }
                    let after_open = &rest[start + 2..];
                    let end = after_open.find("}}").ok_or_else(|| {
                        AppError::InvalidArgument(
                            "summary template has an unterminated '{{' expression".into(),
                        )
                    })?;
                    let expr_src = after_open[..end].trim();
                    segments.push(Segment::Expr(parse_tpl_expr(expr_src)?));
                    rest = &after_open[end + 2..];
                }
            }
        }
        Ok(Self { segments })
    }

    /// Render the template against `record`, returning the rendered text
    /// plus every `(marker, resourceMap)` captured along evaluated branches.
    pub fn render(&self, record: &RecordValue) -> Result<(String, Vec<Link>), AppError> {
        let mut out = String::new();
        let mut links = Vec::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(t) => out.push_str(t),
                Segment::Expr(e) => out.push_str(&eval_tpl(e, record, &mut links)?),
            }
        }
        Ok((out, links))
    }
}

fn parse_tpl_expr(src: &str) -> Result<TplExpr, AppError> {
    let tokens = Lexer::new(src)
        .tokenize()
        .map_err(|e| AppError::InvalidArgument(format!("invalid template expression: {e}")))?;
    // tokens always end with Eof; drop it while scanning for the ternary split.
    let body = &tokens[..tokens.len() - 1];

    if let Some((qpos, cpos)) = find_ternary_split(body) {
        let mut cond_tokens = body[..qpos].to_vec();
        cond_tokens.push(Token::Eof);
        let cond = parse_tokens(cond_tokens)
            .map_err(|e| AppError::InvalidArgument(format!("invalid ternary condition: {e}")))?;

        let true_branch = parse_concat(&body[qpos + 1..cpos])?;
        let false_branch = parse_concat(&body[cpos + 1..])?;
        return Ok(TplExpr::Ternary(cond, Box::new(true_branch), Box::new(false_branch)));
    }

    parse_concat(body)
}

/// Find the first top-level (depth-0) `?` and its matching `:`.
fn find_ternary_split(tokens: &[Token]) -> Option<(usize, usize)> {
    let mut depth = 0i32;
    let mut qpos = None;
    for (i, tok) in tokens.iter().enumerate() {
        match tok {
            Token::LParen => depth += 1,
            Token::RParen => depth -= 1,
            Token::Question if depth == 0 && qpos.is_none() => qpos = Some(i),
            Token::Colon if depth == 0 && qpos.is_some() => return Some((qpos.unwrap(), i)),
            _ => {}
        }
    }
    None
}

fn parse_concat(tokens: &[Token]) -> Result<TplExpr, AppError> {
    let mut parser = ConcatParser { tokens, pos: 0 };
    let expr = parser.parse_concat()?;
    if parser.pos != parser.tokens.len() {
        return Err(AppError::InvalidArgument(
            "unexpected trailing tokens in template expression".into(),
        ));
    }
    Ok(expr)
}

struct ConcatParser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> ConcatParser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&Token> {
        let tok = self.tokens.get(self.pos);
        self.pos += 1;
        tok
    }

    fn parse_concat(&mut self) -> Result<TplExpr, AppError> {
        let mut left = self.parse_atom()?;
        while matches!(self.peek(), Some(Token::Plus)) {
            self.advance();
            let right = self.parse_atom()?;
            left = TplExpr::Concat(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_atom(&mut self) -> Result<TplExpr, AppError> {
        match self.advance().cloned() {
            Some(Token::Str(s)) => Ok(TplExpr::Str(s)),
            Some(Token::Ident(name)) if name == "link" && matches!(self.peek(), Some(Token::LParen)) => {
                self.advance();
                let display = self.parse_concat()?;
                match self.advance() {
                    Some(Token::Comma) => {}
                    other => {
                        return Err(AppError::InvalidArgument(format!(
                            "link() expects two arguments, found {other:?}"
                        )))
                    }
                }
                let resource = self.parse_concat()?;
                match self.advance() {
                    Some(Token::RParen) => {}
                    other => {
                        return Err(AppError::InvalidArgument(format!(
                            "expected ')' closing link(), found {other:?}"
                        )))
                    }
                }
                Ok(TplExpr::Link(Box::new(display), Box::new(resource)))
            }
            Some(Token::Ident(name)) => {
                let mut path = vec![name];
                while matches!(self.peek(), Some(Token::Dot)) {
                    self.advance();
                    match self.advance().cloned() {
                        Some(Token::Ident(s)) => path.push(s),
                        other => {
                            return Err(AppError::InvalidArgument(format!(
                                "expected identifier after '.', found {other:?}"
                            )))
                        }
                    }
                }
                Ok(TplExpr::Path(path))
            }
            other => Err(AppError::InvalidArgument(format!(
                "unexpected token in template expression: {other:?}"
            ))),
        }
    }
}

fn eval_tpl(expr: &TplExpr, record: &RecordValue, links: &mut Vec<Link>) -> Result<String, AppError> {
    match expr {
        TplExpr::Str(s) => Ok(s.clone()),
        TplExpr::Path(path) => Ok(resolve(path, record).render()),
        TplExpr::Concat(a, b) => {
            let mut s = eval_tpl(a, record, links)?;
            s.push_str(&eval_tpl(b, record, links)?);
            Ok(s)
        }
        TplExpr::Link(display, resource_ref) => {
            let text = eval_tpl(display, record, links)?;
            let resource_value = resolve_tpl_value(resource_ref, record);
            links.push(Link {
                marker: text.clone(),
                resource: serde_json::Value::from(&resource_value),
            });
            Ok(text)
        }
        TplExpr::Ternary(cond, then_branch, else_branch) => {
            if evaluate_filter(cond, record)? {
                eval_tpl(then_branch, record, links)
            } else {
                eval_tpl(else_branch, record, links)
            }
        }
    }
}

fn resolve(path: &[String], record: &RecordValue) -> RecordValue {
    record
        .get_path(&path.join("."))
        .cloned()
        .unwrap_or(RecordValue::Null)
}

/// Resolve a template sub-expression to a `RecordValue` for use as a
/// `link()` resource reference: identifier paths resolve against the
/// record, anything else renders to a string.
fn resolve_tpl_value(expr: &TplExpr, record: &RecordValue) -> RecordValue {
    match expr {
        TplExpr::Path(path) => resolve(path, record),
        TplExpr::Str(s) => RecordValue::String(s.clone()),
        _ => {
            let mut scratch = Vec::new();
            RecordValue::String(eval_tpl(expr, record, &mut scratch).unwrap_or_default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use telemetry_models::value::MapBuilder;

    fn sample_record() -> RecordValue {
        let object_ref = MapBuilder::new()
            .field("name", RecordValue::String("api-gw".into()))
            .build();
        MapBuilder::new()
            .field("actor", RecordValue::String("bob".into()))
            .field("objectRef", object_ref)
            .field("responseObject", RecordValue::String("payload".into()))
            .build()
    }

    #[test]
    fn renders_literal_and_path_segments() {
        let record = sample_record();
        let tpl = CompiledTemplate::compile("Hi {{ actor }}!").unwrap();
        let (rendered, links) = tpl.render(&record).unwrap();
        assert_eq!(rendered, "Hi bob!");
        assert!(links.is_empty());
    }

    #[test]
    fn link_captures_marker_and_resource() {
        let record = sample_record();
        let tpl = CompiledTemplate::compile(
            "{{ actor }} created {{ link('HTTPProxy ' + objectRef.name, responseObject) }}",
        )
        .unwrap();
        let (rendered, links) = tpl.render(&record).unwrap();
        assert_eq!(rendered, "bob created HTTPProxy api-gw");
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].marker, "HTTPProxy api-gw");
    }

    #[test]
    fn link_inside_untaken_ternary_branch_is_not_captured() {
        let mut record_map = match sample_record() {
            RecordValue::Map(m) => m,
            _ => unreachable!(),
        };
        record_map.insert("isCreate".into(), RecordValue::Bool(false));
        let record = RecordValue::Map(record_map);

        let tpl = CompiledTemplate::compile(
            "{{ isCreate == true ? link('yes', objectRef.name) : 'no link' }}",
        )
        .unwrap();
        let (rendered, links) = tpl.render(&record).unwrap();
        assert_eq!(rendered, "no link");
        assert!(links.is_empty());
    }
}
