use super::ast::{CompareOp, Expr, Literal, StringMethod};
use super::lexer::{Lexer, Token};
use chrono::{DateTime, Utc};

pub fn parse(src: &str) -> Result<Expr, String> {
    let tokens = Lexer::new(src).tokenize()?;
    parse_tokens(tokens)
}

/// Parse an already-tokenized expression, requiring the whole token
/// stream to be consumed. Exposed so the policy-template parser (which
/// shares this grammar for `{{ cond ? a : b }}` conditions) can reuse the
/// boolean-expression front-end without re-lexing.
pub fn parse_tokens(tokens: Vec<Token>) -> Result<Expr, String> {
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_or()?;
    parser.expect(Token::Eof)?;
    Ok(expr)
}

pub(crate) struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, expected: Token) -> Result<(), String> {
        if *self.peek() == expected {
            self.advance();
            Ok(())
        } else {
            Err(format!("expected {expected:?}, found {:?}", self.peek()))
        }
    }

    fn parse_or(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_and()?;
        while *self.peek() == Token::OrOr {
            self.advance();
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_unary()?;
        while *self.peek() == Token::AndAnd {
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, String> {
        if *self.peek() == Token::Bang {
            self.advance();
            let inner = self.parse_unary()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, String> {
        let left = self.parse_operand()?;
        let op = match self.peek() {
            Token::EqEq => CompareOp::Eq,
            Token::NotEq => CompareOp::Ne,
            Token::Lt => CompareOp::Lt,
            Token::Le => CompareOp::Le,
            Token::Gt => CompareOp::Gt,
            Token::Ge => CompareOp::Ge,
            Token::In => {
                self.advance();
                self.expect(Token::LBracket)?;
                let mut items = Vec::new();
                if *self.peek() != Token::RBracket {
                    loop {
                        items.push(self.parse_operand()?);
                        if *self.peek() == Token::Comma {
                            self.advance();
                        } else {
                            break;
                        }
                    }
                }
                self.expect(Token::RBracket)?;
                return Ok(Expr::In(Box::new(left), items));
            }
            _ => return Ok(left),
        };
        self.advance();
        let right = self.parse_operand()?;
        Ok(Expr::Compare(op, Box::new(left), Box::new(right)))
    }

    fn parse_operand(&mut self) -> Result<Expr, String> {
        match self.peek().clone() {
            Token::LParen => {
                self.advance();
                let inner = self.parse_or()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Token::True => {
                self.advance();
                Ok(Expr::Literal(Literal::Bool(true)))
            }
            Token::False => {
                self.advance();
                Ok(Expr::Literal(Literal::Bool(false)))
            }
            Token::Str(s) => {
                self.advance();
                Ok(Expr::Literal(Literal::String(s)))
            }
            Token::Int(i) => {
                self.advance();
                Ok(Expr::Literal(Literal::Int(i)))
            }
            Token::Float(f) => {
                self.advance();
                Ok(Expr::Literal(Literal::Double(f)))
            }
            Token::Ident(name) => self.parse_identifier_chain(name),
            other => Err(format!("unexpected token {other:?}")),
        }
    }

    fn parse_identifier_chain(&mut self, first: String) -> Result<Expr, String> {
        self.advance();

        if first == "timestamp" && *self.peek() == Token::LParen {
            self.advance();
            let arg = match self.advance() {
                Token::Str(s) => s,
                other => return Err(format!("timestamp() expects a string literal, found {other:?}")),
            };
            self.expect(Token::RParen)?;
            let parsed: DateTime<Utc> = DateTime::parse_from_rfc3339(&arg)
                .map_err(|_| format!("invalid RFC3339 timestamp literal {arg:?}"))?
                .with_timezone(&Utc);
            return Ok(Expr::Literal(Literal::Timestamp(parsed)));
        }

        let mut path = vec![first];
        loop {
            if *self.peek() != Token::Dot {
                break;
            }
            self.advance();
            let segment = match self.advance() {
                Token::Ident(s) => s,
                other => return Err(format!("expected identifier after '.', found {other:?}")),
            };

            if *self.peek() == Token::LParen {
                self.advance();
                let arg = self.parse_operand()?;
                self.expect(Token::RParen)?;
                let method = match segment.as_str() {
                    "startsWith" => StringMethod::StartsWith,
                    "endsWith" => StringMethod::EndsWith,
                    "contains" => StringMethod::Contains,
                    other => return Err(format!("unknown string method {other:?}")),
                };
                return Ok(Expr::StringMethodCall(
                    method,
                    Box::new(Expr::Identifier(path)),
                    Box::new(arg),
                ));
            }

            path.push(segment);
        }
        Ok(Expr::Identifier(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_comparison() {
        let expr = parse("verb == 'delete'").unwrap();
        assert_eq!(
            expr,
            Expr::Compare(
                CompareOp::Eq,
                Box::new(Expr::Identifier(vec!["verb".into()])),
                Box::new(Expr::Literal(Literal::String("delete".into()))),
            )
        );
    }

    #[test]
    fn parses_and_with_nested_field() {
        let expr = parse("verb == 'delete' && objectRef.namespace == 'production'").unwrap();
        assert!(matches!(expr, Expr::And(_, _)));
    }

    #[test]
    fn parses_in_list() {
        let expr = parse("verb in ['get', 'list']").unwrap();
        assert!(matches!(expr, Expr::In(_, items) if items.len() == 2));
    }

    #[test]
    fn parses_string_method() {
        let expr = parse("objectRef.name.startsWith('db')").unwrap();
        assert!(matches!(expr, Expr::StringMethodCall(StringMethod::StartsWith, _, _)));
    }

    #[test]
    fn parses_timestamp_literal() {
        let expr = parse("requestReceivedTimestamp >= timestamp('2024-01-01T00:00:00Z')").unwrap();
        assert!(matches!(expr, Expr::Compare(CompareOp::Ge, _, _)));
    }

    #[test]
    fn parses_negation_and_parens() {
        let expr = parse("!(verb == 'get')").unwrap();
        assert!(matches!(expr, Expr::Not(_)));
    }

    #[test]
    fn empty_expression_fails() {
        assert!(parse("").is_err());
    }

    #[test]
    fn trailing_garbage_fails() {
        assert!(parse("verb == 'get' extra").is_err());
    }
}
