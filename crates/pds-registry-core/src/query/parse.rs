//! Parser for the `q` query language.
//!
//! ```text
//! expression := and_expr ( "or" and_expr )*
//! and_expr   := unary ( "and" unary )*
//! unary      := "not" unary | "(" expression ")" | comparison
//! comparison := FIELD ("eq"|"ne"|"gt"|"ge"|"lt"|"le"|"like") VALUE
//!             | FIELD "exists"
//! VALUE      := "double quoted" | bare-token
//! ```
//!
//! Operators are case-insensitive. Field names use API notation (`a.b`) and
//! are converted to index notation.

use crate::error::{RegistryError, Result};
use crate::fields::json_to_index;

use super::{BoolClause, Clause, RangeOp};

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    LParen,
    RParen,
    Word(String),
    Quoted(String),
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    pos: usize,
}

/// Parse a free-text query. Blank input yields `None`.
pub fn parse_query(query: &str) -> Result<Option<Clause>> {
    if query.trim().is_empty() {
        return Ok(None);
    }
    let tokens = tokenize(query)?;
    let mut parser = Parser {
        query,
        tokens,
        cursor: 0,
    };
    let clause = parser.expression()?;
    if let Some(token) = parser.peek() {
        return Err(parser.error_at(token.pos, "unexpected trailing input"));
    }
    Ok(Some(clause))
}

fn malformed(query: &str, position: usize, message: impl Into<String>) -> RegistryError {
    RegistryError::MalformedQuery {
        query: query.to_string(),
        position,
        message: message.into(),
    }
}

fn tokenize(query: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = query.char_indices().peekable();

    while let Some(&(pos, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c == '(' {
            chars.next();
            tokens.push(Token {
                kind: TokenKind::LParen,
                pos,
            });
        } else if c == ')' {
            chars.next();
            tokens.push(Token {
                kind: TokenKind::RParen,
                pos,
            });
        } else if c == '"' {
            chars.next();
            let mut text = String::new();
            let mut closed = false;
            while let Some((_, c)) = chars.next() {
                match c {
                    '"' => {
                        closed = true;
                        break;
                    }
                    '\\' => match chars.next() {
                        Some((_, escaped)) => text.push(escaped),
                        None => break,
                    },
                    other => text.push(other),
                }
            }
            if !closed {
                return Err(malformed(query, pos, "unterminated string literal"));
            }
            tokens.push(Token {
                kind: TokenKind::Quoted(text),
                pos,
            });
        } else {
            let mut word = String::new();
            while let Some(&(_, c)) = chars.peek() {
                if c.is_whitespace() || c == '(' || c == ')' || c == '"' {
                    break;
                }
                word.push(c);
                chars.next();
            }
            tokens.push(Token {
                kind: TokenKind::Word(word),
                pos,
            });
        }
    }

    Ok(tokens)
}

struct Parser<'q> {
    query: &'q str,
    tokens: Vec<Token>,
    cursor: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.cursor)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.cursor).cloned();
        if token.is_some() {
            self.cursor += 1;
        }
        token
    }

    fn error_at(&self, position: usize, message: impl Into<String>) -> RegistryError {
        malformed(self.query, position, message)
    }

    fn end_error(&self, message: impl Into<String>) -> RegistryError {
        self.error_at(self.query.len(), message)
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        matches!(
            self.peek(),
            Some(Token { kind: TokenKind::Word(w), .. }) if w.eq_ignore_ascii_case(keyword)
        )
    }

    fn expression(&mut self) -> Result<Clause> {
        let mut operands = vec![self.and_expr()?];
        while self.peek_keyword("or") {
            self.next();
            operands.push(self.and_expr()?);
        }
        if operands.len() == 1 {
            return Ok(operands.remove(0));
        }
        Ok(Clause::Bool(BoolClause {
            should: operands,
            minimum_should_match: 1,
            ..Default::default()
        }))
    }

    fn and_expr(&mut self) -> Result<Clause> {
        let mut operands = vec![self.unary()?];
        while self.peek_keyword("and") {
            self.next();
            operands.push(self.unary()?);
        }
        if operands.len() == 1 {
            return Ok(operands.remove(0));
        }
        Ok(Clause::Bool(BoolClause {
            must: operands,
            ..Default::default()
        }))
    }

    fn unary(&mut self) -> Result<Clause> {
        if self.peek_keyword("not") {
            self.next();
            let inner = self.unary()?;
            return Ok(Clause::Bool(BoolClause {
                must_not: vec![inner],
                ..Default::default()
            }));
        }

        match self.peek().map(|t| (t.kind.clone(), t.pos)) {
            Some((TokenKind::LParen, open)) => {
                self.next();
                let inner = self.expression()?;
                match self.next() {
                    Some(Token {
                        kind: TokenKind::RParen,
                        ..
                    }) => Ok(inner),
                    Some(token) => Err(self.error_at(token.pos, "expected ')'")),
                    None => Err(self.error_at(open, "unbalanced '('")),
                }
            }
            Some(_) => self.comparison(),
            None => Err(self.end_error("expected a comparison")),
        }
    }

    fn comparison(&mut self) -> Result<Clause> {
        let field = match self.next() {
            Some(Token {
                kind: TokenKind::Word(word),
                ..
            }) => json_to_index(&word),
            Some(token) => return Err(self.error_at(token.pos, "expected a field name")),
            None => return Err(self.end_error("expected a field name")),
        };

        let (op, op_pos) = match self.next() {
            Some(Token {
                kind: TokenKind::Word(word),
                pos,
            }) => (word.to_ascii_lowercase(), pos),
            Some(token) => return Err(self.error_at(token.pos, "expected an operator")),
            None => return Err(self.end_error("expected an operator")),
        };

        let clause = match op.as_str() {
            "exists" => Clause::Exists { field },
            "eq" => Clause::Terms {
                field,
                values: vec![self.value()?],
            },
            "ne" => Clause::Bool(BoolClause {
                must_not: vec![Clause::Terms {
                    field,
                    values: vec![self.value()?],
                }],
                ..Default::default()
            }),
            "like" => Clause::Wildcard {
                field,
                pattern: self.value()?,
            },
            "gt" | "ge" | "lt" | "le" => {
                let op = match op.as_str() {
                    "gt" => RangeOp::Gt,
                    "ge" => RangeOp::Ge,
                    "lt" => RangeOp::Lt,
                    _ => RangeOp::Le,
                };
                Clause::Range {
                    field,
                    op,
                    value: self.value()?,
                }
            }
            other => {
                return Err(self.error_at(op_pos, format!("unknown operator '{}'", other)));
            }
        };
        Ok(clause)
    }

    fn value(&mut self) -> Result<String> {
        match self.next() {
            Some(Token {
                kind: TokenKind::Quoted(text) | TokenKind::Word(text),
                ..
            }) => Ok(text),
            Some(token) => Err(self.error_at(token.pos, "expected a value")),
            None => Err(self.end_error("expected a value")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position_of(err: RegistryError) -> usize {
        match err {
            RegistryError::MalformedQuery { position, .. } => position,
            other => panic!("expected MalformedQuery, got {:?}", other),
        }
    }

    #[test]
    fn test_blank_is_none() {
        assert_eq!(parse_query("  ").unwrap(), None);
    }

    #[test]
    fn test_simple_eq_converts_field_notation() {
        let clause = parse_query(r#"pds:Identification_Area.pds:title eq "Mars Rover""#)
            .unwrap()
            .unwrap();
        assert_eq!(
            clause,
            Clause::Terms {
                field: "pds:Identification_Area/pds:title".into(),
                values: vec!["Mars Rover".into()],
            }
        );
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let clause = parse_query("a eq 1 or b eq 2 and c eq 3").unwrap().unwrap();
        match clause {
            Clause::Bool(b) => {
                assert_eq!(b.should.len(), 2);
                assert_eq!(b.minimum_should_match, 1);
                assert!(matches!(&b.should[1], Clause::Bool(inner) if inner.must.len() == 2));
            }
            other => panic!("expected bool, got {:?}", other),
        }
    }

    #[test]
    fn test_not_parens_and_operators() {
        let clause = parse_query("NOT (a LIKE \"mars*\" or b exists) and c ge 2020-01-01")
            .unwrap()
            .unwrap();
        match clause {
            Clause::Bool(b) => {
                assert_eq!(b.must.len(), 2);
                assert!(matches!(&b.must[0], Clause::Bool(n) if n.must_not.len() == 1));
                assert_eq!(
                    b.must[1],
                    Clause::Range {
                        field: "c".into(),
                        op: RangeOp::Ge,
                        value: "2020-01-01".into()
                    }
                );
            }
            other => panic!("expected bool, got {:?}", other),
        }
    }

    #[test]
    fn test_escaped_quote_in_value() {
        let clause = parse_query(r#"title eq "say \"hi\"""#).unwrap().unwrap();
        assert_eq!(
            clause,
            Clause::Terms {
                field: "title".into(),
                values: vec![r#"say "hi""#.into()],
            }
        );
    }

    #[test]
    fn test_errors_carry_position() {
        assert_eq!(position_of(parse_query("(a eq 1").unwrap_err()), 0);
        assert_eq!(position_of(parse_query("a is 1").unwrap_err()), 2);
        assert_eq!(position_of(parse_query("a eq 1 b").unwrap_err()), 7);
        assert_eq!(position_of(parse_query("a eq").unwrap_err()), 4);
        assert_eq!(position_of(parse_query("a eq \"open").unwrap_err()), 5);
        assert_eq!(position_of(parse_query("a eq 1)").unwrap_err()), 6);
    }
}
