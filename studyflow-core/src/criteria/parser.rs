//! Recursive-descent parser for criteria expressions.
//!
//! The parser also performs all vocabulary and type checking, so a
//! successfully parsed expression can be evaluated without any possibility of
//! error.

use super::ast::{CompareOp, Expr, Scalar};
use super::lexer::{Token, TokenKind};
use super::vocabulary::{AttributeKind, Vocabulary};
use super::ExpressionError;

pub fn parse(tokens: &[Token], vocabulary: &Vocabulary) -> Result<Expr, ExpressionError> {
    let mut parser = Parser {
        tokens,
        pos: 0,
        vocabulary,
    };
    let expr = parser.or_expr()?;
    if let Some(token) = parser.peek() {
        return Err(ExpressionError::UnexpectedToken {
            offset: token.offset,
            found: token.kind.describe(),
            expected: "end of expression",
        });
    }
    Ok(expr)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    vocabulary: &'a Vocabulary,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    /// Offset to report when input ends unexpectedly.
    fn end_offset(&self) -> usize {
        self.tokens.last().map(|t| t.offset).unwrap_or(0)
    }

    fn unexpected_end(&self, expected: &'static str) -> ExpressionError {
        ExpressionError::UnexpectedToken {
            offset: self.end_offset(),
            found: "end of input".to_string(),
            expected,
        }
    }

    fn or_expr(&mut self) -> Result<Expr, ExpressionError> {
        let mut left = self.and_expr()?;
        while matches!(self.peek(), Some(t) if t.kind == TokenKind::Or) {
            self.advance();
            let right = self.and_expr()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expr, ExpressionError> {
        let mut left = self.unary_expr()?;
        while matches!(self.peek(), Some(t) if t.kind == TokenKind::And) {
            self.advance();
            let right = self.unary_expr()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn unary_expr(&mut self) -> Result<Expr, ExpressionError> {
        if matches!(self.peek(), Some(t) if t.kind == TokenKind::Not) {
            self.advance();
            let inner = self.unary_expr()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, ExpressionError> {
        let token = self
            .advance()
            .ok_or_else(|| self.unexpected_end("an expression"))?;

        match &token.kind {
            TokenKind::LParen => {
                let inner = self.or_expr()?;
                match self.advance() {
                    Some(t) if t.kind == TokenKind::RParen => Ok(inner),
                    Some(t) => Err(ExpressionError::UnexpectedToken {
                        offset: t.offset,
                        found: t.kind.describe(),
                        expected: "')'",
                    }),
                    None => Err(self.unexpected_end("')'")),
                }
            }
            TokenKind::True => Ok(Expr::Literal(true)),
            TokenKind::False => Ok(Expr::Literal(false)),
            TokenKind::Str(value) => self.contains(token.offset, value.clone()),
            TokenKind::Ident(name) => self.comparison(token.offset, name.clone()),
            other => Err(ExpressionError::UnexpectedToken {
                offset: token.offset,
                found: other.describe(),
                expected: "'(', 'not', a literal, or an attribute name",
            }),
        }
    }

    /// `"value" in attr` — the value was already consumed.
    fn contains(&mut self, str_offset: usize, value: String) -> Result<Expr, ExpressionError> {
        match self.advance() {
            Some(t) if t.kind == TokenKind::In => {}
            Some(t) => {
                return Err(ExpressionError::UnexpectedToken {
                    offset: t.offset,
                    found: t.kind.describe(),
                    expected: "'in'",
                })
            }
            None => return Err(self.unexpected_end("'in'")),
        }

        let (attr_offset, attr) = match self.advance() {
            Some(Token {
                kind: TokenKind::Ident(name),
                offset,
            }) => (*offset, name.clone()),
            Some(t) => {
                return Err(ExpressionError::UnexpectedToken {
                    offset: t.offset,
                    found: t.kind.describe(),
                    expected: "an attribute name",
                })
            }
            None => return Err(self.unexpected_end("an attribute name")),
        };

        match self.vocabulary.kind_of(&attr) {
            None => Err(ExpressionError::UnknownAttribute {
                offset: attr_offset,
                name: attr,
            }),
            Some(AttributeKind::TextList) => Ok(Expr::Contains { attr, value }),
            Some(kind) => Err(ExpressionError::TypeMismatch {
                offset: str_offset,
                attribute: attr,
                kind,
                message: "'\"value\" in attr' requires a text list attribute",
            }),
        }
    }

    /// `attr op literal` or `attr in (...)` — the attribute was already consumed.
    fn comparison(&mut self, attr_offset: usize, attr: String) -> Result<Expr, ExpressionError> {
        let kind = self
            .vocabulary
            .kind_of(&attr)
            .ok_or(ExpressionError::UnknownAttribute {
                offset: attr_offset,
                name: attr.clone(),
            })?;

        let op_token = self
            .advance()
            .ok_or_else(|| self.unexpected_end("a comparison operator or 'in'"))?;

        let op = match &op_token.kind {
            TokenKind::Eq => CompareOp::Eq,
            TokenKind::Ne => CompareOp::Ne,
            TokenKind::Lt => CompareOp::Lt,
            TokenKind::Le => CompareOp::Le,
            TokenKind::Gt => CompareOp::Gt,
            TokenKind::Ge => CompareOp::Ge,
            TokenKind::In => return self.one_of(attr_offset, attr, kind),
            other => {
                return Err(ExpressionError::UnexpectedToken {
                    offset: op_token.offset,
                    found: other.describe(),
                    expected: "a comparison operator or 'in'",
                })
            }
        };

        if kind == AttributeKind::TextList {
            return Err(ExpressionError::TypeMismatch {
                offset: op_token.offset,
                attribute: attr,
                kind,
                message: "list attributes only support the membership form",
            });
        }

        if op.is_ordering() && kind != AttributeKind::Int {
            return Err(ExpressionError::TypeMismatch {
                offset: op_token.offset,
                attribute: attr,
                kind,
                message: "ordering comparisons require an integer attribute",
            });
        }

        let (value_offset, value) = self.scalar()?;
        self.check_scalar_kind(&attr, kind, &value, value_offset)?;

        Ok(Expr::Compare { attr, op, value })
    }

    /// `attr in (v1, v2, ...)` — `attr` and `in` were already consumed.
    fn one_of(
        &mut self,
        attr_offset: usize,
        attr: String,
        kind: AttributeKind,
    ) -> Result<Expr, ExpressionError> {
        if kind == AttributeKind::TextList || kind == AttributeKind::Bool {
            return Err(ExpressionError::TypeMismatch {
                offset: attr_offset,
                attribute: attr,
                kind,
                message: "'attr in (...)' requires a text or integer attribute",
            });
        }

        match self.advance() {
            Some(t) if t.kind == TokenKind::LParen => {}
            Some(t) => {
                return Err(ExpressionError::UnexpectedToken {
                    offset: t.offset,
                    found: t.kind.describe(),
                    expected: "'('",
                })
            }
            None => return Err(self.unexpected_end("'('")),
        }

        let mut values = Vec::new();
        loop {
            let (value_offset, value) = self.scalar()?;
            self.check_scalar_kind(&attr, kind, &value, value_offset)?;
            values.push(value);

            match self.advance() {
                Some(t) if t.kind == TokenKind::Comma => continue,
                Some(t) if t.kind == TokenKind::RParen => break,
                Some(t) => {
                    return Err(ExpressionError::UnexpectedToken {
                        offset: t.offset,
                        found: t.kind.describe(),
                        expected: "',' or ')'",
                    })
                }
                None => return Err(self.unexpected_end("',' or ')'")),
            }
        }

        Ok(Expr::OneOf { attr, values })
    }

    fn scalar(&mut self) -> Result<(usize, Scalar), ExpressionError> {
        match self.advance() {
            Some(Token {
                kind: TokenKind::Str(s),
                offset,
            }) => Ok((*offset, Scalar::Text(s.clone()))),
            Some(Token {
                kind: TokenKind::Int(n),
                offset,
            }) => Ok((*offset, Scalar::Int(*n))),
            Some(Token {
                kind: TokenKind::True,
                offset,
            }) => Ok((*offset, Scalar::Bool(true))),
            Some(Token {
                kind: TokenKind::False,
                offset,
            }) => Ok((*offset, Scalar::Bool(false))),
            Some(t) => Err(ExpressionError::UnexpectedToken {
                offset: t.offset,
                found: t.kind.describe(),
                expected: "a literal",
            }),
            None => Err(self.unexpected_end("a literal")),
        }
    }

    fn check_scalar_kind(
        &self,
        attr: &str,
        kind: AttributeKind,
        value: &Scalar,
        offset: usize,
    ) -> Result<(), ExpressionError> {
        let compatible = matches!(
            (kind, value),
            (AttributeKind::Bool, Scalar::Bool(_))
                | (AttributeKind::Int, Scalar::Int(_))
                | (AttributeKind::Text, Scalar::Text(_))
        );
        if compatible {
            Ok(())
        } else {
            Err(ExpressionError::TypeMismatch {
                offset,
                attribute: attr.to_string(),
                kind,
                message: "literal does not match the attribute's declared kind",
            })
        }
    }
}
