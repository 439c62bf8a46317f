//! Restricted boolean expression language for enrollment criteria.
//!
//! Researchers author one expression per study; it is evaluated against real
//! participant data, so the language is deliberately tiny: no function calls,
//! no loops, no I/O, no host-language evaluation of any kind. An expression
//! is parsed once against a declared attribute vocabulary and can then be
//! evaluated any number of times.
//!
//! Grammar:
//!
//! ```text
//! expr       := or
//! or         := and ( "or" and )*
//! and        := unary ( "and" unary )*
//! unary      := "not" unary | primary
//! primary    := "(" expr ")" | "true" | "false" | comparison
//! comparison := attr op literal
//!             | string "in" attr                  -- list attribute contains
//!             | attr "in" "(" literal { "," literal } ")"
//! op         := "==" | "!=" | "<" | "<=" | ">" | ">="
//! literal    := string | integer | "true" | "false"
//! ```
//!
//! Unknown attribute names and operator/operand type mismatches are parse-time
//! errors carrying the byte offset of the offending token, never a silent
//! `false` at evaluation time.

mod ast;
mod eval;
mod lexer;
mod parser;
mod vocabulary;

pub use ast::{CompareOp, Expr, Scalar};
pub use vocabulary::{AttributeKind, Vocabulary};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A value a participant record holds for one attribute.
///
/// The untagged serde representation lets attribute maps be written as plain
/// JSON objects (`{"gender": "f", "languages_spoken": ["en", "es"]}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Int(i64),
    Text(String),
    List(Vec<String>),
}

/// Attribute name to value mapping for one participant.
pub type AttributeMap = BTreeMap<String, AttributeValue>;

/// A parsed, vocabulary-checked criteria expression.
///
/// The empty (or all-whitespace) expression is valid and always evaluates
/// true: a study with no criteria admits everyone by criteria.
#[derive(Debug, Clone, PartialEq)]
pub struct CriteriaExpression {
    source: String,
    root: Option<Expr>,
}

impl CriteriaExpression {
    /// Parse `source` against `vocabulary`.
    pub fn parse(source: &str, vocabulary: &Vocabulary) -> Result<Self, ExpressionError> {
        if source.trim().is_empty() {
            return Ok(Self {
                source: source.to_string(),
                root: None,
            });
        }
        let tokens = lexer::tokenize(source)?;
        let root = parser::parse(&tokens, vocabulary)?;
        Ok(Self {
            source: source.to_string(),
            root: Some(root),
        })
    }

    /// The original expression text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The parsed AST, if the expression is non-empty.
    pub fn root(&self) -> Option<&Expr> {
        self.root.as_ref()
    }

    /// Evaluate against one participant's attributes.
    ///
    /// Infallible: vocabulary membership and typing were proven at parse
    /// time, and an attribute missing from `attributes` makes the enclosing
    /// comparison false.
    pub fn evaluate(&self, attributes: &AttributeMap) -> bool {
        match &self.root {
            None => true,
            Some(expr) => eval::evaluate(expr, attributes),
        }
    }
}

/// Why an expression failed to parse.
///
/// Every variant carries the byte offset of the offending token so study
/// maintainers can locate the problem. Malformed expressions are a study
/// configuration bug: callers must surface them to maintainers, never report
/// them to participants as ineligibility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpressionError {
    /// A character outside the language's alphabet.
    UnexpectedCharacter { offset: usize, found: char },
    /// A string literal with no closing quote.
    UnterminatedString { offset: usize },
    /// Grammar violation.
    UnexpectedToken {
        offset: usize,
        found: String,
        expected: &'static str,
    },
    /// Attribute name not in the vocabulary.
    UnknownAttribute { offset: usize, name: String },
    /// Operator or literal incompatible with the attribute's declared kind.
    TypeMismatch {
        offset: usize,
        attribute: String,
        kind: AttributeKind,
        message: &'static str,
    },
}

impl ExpressionError {
    /// Byte offset into the expression source where the problem was found.
    pub fn offset(&self) -> usize {
        match self {
            Self::UnexpectedCharacter { offset, .. }
            | Self::UnterminatedString { offset }
            | Self::UnexpectedToken { offset, .. }
            | Self::UnknownAttribute { offset, .. }
            | Self::TypeMismatch { offset, .. } => *offset,
        }
    }
}

impl fmt::Display for ExpressionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedCharacter { offset, found } => {
                write!(f, "unexpected character {found:?} at offset {offset}")
            }
            Self::UnterminatedString { offset } => {
                write!(f, "unterminated string starting at offset {offset}")
            }
            Self::UnexpectedToken {
                offset,
                found,
                expected,
            } => {
                write!(f, "expected {expected} but found {found} at offset {offset}")
            }
            Self::UnknownAttribute { offset, name } => {
                write!(f, "unknown attribute {name:?} at offset {offset}")
            }
            Self::TypeMismatch {
                offset,
                attribute,
                kind,
                message,
            } => {
                write!(
                    f,
                    "attribute {attribute:?} ({kind}) at offset {offset}: {message}"
                )
            }
        }
    }
}

impl std::error::Error for ExpressionError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocab() -> Vocabulary {
        Vocabulary::standard()
    }

    fn attrs(json: &str) -> AttributeMap {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_empty_expression_is_always_true() {
        let expr = CriteriaExpression::parse("   ", &vocab()).unwrap();
        assert!(expr.root().is_none());
        assert!(expr.evaluate(&AttributeMap::new()));
    }

    #[test]
    fn test_boolean_connectives() {
        let expr = CriteriaExpression::parse(
            r#"gender == "f" and (multiple_birth == true or gestational_age_weeks < 37)"#,
            &vocab(),
        )
        .unwrap();

        assert!(expr.evaluate(&attrs(
            r#"{"gender": "f", "multiple_birth": false, "gestational_age_weeks": 35}"#
        )));
        assert!(!expr.evaluate(&attrs(
            r#"{"gender": "m", "multiple_birth": true, "gestational_age_weeks": 35}"#
        )));
    }

    #[test]
    fn test_not_binds_tighter_than_and() {
        let expr =
            CriteriaExpression::parse(r#"not hearing_loss == true and gender == "f""#, &vocab())
                .unwrap();
        assert!(expr.evaluate(&attrs(r#"{"hearing_loss": false, "gender": "f"}"#)));
        assert!(!expr.evaluate(&attrs(r#"{"hearing_loss": true, "gender": "f"}"#)));
    }

    #[test]
    fn test_list_membership() {
        let expr = CriteriaExpression::parse(r#""en" in languages_spoken"#, &vocab()).unwrap();
        assert!(expr.evaluate(&attrs(r#"{"languages_spoken": ["en", "es"]}"#)));
        assert!(!expr.evaluate(&attrs(r#"{"languages_spoken": ["fr"]}"#)));
    }

    #[test]
    fn test_one_of_membership() {
        let expr = CriteriaExpression::parse(r#"gender in ("f", "o")"#, &vocab()).unwrap();
        assert!(expr.evaluate(&attrs(r#"{"gender": "o"}"#)));
        assert!(!expr.evaluate(&attrs(r#"{"gender": "m"}"#)));
    }

    #[test]
    fn test_missing_attribute_makes_comparison_false() {
        let expr = CriteriaExpression::parse(r#"gender == "f""#, &vocab()).unwrap();
        assert!(!expr.evaluate(&AttributeMap::new()));

        // ...but the surrounding logic still applies.
        let negated = CriteriaExpression::parse(r#"not gender == "f""#, &vocab()).unwrap();
        assert!(negated.evaluate(&AttributeMap::new()));
    }

    #[test]
    fn test_unknown_attribute_is_a_parse_error() {
        let err = CriteriaExpression::parse(r#"favourite_colour == "red""#, &vocab()).unwrap_err();
        assert!(matches!(
            err,
            ExpressionError::UnknownAttribute { offset: 0, ref name } if name == "favourite_colour"
        ));
    }

    #[test]
    fn test_type_mismatch_is_a_parse_error() {
        // Ordering comparison on a text attribute.
        let err = CriteriaExpression::parse(r#"gender < 3"#, &vocab()).unwrap_err();
        assert!(matches!(err, ExpressionError::TypeMismatch { .. }));

        // String literal against an integer attribute.
        let err =
            CriteriaExpression::parse(r#"gestational_age_weeks == "many""#, &vocab()).unwrap_err();
        assert!(matches!(err, ExpressionError::TypeMismatch { .. }));
    }

    #[test]
    fn test_error_offsets_point_at_the_problem() {
        let source = r#"gender == "f" and nonsense == 1"#;
        let err = CriteriaExpression::parse(source, &vocab()).unwrap_err();
        assert_eq!(err.offset(), source.find("nonsense").unwrap());
    }

    #[test]
    fn test_reevaluation_is_deterministic() {
        let expr = CriteriaExpression::parse(
            r#"gestational_age_weeks >= 37 or "en" in languages_spoken"#,
            &vocab(),
        )
        .unwrap();
        let map = attrs(r#"{"gestational_age_weeks": 40, "languages_spoken": []}"#);
        let first = expr.evaluate(&map);
        for _ in 0..10 {
            assert_eq!(expr.evaluate(&map), first);
        }
    }
}
