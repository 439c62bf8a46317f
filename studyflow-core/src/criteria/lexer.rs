//! Tokenizer for criteria expressions.

use super::ExpressionError;

/// A token together with its byte offset in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    LParen,
    RParen,
    Comma,
    And,
    Or,
    Not,
    In,
    True,
    False,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Ident(String),
    Str(String),
    Int(i64),
}

impl TokenKind {
    /// Short human-readable rendering for error messages.
    pub fn describe(&self) -> String {
        match self {
            Self::LParen => "'('".to_string(),
            Self::RParen => "')'".to_string(),
            Self::Comma => "','".to_string(),
            Self::And => "'and'".to_string(),
            Self::Or => "'or'".to_string(),
            Self::Not => "'not'".to_string(),
            Self::In => "'in'".to_string(),
            Self::True => "'true'".to_string(),
            Self::False => "'false'".to_string(),
            Self::Eq => "'=='".to_string(),
            Self::Ne => "'!='".to_string(),
            Self::Lt => "'<'".to_string(),
            Self::Le => "'<='".to_string(),
            Self::Gt => "'>'".to_string(),
            Self::Ge => "'>='".to_string(),
            Self::Ident(name) => format!("identifier {name:?}"),
            Self::Str(s) => format!("string {s:?}"),
            Self::Int(n) => format!("integer {n}"),
        }
    }
}

/// Tokenize the whole source up front. Keywords are case-sensitive; strings
/// are double-quoted with no escape sequences (attribute values never need
/// them); integers may carry a leading minus.
pub fn tokenize(source: &str) -> Result<Vec<Token>, ExpressionError> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i] as char;
        match c {
            ' ' | '\t' | '\n' | '\r' => {
                i += 1;
            }
            '(' => {
                tokens.push(Token {
                    kind: TokenKind::LParen,
                    offset: i,
                });
                i += 1;
            }
            ')' => {
                tokens.push(Token {
                    kind: TokenKind::RParen,
                    offset: i,
                });
                i += 1;
            }
            ',' => {
                tokens.push(Token {
                    kind: TokenKind::Comma,
                    offset: i,
                });
                i += 1;
            }
            '=' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push(Token {
                        kind: TokenKind::Eq,
                        offset: i,
                    });
                    i += 2;
                } else {
                    return Err(ExpressionError::UnexpectedCharacter {
                        offset: i,
                        found: '=',
                    });
                }
            }
            '!' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push(Token {
                        kind: TokenKind::Ne,
                        offset: i,
                    });
                    i += 2;
                } else {
                    return Err(ExpressionError::UnexpectedCharacter {
                        offset: i,
                        found: '!',
                    });
                }
            }
            '<' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push(Token {
                        kind: TokenKind::Le,
                        offset: i,
                    });
                    i += 2;
                } else {
                    tokens.push(Token {
                        kind: TokenKind::Lt,
                        offset: i,
                    });
                    i += 1;
                }
            }
            '>' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push(Token {
                        kind: TokenKind::Ge,
                        offset: i,
                    });
                    i += 2;
                } else {
                    tokens.push(Token {
                        kind: TokenKind::Gt,
                        offset: i,
                    });
                    i += 1;
                }
            }
            '"' => {
                let start = i;
                i += 1;
                let content_start = i;
                while i < bytes.len() && bytes[i] != b'"' {
                    i += 1;
                }
                if i >= bytes.len() {
                    return Err(ExpressionError::UnterminatedString { offset: start });
                }
                tokens.push(Token {
                    kind: TokenKind::Str(source[content_start..i].to_string()),
                    offset: start,
                });
                i += 1;
            }
            '-' | '0'..='9' => {
                let start = i;
                i += 1;
                while i < bytes.len() && bytes[i].is_ascii_digit() {
                    i += 1;
                }
                let text = &source[start..i];
                match text.parse::<i64>() {
                    Ok(n) => tokens.push(Token {
                        kind: TokenKind::Int(n),
                        offset: start,
                    }),
                    Err(_) => {
                        return Err(ExpressionError::UnexpectedCharacter {
                            offset: start,
                            found: c,
                        })
                    }
                }
            }
            'a'..='z' | 'A'..='Z' | '_' => {
                let start = i;
                while i < bytes.len()
                    && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_')
                {
                    i += 1;
                }
                let word = &source[start..i];
                let kind = match word {
                    "and" => TokenKind::And,
                    "or" => TokenKind::Or,
                    "not" => TokenKind::Not,
                    "in" => TokenKind::In,
                    "true" => TokenKind::True,
                    "false" => TokenKind::False,
                    _ => TokenKind::Ident(word.to_string()),
                };
                tokens.push(Token { kind, offset: start });
            }
            other => {
                return Err(ExpressionError::UnexpectedCharacter {
                    offset: i,
                    found: other,
                })
            }
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_comparison() {
        let tokens = tokenize(r#"gender == "f""#).unwrap();
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].kind, TokenKind::Ident("gender".to_string()));
        assert_eq!(tokens[0].offset, 0);
        assert_eq!(tokens[1].kind, TokenKind::Eq);
        assert_eq!(tokens[1].offset, 7);
        assert_eq!(tokens[2].kind, TokenKind::Str("f".to_string()));
        assert_eq!(tokens[2].offset, 10);
    }

    #[test]
    fn test_tokenize_negative_integer() {
        let tokens = tokenize("x >= -3").unwrap();
        assert_eq!(tokens[2].kind, TokenKind::Int(-3));
    }

    #[test]
    fn test_single_equals_is_rejected() {
        let err = tokenize(r#"gender = "f""#).unwrap_err();
        assert!(matches!(
            err,
            ExpressionError::UnexpectedCharacter {
                offset: 7,
                found: '='
            }
        ));
    }

    #[test]
    fn test_unterminated_string() {
        let err = tokenize(r#"gender == "f"#).unwrap_err();
        assert!(matches!(
            err,
            ExpressionError::UnterminatedString { offset: 10 }
        ));
    }

    #[test]
    fn test_unexpected_character() {
        let err = tokenize("a @ b").unwrap_err();
        assert!(matches!(
            err,
            ExpressionError::UnexpectedCharacter {
                offset: 2,
                found: '@'
            }
        ));
    }
}
