//! Declared attribute vocabulary for criteria expressions.
//!
//! The parser validates every attribute reference against a vocabulary, so
//! typos and references to attributes a deployment doesn't collect fail at
//! study-configuration time rather than silently at evaluation time.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The kind of value an attribute holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    Bool,
    Int,
    Text,
    /// A list of text values (e.g. languages spoken). Only usable with the
    /// `"value" in attr` membership form.
    TextList,
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => write!(f, "boolean"),
            Self::Int => write!(f, "integer"),
            Self::Text => write!(f, "text"),
            Self::TextList => write!(f, "text list"),
        }
    }
}

/// The set of attribute names an expression may reference, with their kinds.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Vocabulary {
    kinds: BTreeMap<String, AttributeKind>,
}

impl Vocabulary {
    /// An empty vocabulary. Every attribute reference will be rejected.
    pub fn new() -> Self {
        Self::default()
    }

    /// The child/family attributes the platform collects by default.
    pub fn standard() -> Self {
        let mut vocab = Self::new();
        vocab.declare("gender", AttributeKind::Text);
        vocab.declare("gestational_age_weeks", AttributeKind::Int);
        vocab.declare("languages_spoken", AttributeKind::TextList);
        vocab.declare("multiple_birth", AttributeKind::Bool);
        vocab.declare("hearing_loss", AttributeKind::Bool);
        vocab.declare("vision_impairment", AttributeKind::Bool);
        vocab.declare("dyslexia", AttributeKind::Bool);
        vocab
    }

    /// Add or replace an attribute declaration.
    pub fn declare(&mut self, name: impl Into<String>, kind: AttributeKind) -> &mut Self {
        self.kinds.insert(name.into(), kind);
        self
    }

    /// Look up an attribute's declared kind.
    pub fn kind_of(&self, name: &str) -> Option<AttributeKind> {
        self.kinds.get(name).copied()
    }

    /// Declared attribute names, in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.kinds.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_vocabulary_kinds() {
        let vocab = Vocabulary::standard();
        assert_eq!(vocab.kind_of("gender"), Some(AttributeKind::Text));
        assert_eq!(
            vocab.kind_of("languages_spoken"),
            Some(AttributeKind::TextList)
        );
        assert_eq!(vocab.kind_of("made_up"), None);
    }

    #[test]
    fn test_declare_extends_the_vocabulary() {
        let mut vocab = Vocabulary::standard();
        vocab.declare("siblings", AttributeKind::Int);
        assert_eq!(vocab.kind_of("siblings"), Some(AttributeKind::Int));
    }
}
