//! Identifier newtypes.
//!
//! Studies, children and actors are all identified by opaque strings owned by
//! the surrounding platform. Newtypes prevent mixing them up.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Newtype for a study's opaque unique id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudyId(pub String);

impl fmt::Display for StudyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for StudyId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for StudyId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Newtype for a child's opaque unique id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChildId(pub String);

impl fmt::Display for ChildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ChildId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ChildId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Newtype for the identity of whoever requested a workflow action.
///
/// The workflow engine never interprets this beyond passing it to the
/// injected authorizer and stamping it onto transition events.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(pub String);

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ActorId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ActorId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
