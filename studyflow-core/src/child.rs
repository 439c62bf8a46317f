//! Evaluator inputs owned by the surrounding platform.

use crate::criteria::AttributeMap;
use crate::ids::{ChildId, StudyId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// A child as the eligibility evaluator sees them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Child {
    pub id: ChildId,
    pub birthday: NaiveDate,
    /// Attributes consumed by criteria expressions.
    #[serde(default)]
    pub attributes: AttributeMap,
}

impl Child {
    pub fn new(id: impl Into<ChildId>, birthday: NaiveDate) -> Self {
        Self {
            id: id.into(),
            birthday,
            attributes: AttributeMap::new(),
        }
    }
}

/// Which studies each child has completed.
///
/// Backing data for must-have / must-not-have participation constraints.
#[derive(Debug, Clone, Default)]
pub struct ParticipationHistory {
    completed: HashMap<ChildId, HashSet<StudyId>>,
}

impl ParticipationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `child` completed `study`.
    pub fn record(&mut self, child: ChildId, study: StudyId) {
        self.completed.entry(child).or_default().insert(study);
    }

    pub fn has_completed(&self, child: &ChildId, study: &StudyId) -> bool {
        self.completed
            .get(child)
            .is_some_and(|studies| studies.contains(study))
    }

    /// Number of studies the child has completed.
    pub fn completed_count(&self, child: &ChildId) -> usize {
        self.completed.get(child).map_or(0, HashSet::len)
    }
}
