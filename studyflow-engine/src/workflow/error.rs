//! Workflow error taxonomy.
//!
//! Every variant is local and recoverable: none of them leaves a study
//! partially mutated. Notification and build-hook failures are not errors of
//! the workflow at all; they are logged by the dispatcher and never reported
//! back through this type.

use crate::workflow::table::Trigger;
use std::fmt;
use studyflow_core::{ActorId, StudyId, StudyState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    /// No study with this id. The surrounding storage layer owns creation.
    StudyNotFound { study_id: StudyId },
    /// No such edge from the current state. Surface as "action not
    /// available" rather than access denied.
    InvalidTransition {
        state: StudyState,
        trigger: Trigger,
    },
    /// Actor lacks the capability the edge demands. Never silently
    /// downgraded; checked before anything is mutated.
    Unauthorized {
        actor: ActorId,
        trigger: Trigger,
    },
    /// A supplied declaration is outside the filtered schema for this
    /// trigger and study. A client bug.
    UnknownDeclaration { key: String },
    /// Another transition committed between our read and our write. The
    /// caller should refresh and let the user retry.
    ConcurrentModification { study_id: StudyId },
    /// Building is not allowed in the study's current situation.
    BuildNotAllowed {
        study_id: StudyId,
        state: StudyState,
    },
}

impl fmt::Display for TransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StudyNotFound { study_id } => write!(f, "study {study_id} not found"),
            Self::InvalidTransition { state, trigger } => {
                write!(f, "cannot {trigger} a study in state {state}")
            }
            Self::Unauthorized { actor, trigger } => {
                write!(f, "actor {actor} is not allowed to {trigger}")
            }
            Self::UnknownDeclaration { key } => {
                write!(f, "declaration {key:?} does not apply to this transition")
            }
            Self::ConcurrentModification { study_id } => {
                write!(
                    f,
                    "study {study_id} was modified concurrently; refresh and retry"
                )
            }
            Self::BuildNotAllowed { study_id, state } => {
                write!(f, "study {study_id} cannot build in state {state}")
            }
        }
    }
}

impl std::error::Error for TransitionError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_the_study_and_action() {
        let err = TransitionError::InvalidTransition {
            state: StudyState::Created,
            trigger: Trigger::Approve,
        };
        assert_eq!(format!("{err}"), "cannot approve a study in state created");

        let err = TransitionError::ConcurrentModification {
            study_id: StudyId::from("s1"),
        };
        assert!(format!("{err}").contains("s1"));
    }
}
