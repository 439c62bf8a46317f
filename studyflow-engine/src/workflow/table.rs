//! The transition table.
//!
//! One data-driven table is the single source of truth for which triggers are
//! legal from which states, what capability each edge demands, whether the UI
//! should solicit comments, and whether the runner build pipeline cares about
//! the edge. Validation and UI rendering both read the same table.

use serde::{Deserialize, Serialize};
use std::fmt;
use studyflow_core::StudyState;

/// A named action requesting a state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    Submit,
    Retract,
    Approve,
    Reject,
    Resubmit,
    Activate,
    Pause,
    Deactivate,
}

impl Trigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submit => "submit",
            Self::Retract => "retract",
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Resubmit => "resubmit",
            Self::Activate => "activate",
            Self::Pause => "pause",
            Self::Deactivate => "deactivate",
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Trigger {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "submit" => Ok(Self::Submit),
            "retract" => Ok(Self::Retract),
            "approve" => Ok(Self::Approve),
            "reject" => Ok(Self::Reject),
            "resubmit" => Ok(Self::Resubmit),
            "activate" => Ok(Self::Activate),
            "pause" => Ok(Self::Pause),
            "deactivate" => Ok(Self::Deactivate),
            other => Err(format!("unknown trigger: {other}")),
        }
    }
}

/// The capability an edge demands of its actor.
///
/// The engine never names roles; the injected authorizer decides who holds
/// which capability for which study.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Edit a draft and move it in and out of review.
    SubmitStudy,
    /// Pass judgment on a submitted study.
    ReviewStudy,
    /// Operate an approved study (activate, pause, shut down).
    ManageStudy,
}

/// What the runner build pipeline should do when an edge commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildDirective {
    None,
    /// The "deploy" class of transitions: a fresh runner is wanted.
    Request,
    /// The study is leaving service; the runner artifact is stale.
    Invalidate,
}

/// One legal edge of the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub from: StudyState,
    pub trigger: Trigger,
    pub to: StudyState,
    pub capability: Capability,
    /// Advisory only: the UI should solicit comments, and the engine logs
    /// when they are absent, but absence never fails the transition.
    pub comments_expected: bool,
    pub build: BuildDirective,
}

/// Every legal transition. No-op edges are deliberately not modelled, so
/// repeating a trigger from its own target state is `InvalidTransition`.
pub const TRANSITION_TABLE: &[Edge] = &[
    Edge {
        from: StudyState::Created,
        trigger: Trigger::Submit,
        to: StudyState::Submitted,
        capability: Capability::SubmitStudy,
        comments_expected: true,
        build: BuildDirective::None,
    },
    Edge {
        from: StudyState::Submitted,
        trigger: Trigger::Retract,
        to: StudyState::Created,
        capability: Capability::SubmitStudy,
        comments_expected: false,
        build: BuildDirective::None,
    },
    Edge {
        from: StudyState::Submitted,
        trigger: Trigger::Approve,
        to: StudyState::Approved,
        capability: Capability::ReviewStudy,
        comments_expected: true,
        build: BuildDirective::None,
    },
    Edge {
        from: StudyState::Submitted,
        trigger: Trigger::Reject,
        to: StudyState::Rejected,
        capability: Capability::ReviewStudy,
        comments_expected: true,
        build: BuildDirective::None,
    },
    Edge {
        from: StudyState::Rejected,
        trigger: Trigger::Resubmit,
        to: StudyState::Submitted,
        capability: Capability::SubmitStudy,
        comments_expected: true,
        build: BuildDirective::None,
    },
    Edge {
        from: StudyState::Approved,
        trigger: Trigger::Activate,
        to: StudyState::Active,
        capability: Capability::ManageStudy,
        comments_expected: false,
        build: BuildDirective::Request,
    },
    Edge {
        from: StudyState::Active,
        trigger: Trigger::Pause,
        to: StudyState::Paused,
        capability: Capability::ManageStudy,
        comments_expected: false,
        build: BuildDirective::None,
    },
    Edge {
        from: StudyState::Paused,
        trigger: Trigger::Activate,
        to: StudyState::Active,
        capability: Capability::ManageStudy,
        comments_expected: false,
        build: BuildDirective::Request,
    },
    Edge {
        from: StudyState::Active,
        trigger: Trigger::Deactivate,
        to: StudyState::Deactivated,
        capability: Capability::ManageStudy,
        comments_expected: false,
        build: BuildDirective::Invalidate,
    },
    Edge {
        from: StudyState::Paused,
        trigger: Trigger::Deactivate,
        to: StudyState::Deactivated,
        capability: Capability::ManageStudy,
        comments_expected: false,
        build: BuildDirective::Invalidate,
    },
];

/// Look up the edge for a (state, trigger) pair.
pub fn edge(from: StudyState, trigger: Trigger) -> Option<&'static Edge> {
    TRANSITION_TABLE
        .iter()
        .find(|e| e.from == from && e.trigger == trigger)
}

/// Triggers legal from `from`, in table order. Empty for terminal states.
pub fn legal_triggers(from: StudyState) -> Vec<Trigger> {
    TRANSITION_TABLE
        .iter()
        .filter(|e| e.from == from)
        .map(|e| e.trigger)
        .collect()
}

/// Whether the UI should solicit comments for `trigger` (on any edge).
pub fn comments_expected(trigger: Trigger) -> bool {
    TRANSITION_TABLE
        .iter()
        .any(|e| e.trigger == trigger && e.comments_expected)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_TRIGGERS: [Trigger; 8] = [
        Trigger::Submit,
        Trigger::Retract,
        Trigger::Approve,
        Trigger::Reject,
        Trigger::Resubmit,
        Trigger::Activate,
        Trigger::Pause,
        Trigger::Deactivate,
    ];

    #[test]
    fn test_every_edge_is_unique() {
        for (i, a) in TRANSITION_TABLE.iter().enumerate() {
            for b in &TRANSITION_TABLE[i + 1..] {
                assert!(
                    !(a.from == b.from && a.trigger == b.trigger),
                    "duplicate edge ({:?}, {:?})",
                    a.from,
                    a.trigger
                );
            }
        }
    }

    #[test]
    fn test_no_self_loops() {
        for e in TRANSITION_TABLE {
            assert_ne!(e.from, e.to, "no-op edge ({:?}, {:?})", e.from, e.trigger);
        }
    }

    #[test]
    fn test_deactivated_is_terminal() {
        assert!(legal_triggers(StudyState::Deactivated).is_empty());
        for trigger in ALL_TRIGGERS {
            assert!(edge(StudyState::Deactivated, trigger).is_none());
        }
    }

    #[test]
    fn test_lifecycle_edges_match_the_design() {
        assert_eq!(
            edge(StudyState::Created, Trigger::Submit).map(|e| e.to),
            Some(StudyState::Submitted)
        );
        assert_eq!(
            edge(StudyState::Submitted, Trigger::Retract).map(|e| e.to),
            Some(StudyState::Created)
        );
        assert_eq!(
            edge(StudyState::Rejected, Trigger::Resubmit).map(|e| e.to),
            Some(StudyState::Submitted)
        );
        // Pause and activate form a cycle.
        assert_eq!(
            edge(StudyState::Active, Trigger::Pause).map(|e| e.to),
            Some(StudyState::Paused)
        );
        assert_eq!(
            edge(StudyState::Paused, Trigger::Activate).map(|e| e.to),
            Some(StudyState::Active)
        );
    }

    #[test]
    fn test_only_reviewers_approve_and_reject() {
        for e in TRANSITION_TABLE {
            let is_review = matches!(e.trigger, Trigger::Approve | Trigger::Reject);
            assert_eq!(is_review, e.capability == Capability::ReviewStudy);
        }
    }

    #[test]
    fn test_deploy_class_edges_touch_the_build_pipeline() {
        for e in TRANSITION_TABLE {
            match e.trigger {
                Trigger::Activate => assert_eq!(e.build, BuildDirective::Request),
                Trigger::Deactivate => assert_eq!(e.build, BuildDirective::Invalidate),
                _ => assert_eq!(e.build, BuildDirective::None),
            }
        }
    }

    #[test]
    fn test_comments_expected_for_review_adjacent_triggers() {
        for trigger in [
            Trigger::Submit,
            Trigger::Approve,
            Trigger::Reject,
            Trigger::Resubmit,
        ] {
            assert!(comments_expected(trigger), "{trigger} should expect comments");
        }
        assert!(!comments_expected(Trigger::Pause));
    }

    #[test]
    fn test_trigger_round_trips_through_str() {
        for trigger in ALL_TRIGGERS {
            assert_eq!(trigger.as_str().parse::<Trigger>(), Ok(trigger));
        }
        assert!("bogus".parse::<Trigger>().is_err());
    }
}
