//! Transition events.
//!
//! A `TransitionEvent` is the immutable record of one committed transition.
//! It is what the append-only history log stores and what external
//! collaborators (notification, build pipeline) receive.

use crate::workflow::table::Trigger;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use studyflow_core::{ActorId, StudyId, StudyState};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionEvent {
    pub event_id: Uuid,
    pub study_id: StudyId,
    pub from_state: StudyState,
    pub to_state: StudyState,
    pub trigger: Trigger,
    pub actor: ActorId,
    pub comments: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl TransitionEvent {
    pub fn new(
        study_id: StudyId,
        from_state: StudyState,
        to_state: StudyState,
        trigger: Trigger,
        actor: ActorId,
        comments: Option<String>,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            study_id,
            from_state,
            to_state,
            trigger,
            actor,
            comments,
            timestamp: Utc::now(),
        }
    }

    /// Summary suitable for logging. Comments may hold review feedback we
    /// don't want in log lines, so only their presence is recorded.
    pub fn log_summary(&self) -> String {
        format!(
            "{} {{ study: {}, {} -> {}, actor: {}, comments: {} }}",
            self.trigger,
            self.study_id,
            self.from_state,
            self.to_state,
            self.actor,
            if self.comments.is_some() {
                "present"
            } else {
                "absent"
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_summary_omits_comment_text() {
        let event = TransitionEvent::new(
            StudyId::from("s1"),
            StudyState::Submitted,
            StudyState::Rejected,
            Trigger::Reject,
            ActorId::from("reviewer"),
            Some("the consent video is inaudible".to_string()),
        );

        let summary = event.log_summary();
        assert!(summary.contains("s1"));
        assert!(summary.contains("submitted -> rejected"));
        assert!(summary.contains("comments: present"));
        assert!(!summary.contains("inaudible"));
    }

    #[test]
    fn test_events_get_distinct_ids() {
        let make = || {
            TransitionEvent::new(
                StudyId::from("s1"),
                StudyState::Created,
                StudyState::Submitted,
                Trigger::Submit,
                ActorId::from("a"),
                None,
            )
        };
        assert_ne!(make().event_id, make().event_id);
    }
}
