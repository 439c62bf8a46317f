//! The workflow engine: validate, commit, emit.

use crate::workflow::bus::EventBus;
use crate::workflow::declarations;
use crate::workflow::error::TransitionError;
use crate::workflow::event::TransitionEvent;
use crate::workflow::repository::{CommitError, StudyRecord, StudyRepository};
use crate::workflow::table::{self, Trigger};
use crate::workflow::Authorizer;
use std::collections::BTreeSet;
use std::sync::Arc;
use studyflow_core::{ActorId, BuildState, StudyId};
use tracing::{debug, info};

/// Coordinates transition requests against the repository, the authorizer,
/// and the event bus.
///
/// Writer discipline for `Study::state` is read-validate-commit with an
/// optimistic version check: the repository's `commit_transition` refuses to
/// write if anything committed between our read and our write, and the whole
/// request fails with `ConcurrentModification`. At most one of two racing
/// requests commits; the loser is safely retryable.
pub struct WorkflowEngine {
    repository: Arc<dyn StudyRepository>,
    authorizer: Arc<dyn Authorizer>,
    bus: EventBus,
}

impl WorkflowEngine {
    pub fn new(
        repository: Arc<dyn StudyRepository>,
        authorizer: Arc<dyn Authorizer>,
        bus: EventBus,
    ) -> Self {
        Self {
            repository,
            authorizer,
            bus,
        }
    }

    /// Request a transition on a study.
    ///
    /// Checks run in a fixed order — edge exists, actor authorized,
    /// declarations valid — and nothing is mutated until all of them pass.
    /// On success the state is committed, the event is queued for delivery
    /// to external collaborators, and the event is returned. Delivery is
    /// asynchronous; a collaborator failure never unwinds a commit.
    pub async fn request_transition(
        &self,
        study_id: &StudyId,
        trigger: Trigger,
        actor: &ActorId,
        comments: Option<String>,
        declarations: &BTreeSet<String>,
    ) -> Result<TransitionEvent, TransitionError> {
        let StudyRecord { study, version } =
            self.repository
                .get(study_id)
                .await
                .ok_or(TransitionError::StudyNotFound {
                    study_id: study_id.clone(),
                })?;

        let edge = table::edge(study.state, trigger).ok_or(TransitionError::InvalidTransition {
            state: study.state,
            trigger,
        })?;

        if !self.authorizer.can_perform(actor, &study, edge.capability) {
            return Err(TransitionError::Unauthorized {
                actor: actor.clone(),
                trigger,
            });
        }

        declarations::validate(trigger, &study, declarations)?;

        if edge.comments_expected && comments.as_deref().map_or(true, |c| c.trim().is_empty()) {
            // Advisory only; the UI renders placeholder text for these.
            debug!("{} on study {} submitted without comments", trigger, study_id);
        }

        let event = TransitionEvent::new(
            study_id.clone(),
            edge.from,
            edge.to,
            trigger,
            actor.clone(),
            comments,
        );

        self.repository
            .commit_transition(study_id, version, edge.to, &event)
            .await
            .map_err(|err| match err {
                CommitError::NotFound => TransitionError::StudyNotFound {
                    study_id: study_id.clone(),
                },
                CommitError::VersionMismatch => TransitionError::ConcurrentModification {
                    study_id: study_id.clone(),
                },
            })?;

        info!("committed {}", event.log_summary());
        self.bus.publish(event.clone(), edge.build);

        Ok(event)
    }

    /// Triggers currently legal for a study, for UI rendering.
    pub async fn legal_triggers(&self, study_id: &StudyId) -> Result<Vec<Trigger>, TransitionError> {
        let record = self
            .repository
            .get(study_id)
            .await
            .ok_or(TransitionError::StudyNotFound {
                study_id: study_id.clone(),
            })?;
        Ok(table::legal_triggers(record.study.state))
    }

    /// The study's transition history, oldest first.
    pub async fn history(&self, study_id: &StudyId) -> Vec<TransitionEvent> {
        self.repository.history(study_id).await
    }

    /// Invalidate a built runner after an edit to runner-defining fields.
    ///
    /// Called by the study edit path, not by workflow transitions. Races on
    /// the build flag are benign (last writer wins).
    pub async fn mark_runner_stale(&self, study_id: &StudyId) -> Result<(), TransitionError> {
        let mut record = self.fetch(study_id).await?;
        record.study.mark_runner_stale();
        self.set_build(study_id, record.study.build).await
    }

    /// Start a runner build, if allowed in the study's current situation.
    pub async fn begin_build(&self, study_id: &StudyId) -> Result<(), TransitionError> {
        let mut record = self.fetch(study_id).await?;
        if !record.study.begin_build() {
            return Err(TransitionError::BuildNotAllowed {
                study_id: study_id.clone(),
                state: record.study.state,
            });
        }
        self.set_build(study_id, record.study.build).await
    }

    /// Record a finished runner build.
    pub async fn finish_build(&self, study_id: &StudyId) -> Result<(), TransitionError> {
        let mut record = self.fetch(study_id).await?;
        if !record.study.finish_build() {
            return Err(TransitionError::BuildNotAllowed {
                study_id: study_id.clone(),
                state: record.study.state,
            });
        }
        self.set_build(study_id, record.study.build).await
    }

    async fn fetch(&self, study_id: &StudyId) -> Result<StudyRecord, TransitionError> {
        self.repository
            .get(study_id)
            .await
            .ok_or(TransitionError::StudyNotFound {
                study_id: study_id.clone(),
            })
    }

    async fn set_build(
        &self,
        study_id: &StudyId,
        build: BuildState,
    ) -> Result<(), TransitionError> {
        self.repository
            .set_build_state(study_id, build)
            .await
            .map_err(|_| TransitionError::StudyNotFound {
                study_id: study_id.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::bus::{LoggingNotifier, NoopBuildPipeline};
    use crate::workflow::repository::InMemoryStudyRepository;
    use crate::workflow::table::Capability;
    use crate::workflow::CapabilityTable;
    use studyflow_core::{Study, StudyState};

    struct Fixture {
        engine: WorkflowEngine,
        repository: Arc<InMemoryStudyRepository>,
    }

    async fn fixture(study: Study) -> Fixture {
        let repository = Arc::new(InMemoryStudyRepository::new());
        repository.insert(study).await;

        let mut table = CapabilityTable::new();
        table.grant("owner", Capability::SubmitStudy);
        table.grant("reviewer", Capability::ReviewStudy);
        table.grant("manager", Capability::ManageStudy);

        let (bus, _handle) = EventBus::spawn(Arc::new(LoggingNotifier), Arc::new(NoopBuildPipeline));
        Fixture {
            engine: WorkflowEngine::new(repository.clone(), Arc::new(table), bus),
            repository,
        }
    }

    async fn state_of(repository: &InMemoryStudyRepository, id: &StudyId) -> StudyState {
        repository.get(id).await.unwrap().study.state
    }

    #[tokio::test]
    async fn test_submit_moves_created_to_submitted() {
        let f = fixture(Study::new("s1", "Example")).await;
        let id = StudyId::from("s1");

        let event = f
            .engine
            .request_transition(
                &id,
                Trigger::Submit,
                &ActorId::from("owner"),
                Some("ready for review".to_string()),
                &BTreeSet::new(),
            )
            .await
            .unwrap();

        assert_eq!(event.from_state, StudyState::Created);
        assert_eq!(event.to_state, StudyState::Submitted);
        assert_eq!(state_of(&f.repository, &id).await, StudyState::Submitted);
        assert_eq!(f.engine.history(&id).await, vec![event]);
    }

    #[tokio::test]
    async fn test_illegal_edge_leaves_state_unchanged() {
        let f = fixture(Study::new("s1", "Example")).await;
        let id = StudyId::from("s1");

        let err = f
            .engine
            .request_transition(
                &id,
                Trigger::Approve,
                &ActorId::from("reviewer"),
                None,
                &BTreeSet::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            TransitionError::InvalidTransition {
                state: StudyState::Created,
                trigger: Trigger::Approve
            }
        ));
        assert_eq!(state_of(&f.repository, &id).await, StudyState::Created);
        assert!(f.engine.history(&id).await.is_empty());
    }

    #[tokio::test]
    async fn test_every_illegal_pair_is_invalid_transition() {
        for from in StudyState::all() {
            for trigger in [
                Trigger::Submit,
                Trigger::Retract,
                Trigger::Approve,
                Trigger::Reject,
                Trigger::Resubmit,
                Trigger::Activate,
                Trigger::Pause,
                Trigger::Deactivate,
            ] {
                if table::edge(from, trigger).is_some() {
                    continue;
                }
                let mut study = Study::new("s1", "Example");
                study.state = from;
                let f = fixture(study).await;
                let id = StudyId::from("s1");

                // An actor with every capability, so only the edge can fail.
                let mut caps = CapabilityTable::new();
                caps.grant("root", Capability::SubmitStudy);
                caps.grant("root", Capability::ReviewStudy);
                caps.grant("root", Capability::ManageStudy);
                let (bus, _h) =
                    EventBus::spawn(Arc::new(LoggingNotifier), Arc::new(NoopBuildPipeline));
                let engine = WorkflowEngine::new(f.repository.clone(), Arc::new(caps), bus);

                let err = engine
                    .request_transition(
                        &id,
                        trigger,
                        &ActorId::from("root"),
                        None,
                        &BTreeSet::new(),
                    )
                    .await
                    .unwrap_err();
                assert!(
                    matches!(err, TransitionError::InvalidTransition { .. }),
                    "({from:?}, {trigger:?}) should be InvalidTransition, got {err:?}"
                );
                assert_eq!(state_of(&f.repository, &id).await, from);
            }
        }
    }

    #[tokio::test]
    async fn test_unauthorized_actor_cannot_approve() {
        let mut study = Study::new("s1", "Example");
        study.state = StudyState::Submitted;
        let f = fixture(study).await;
        let id = StudyId::from("s1");

        // The owner can submit but not approve.
        let err = f
            .engine
            .request_transition(
                &id,
                Trigger::Approve,
                &ActorId::from("owner"),
                Some("approving my own study".to_string()),
                &BTreeSet::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, TransitionError::Unauthorized { .. }));
        assert_eq!(state_of(&f.repository, &id).await, StudyState::Submitted);
    }

    #[tokio::test]
    async fn test_declaration_failure_precedes_commit() {
        let f = fixture(Study::new("s1", "Example")).await;
        let id = StudyId::from("s1");

        let mut declarations = BTreeSet::new();
        declarations.insert("issue_weather".to_string());

        let err = f
            .engine
            .request_transition(
                &id,
                Trigger::Submit,
                &ActorId::from("owner"),
                None,
                &declarations,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, TransitionError::UnknownDeclaration { .. }));
        assert_eq!(state_of(&f.repository, &id).await, StudyState::Created);
    }

    #[tokio::test]
    async fn test_missing_comments_are_advisory_not_fatal() {
        let f = fixture(Study::new("s1", "Example")).await;
        let id = StudyId::from("s1");

        let result = f
            .engine
            .request_transition(
                &id,
                Trigger::Submit,
                &ActorId::from("owner"),
                None,
                &BTreeSet::new(),
            )
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_repeating_a_trigger_is_invalid() {
        let f = fixture(Study::new("s1", "Example")).await;
        let id = StudyId::from("s1");
        let owner = ActorId::from("owner");

        f.engine
            .request_transition(&id, Trigger::Submit, &owner, None, &BTreeSet::new())
            .await
            .unwrap();

        let err = f
            .engine
            .request_transition(&id, Trigger::Submit, &owner, None, &BTreeSet::new())
            .await
            .unwrap_err();
        assert!(matches!(err, TransitionError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_unknown_study() {
        let f = fixture(Study::new("s1", "Example")).await;
        let err = f
            .engine
            .request_transition(
                &StudyId::from("ghost"),
                Trigger::Submit,
                &ActorId::from("owner"),
                None,
                &BTreeSet::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TransitionError::StudyNotFound { .. }));
    }

    #[tokio::test]
    async fn test_legal_triggers_follow_the_table() {
        let f = fixture(Study::new("s1", "Example")).await;
        let id = StudyId::from("s1");

        assert_eq!(f.engine.legal_triggers(&id).await.unwrap(), vec![Trigger::Submit]);

        f.engine
            .request_transition(
                &id,
                Trigger::Submit,
                &ActorId::from("owner"),
                None,
                &BTreeSet::new(),
            )
            .await
            .unwrap();

        assert_eq!(
            f.engine.legal_triggers(&id).await.unwrap(),
            vec![Trigger::Retract, Trigger::Approve, Trigger::Reject]
        );
    }

    #[tokio::test]
    async fn test_build_flag_round_trip() {
        let f = fixture(Study::new("s1", "Example")).await;
        let id = StudyId::from("s1");

        f.engine.begin_build(&id).await.unwrap();
        // A second begin while building is refused.
        assert!(matches!(
            f.engine.begin_build(&id).await.unwrap_err(),
            TransitionError::BuildNotAllowed { .. }
        ));

        f.engine.finish_build(&id).await.unwrap();
        assert_eq!(
            f.repository.get(&id).await.unwrap().study.build,
            BuildState::Built
        );

        f.engine.mark_runner_stale(&id).await.unwrap();
        assert_eq!(
            f.repository.get(&id).await.unwrap().study.build,
            BuildState::NotBuilt
        );
    }
}
