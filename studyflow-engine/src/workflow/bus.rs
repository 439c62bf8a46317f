//! Transition event bus.
//!
//! The engine publishes every committed transition here; a dispatcher task
//! delivers it to the external collaborators. Delivery is asynchronous
//! relative to the caller of `request_transition`: the caller gets success as
//! soon as the state is committed and the event is queued. A collaborator
//! failure is a delivery problem, never a workflow failure — the source of
//! truth is the state field, not the notification.

use crate::workflow::event::TransitionEvent;
use crate::workflow::table::BuildDirective;
use async_trait::async_trait;
use std::sync::Arc;
use studyflow_core::StudyId;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Notification hook. Fire-and-forget: implementations log their own
/// failures and never propagate them into the workflow engine.
#[async_trait]
pub trait TransitionNotifier: Send + Sync {
    async fn notify_transition(&self, event: &TransitionEvent);
}

/// Runner build pipeline hook. The engine's only obligation is to call it
/// for build-relevant edges; performing the build is external.
#[async_trait]
pub trait BuildPipeline: Send + Sync {
    async fn request_build(&self, study_id: &StudyId);
    async fn invalidate_build(&self, study_id: &StudyId);
}

/// Default notifier: just logs. Real deployments subscribe their email
/// service here.
pub struct LoggingNotifier;

#[async_trait]
impl TransitionNotifier for LoggingNotifier {
    async fn notify_transition(&self, event: &TransitionEvent) {
        info!("transition committed: {}", event.log_summary());
    }
}

/// Default build pipeline: does nothing. For deployments without a runner
/// build service and for tests that don't care.
pub struct NoopBuildPipeline;

#[async_trait]
impl BuildPipeline for NoopBuildPipeline {
    async fn request_build(&self, _study_id: &StudyId) {}
    async fn invalidate_build(&self, _study_id: &StudyId) {}
}

struct Dispatch {
    event: TransitionEvent,
    build: BuildDirective,
}

/// Handle for publishing committed transitions.
///
/// Cloneable; all clones feed the one dispatcher task spawned by
/// [`EventBus::spawn`]. Dropping every clone shuts the dispatcher down once
/// the queue drains.
#[derive(Clone)]
pub struct EventBus {
    tx: mpsc::UnboundedSender<Dispatch>,
}

impl EventBus {
    /// Spawn the dispatcher task and return the publishing handle.
    pub fn spawn(
        notifier: Arc<dyn TransitionNotifier>,
        builds: Arc<dyn BuildPipeline>,
    ) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<Dispatch>();
        let handle = tokio::spawn(async move {
            while let Some(dispatch) = rx.recv().await {
                notifier.notify_transition(&dispatch.event).await;
                match dispatch.build {
                    BuildDirective::None => {}
                    BuildDirective::Request => {
                        builds.request_build(&dispatch.event.study_id).await;
                    }
                    BuildDirective::Invalidate => {
                        builds.invalidate_build(&dispatch.event.study_id).await;
                    }
                }
            }
        });
        (Self { tx }, handle)
    }

    /// Queue a committed transition for delivery. Failure to queue (the
    /// dispatcher is gone) is logged and swallowed: the transition has
    /// already committed and must not be reported as failed.
    pub fn publish(&self, event: TransitionEvent, build: BuildDirective) {
        if self.tx.send(Dispatch { event, build }).is_err() {
            error!("event bus dispatcher is gone; transition event dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::table::Trigger;
    use studyflow_core::{ActorId, StudyState};
    use tokio::sync::Mutex;

    /// Test double that records everything it is asked to deliver.
    #[derive(Default)]
    pub struct RecordingCollaborators {
        pub notified: Mutex<Vec<TransitionEvent>>,
        pub build_requests: Mutex<Vec<StudyId>>,
        pub build_invalidations: Mutex<Vec<StudyId>>,
    }

    #[async_trait]
    impl TransitionNotifier for RecordingCollaborators {
        async fn notify_transition(&self, event: &TransitionEvent) {
            self.notified.lock().await.push(event.clone());
        }
    }

    #[async_trait]
    impl BuildPipeline for RecordingCollaborators {
        async fn request_build(&self, study_id: &StudyId) {
            self.build_requests.lock().await.push(study_id.clone());
        }
        async fn invalidate_build(&self, study_id: &StudyId) {
            self.build_invalidations.lock().await.push(study_id.clone());
        }
    }

    fn event(study_id: &str) -> TransitionEvent {
        TransitionEvent::new(
            StudyId::from(study_id),
            StudyState::Approved,
            StudyState::Active,
            Trigger::Activate,
            ActorId::from("manager"),
            None,
        )
    }

    #[tokio::test]
    async fn test_events_are_delivered_in_order() {
        let recorder = Arc::new(RecordingCollaborators::default());
        let (bus, handle) = EventBus::spawn(recorder.clone(), recorder.clone());

        bus.publish(event("s1"), BuildDirective::Request);
        bus.publish(event("s2"), BuildDirective::None);
        bus.publish(event("s3"), BuildDirective::Invalidate);
        drop(bus);
        handle.await.unwrap();

        let notified = recorder.notified.lock().await;
        let ids: Vec<_> = notified.iter().map(|e| e.study_id.0.as_str()).collect();
        assert_eq!(ids, vec!["s1", "s2", "s3"]);

        assert_eq!(*recorder.build_requests.lock().await, vec![StudyId::from("s1")]);
        assert_eq!(
            *recorder.build_invalidations.lock().await,
            vec![StudyId::from("s3")]
        );
    }

    #[tokio::test]
    async fn test_publish_after_dispatcher_shutdown_is_swallowed() {
        let recorder = Arc::new(RecordingCollaborators::default());
        let (bus, handle) = EventBus::spawn(recorder.clone(), recorder.clone());

        handle.abort();
        let _ = handle.await;

        // Must not panic or error: the commit already happened.
        bus.publish(event("s1"), BuildDirective::None);
    }
}
