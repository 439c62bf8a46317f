//! Repository abstraction for study persistence.
//!
//! The engine depends on a narrow storage shape: a versioned study record
//! with compare-and-swap commit for the `state` field, last-writer-wins for
//! the build flag, and an append-only transition history keyed by study id.
//! Durable backends live with the surrounding storage layer; an in-memory
//! implementation ships here for tests and embedding.

mod memory;

pub use memory::InMemoryStudyRepository;

use crate::workflow::event::TransitionEvent;
use async_trait::async_trait;
use studyflow_core::{BuildState, Study, StudyId, StudyState};

/// A study together with its optimistic-concurrency version.
///
/// The version advances on every committed state transition. Two requests
/// that read the same version race for one commit; the loser's
/// compare-and-swap fails.
#[derive(Debug, Clone, PartialEq)]
pub struct StudyRecord {
    pub study: Study,
    pub version: u64,
}

/// Why a compare-and-swap commit failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitError {
    NotFound,
    VersionMismatch,
}

#[async_trait]
pub trait StudyRepository: Send + Sync {
    /// Fetch a study record, or None if unknown.
    async fn get(&self, id: &StudyId) -> Option<StudyRecord>;

    /// Insert a new study at version zero (upsert: replaces any existing
    /// record, resetting its version and history).
    async fn insert(&self, study: Study);

    /// Commit a state transition: atomically check the version, write the
    /// new state, bump the version, and append `event` to the history log.
    async fn commit_transition(
        &self,
        id: &StudyId,
        expected_version: u64,
        new_state: StudyState,
        event: &TransitionEvent,
    ) -> Result<StudyRecord, CommitError>;

    /// Write the build flag. Last-writer-wins; does not touch the version.
    async fn set_build_state(&self, id: &StudyId, build: BuildState) -> Result<(), CommitError>;

    /// The append-only transition history for a study, oldest first.
    async fn history(&self, id: &StudyId) -> Vec<TransitionEvent>;
}
