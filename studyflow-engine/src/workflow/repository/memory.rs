//! In-memory repository.

use super::{CommitError, StudyRecord, StudyRepository};
use crate::workflow::event::TransitionEvent;
use async_trait::async_trait;
use std::collections::HashMap;
use studyflow_core::{BuildState, Study, StudyId, StudyState};
use tokio::sync::RwLock;

#[derive(Debug)]
struct Entry {
    record: StudyRecord,
    history: Vec<TransitionEvent>,
}

/// Thread-safe in-memory implementation of [`StudyRepository`].
///
/// One write lock covers the whole commit, which is what makes
/// `commit_transition` an atomic check-write-append.
#[derive(Debug, Default)]
pub struct InMemoryStudyRepository {
    entries: RwLock<HashMap<StudyId, Entry>>,
}

impl InMemoryStudyRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StudyRepository for InMemoryStudyRepository {
    async fn get(&self, id: &StudyId) -> Option<StudyRecord> {
        let entries = self.entries.read().await;
        entries.get(id).map(|entry| entry.record.clone())
    }

    async fn insert(&self, study: Study) {
        let mut entries = self.entries.write().await;
        entries.insert(
            study.id.clone(),
            Entry {
                record: StudyRecord { study, version: 0 },
                history: Vec::new(),
            },
        );
    }

    async fn commit_transition(
        &self,
        id: &StudyId,
        expected_version: u64,
        new_state: StudyState,
        event: &TransitionEvent,
    ) -> Result<StudyRecord, CommitError> {
        let mut entries = self.entries.write().await;
        let entry = entries.get_mut(id).ok_or(CommitError::NotFound)?;
        if entry.record.version != expected_version {
            return Err(CommitError::VersionMismatch);
        }
        entry.record.study.state = new_state;
        entry.record.version += 1;
        entry.history.push(event.clone());
        Ok(entry.record.clone())
    }

    async fn set_build_state(&self, id: &StudyId, build: BuildState) -> Result<(), CommitError> {
        let mut entries = self.entries.write().await;
        let entry = entries.get_mut(id).ok_or(CommitError::NotFound)?;
        entry.record.study.build = build;
        Ok(())
    }

    async fn history(&self, id: &StudyId) -> Vec<TransitionEvent> {
        let entries = self.entries.read().await;
        entries
            .get(id)
            .map(|entry| entry.history.clone())
            .unwrap_or_default()
    }
}
