//! Permission seam.
//!
//! The surrounding platform has its own notion of labs, groups, and roles.
//! The engine only ever asks one question: may this actor exercise this
//! capability on this study? Implementations answer it however they like.

use crate::workflow::table::Capability;
use std::collections::{HashMap, HashSet};
use studyflow_core::{ActorId, Study, StudyId};

pub trait Authorizer: Send + Sync {
    fn can_perform(&self, actor: &ActorId, study: &Study, capability: Capability) -> bool;
}

/// Table-driven authorizer: explicit grants, global or per-study.
///
/// Suitable for tests and single-lab deployments; larger installations
/// implement [`Authorizer`] against their own directory.
#[derive(Debug, Default)]
pub struct CapabilityTable {
    global: HashMap<ActorId, HashSet<Capability>>,
    per_study: HashMap<(ActorId, StudyId), HashSet<Capability>>,
}

impl CapabilityTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant a capability on every study.
    pub fn grant(&mut self, actor: impl Into<ActorId>, capability: Capability) -> &mut Self {
        self.global
            .entry(actor.into())
            .or_default()
            .insert(capability);
        self
    }

    /// Grant a capability on one study only.
    pub fn grant_on(
        &mut self,
        actor: impl Into<ActorId>,
        study: impl Into<StudyId>,
        capability: Capability,
    ) -> &mut Self {
        self.per_study
            .entry((actor.into(), study.into()))
            .or_default()
            .insert(capability);
        self
    }
}

impl Authorizer for CapabilityTable {
    fn can_perform(&self, actor: &ActorId, study: &Study, capability: Capability) -> bool {
        if self
            .global
            .get(actor)
            .is_some_and(|caps| caps.contains(&capability))
        {
            return true;
        }
        self.per_study
            .get(&(actor.clone(), study.id.clone()))
            .is_some_and(|caps| caps.contains(&capability))
    }
}
