//! Explicit state machine for the study lifecycle.
//!
//! This module implements the workflow that moves a study between
//! administrative states. The design separates:
//! - **Table**: which (state, trigger) edges exist and what each requires
//! - **Declarations**: acknowledged-issue flags a trigger solicits
//! - **Engine**: validate, commit (compare-and-swap), emit
//! - **Bus**: asynchronous delivery of committed transitions to external
//!   collaborators (notification, runner build pipeline)
//!
//! The engine is the only writer of `Study::state`. Validation never mutates;
//! every error leaves the study exactly as it was.

pub mod authorizer;
pub mod bus;
pub mod declarations;
pub mod engine;
pub mod error;
pub mod event;
pub mod repository;
pub mod table;

pub use authorizer::{Authorizer, CapabilityTable};
pub use bus::{BuildPipeline, EventBus, LoggingNotifier, NoopBuildPipeline, TransitionNotifier};
pub use declarations::{DeclarationSpec, COLLECTING_DATA, ISSUE_CONSENT};
pub use engine::WorkflowEngine;
pub use error::TransitionError;
pub use event::TransitionEvent;
pub use repository::{CommitError, InMemoryStudyRepository, StudyRecord, StudyRepository};
pub use table::{BuildDirective, Capability, Edge, Trigger};
