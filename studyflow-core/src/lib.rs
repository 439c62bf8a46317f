pub mod child;
pub mod criteria;
pub mod eligibility;
pub mod ids;
pub mod study;

pub use child::{Child, ParticipationHistory};
pub use criteria::{
    AttributeKind, AttributeValue, CriteriaExpression, ExpressionError, Vocabulary,
};
pub use eligibility::{evaluate, EligibilityStatus, EligibilityVerdict};
pub use ids::{ActorId, ChildId, StudyId};
pub use study::{AgeRange, BuildState, Study, StudyState, DAYS_PER_MONTH, DAYS_PER_YEAR};
