//! Study model: lifecycle state, runner build state, and enrollment constraints.
//!
//! Following the principle of "make illegal states unrepresentable", both the
//! administrative lifecycle and the runner build flag are closed enums. The
//! lifecycle field is only ever written by the workflow engine; the build flag
//! has its own small machine driven by explicit calls from the edit path.

use crate::ids::StudyId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Fixed ratio used when converting a study's age bounds to days.
///
/// Deliberately not calendar-accurate: bounds are a researcher-facing
/// convention, and compounding calendar months would shift them per-child.
pub const DAYS_PER_MONTH: i64 = 30;

/// Fixed ratio used when converting a study's age bounds to days.
pub const DAYS_PER_YEAR: i64 = 365;

/// The administrative lifecycle state of a study.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StudyState {
    /// Draft being edited by the research group.
    Created,
    /// Submitted for institutional review.
    Submitted,
    /// Review passed; may be activated.
    Approved,
    /// Review failed; may be revised and resubmitted.
    Rejected,
    /// Live and collecting participants.
    Active,
    /// Temporarily hidden from participants.
    Paused,
    /// Shut down. Terminal for normal operation.
    Deactivated,
}

impl StudyState {
    /// Returns true if no further workflow transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Deactivated)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Submitted => "submitted",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Deactivated => "deactivated",
        }
    }

    /// All states, in lifecycle order. Used by table rendering and tests.
    pub fn all() -> [StudyState; 7] {
        [
            Self::Created,
            Self::Submitted,
            Self::Approved,
            Self::Rejected,
            Self::Active,
            Self::Paused,
            Self::Deactivated,
        ]
    }
}

impl fmt::Display for StudyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for StudyState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(Self::Created),
            "submitted" => Ok(Self::Submitted),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "active" => Ok(Self::Active),
            "paused" => Ok(Self::Paused),
            "deactivated" => Ok(Self::Deactivated),
            other => Err(format!("unknown study state: {other}")),
        }
    }
}

/// Freshness of the compiled experiment runner, independent of `StudyState`.
///
/// `NotBuilt -> Building -> Built`; edits to runner-defining fields reset
/// `Built` to `NotBuilt` via [`Study::mark_runner_stale`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildState {
    NotBuilt,
    Building,
    Built,
}

impl Default for BuildState {
    fn default() -> Self {
        Self::NotBuilt
    }
}

impl fmt::Display for BuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotBuilt => write!(f, "not built"),
            Self::Building => write!(f, "building"),
            Self::Built => write!(f, "built"),
        }
    }
}

/// A study's age window, expressed the way researchers author it.
///
/// All six fields are non-negative; zero everywhere on a side means that side
/// is unbounded. Bounds convert to day counts with the fixed 30/365 ratios.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AgeRange {
    #[serde(default)]
    pub min_age_days: u32,
    #[serde(default)]
    pub min_age_months: u32,
    #[serde(default)]
    pub min_age_years: u32,
    #[serde(default)]
    pub max_age_days: u32,
    #[serde(default)]
    pub max_age_months: u32,
    #[serde(default)]
    pub max_age_years: u32,
}

impl AgeRange {
    /// Lower bound in days, exclusive. `-1` when unbounded, so that an age of
    /// zero days still satisfies `min < age`.
    pub fn min_days(&self) -> i64 {
        if self.min_age_days == 0 && self.min_age_months == 0 && self.min_age_years == 0 {
            return -1;
        }
        i64::from(self.min_age_days)
            + DAYS_PER_MONTH * i64::from(self.min_age_months)
            + DAYS_PER_YEAR * i64::from(self.min_age_years)
    }

    /// Upper bound in days, exclusive. `i64::MAX` when unbounded.
    pub fn max_days(&self) -> i64 {
        if self.max_age_days == 0 && self.max_age_months == 0 && self.max_age_years == 0 {
            return i64::MAX;
        }
        i64::from(self.max_age_days)
            + DAYS_PER_MONTH * i64::from(self.max_age_months)
            + DAYS_PER_YEAR * i64::from(self.max_age_years)
    }
}

/// A study as the decision core sees it.
///
/// Created and destroyed externally; the core reads everything and writes only
/// `state` (via committed workflow transitions) and `build`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Study {
    pub id: StudyId,
    pub name: String,
    #[serde(default = "default_state")]
    pub state: StudyState,
    #[serde(default)]
    pub build: BuildState,
    #[serde(flatten)]
    pub age_range: AgeRange,
    /// Boolean DSL over child attributes; empty means always eligible.
    #[serde(default)]
    pub criteria_expression: String,
    /// Other studies a child must have completed before enrolling.
    #[serde(default)]
    pub must_have_participated: BTreeSet<StudyId>,
    /// Other studies a child must not have completed.
    #[serde(default)]
    pub must_not_have_participated: BTreeSet<StudyId>,
    /// Hosted outside the platform; consent is collected elsewhere.
    #[serde(default)]
    pub is_external: bool,
    /// The study claims to already be collecting data.
    #[serde(default)]
    pub collects_data: bool,
}

fn default_state() -> StudyState {
    StudyState::Created
}

impl Study {
    /// A new draft study with no constraints.
    pub fn new(id: impl Into<StudyId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            state: StudyState::Created,
            build: BuildState::NotBuilt,
            age_range: AgeRange::default(),
            criteria_expression: String::new(),
            must_have_participated: BTreeSet::new(),
            must_not_have_participated: BTreeSet::new(),
            is_external: false,
            collects_data: false,
        }
    }

    /// Whether the UI should offer the "build experiment runner" action.
    pub fn show_build_runner(&self) -> bool {
        !self.state.is_terminal() && self.build != BuildState::Building
    }

    /// Invalidate a previously built runner after an edit to runner-defining
    /// fields. A build already in flight is left alone; it will be stale when
    /// it lands and the edit path calls this again.
    pub fn mark_runner_stale(&mut self) {
        if self.build == BuildState::Built {
            self.build = BuildState::NotBuilt;
        }
    }

    /// Start a build. Returns false (and changes nothing) if a build is
    /// already in flight or building is not allowed in the current state.
    pub fn begin_build(&mut self) -> bool {
        if !self.show_build_runner() {
            return false;
        }
        self.build = BuildState::Building;
        true
    }

    /// Record a finished build. Only meaningful from `Building`.
    pub fn finish_build(&mut self) -> bool {
        if self.build != BuildState::Building {
            return false;
        }
        self.build = BuildState::Built;
        true
    }
}
