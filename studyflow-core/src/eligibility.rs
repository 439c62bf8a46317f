//! Participant eligibility evaluation.
//!
//! Pure function from (child, study, participation history) to a verdict.
//! The participant's actual age is calendar-accurate day differencing; the
//! study's bounds use the fixed 30/365 ratios, because that is how the bounds
//! were authored. Both bounds are exclusive: a child whose age in days equals
//! a bound is ineligible on that side.

use crate::child::{Child, ParticipationHistory};
use crate::criteria::{CriteriaExpression, ExpressionError, Vocabulary};
use crate::study::Study;
use chrono::NaiveDate;
use serde::Serialize;

/// The outcome of evaluating one (child, study) pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EligibilityVerdict {
    /// Age strictly inside the study's window.
    pub age_eligible: bool,
    /// Criteria expression satisfied and participation constraints met.
    pub criteria_eligible: bool,
    /// Zero inside the window; days past the upper bound when too old
    /// (zero exactly at the bound); non-positive distance from the lower
    /// bound when too young.
    pub age_delta_days: i64,
    /// Four-way summary for the UI. Computed here rather than derived from
    /// `age_delta_days`, because a delta of zero is ambiguous between "at the
    /// lower bound" and "at the upper bound".
    ///
    /// Criteria failure takes precedence over age failure: "too young" is a
    /// come-back-later message, which would mislead a child who will never
    /// meet the criteria.
    pub status: EligibilityStatus,
}

/// Four-way summary of a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EligibilityStatus {
    Eligible,
    TooYoung,
    TooOld,
    CriteriaNotMet,
}

/// Evaluate eligibility of `child` for `study` as of `today`.
///
/// Returns `Err` when the study's criteria expression is malformed. That is a
/// study configuration bug: treat the child as ineligible, surface the error
/// to the study's maintainers, and never show it to the participant.
pub fn evaluate(
    child: &Child,
    study: &Study,
    participation: &ParticipationHistory,
    today: NaiveDate,
    vocabulary: &Vocabulary,
) -> Result<EligibilityVerdict, ExpressionError> {
    let expression = CriteriaExpression::parse(&study.criteria_expression, vocabulary)?;
    Ok(evaluate_parsed(
        child,
        study,
        participation,
        today,
        &expression,
    ))
}

/// Like [`evaluate`], with the criteria expression already parsed.
///
/// Callers deciding eligibility for many children against one study should
/// parse once and use this.
pub fn evaluate_parsed(
    child: &Child,
    study: &Study,
    participation: &ParticipationHistory,
    today: NaiveDate,
    expression: &CriteriaExpression,
) -> EligibilityVerdict {
    let age_in_days = (today - child.birthday).num_days();
    let min_days = study.age_range.min_days();
    let max_days = study.age_range.max_days();

    let age_eligible = min_days < age_in_days && age_in_days < max_days;
    let age_delta_days = if age_eligible {
        0
    } else if age_in_days >= max_days {
        age_in_days - max_days
    } else {
        age_in_days - min_days
    };

    let must_haves_met = study
        .must_have_participated
        .iter()
        .all(|required| participation.has_completed(&child.id, required));
    let must_not_haves_met = study
        .must_not_have_participated
        .iter()
        .all(|excluded| !participation.has_completed(&child.id, excluded));

    let criteria_eligible =
        expression.evaluate(&child.attributes) && must_haves_met && must_not_haves_met;

    let status = if !criteria_eligible {
        EligibilityStatus::CriteriaNotMet
    } else if age_eligible {
        EligibilityStatus::Eligible
    } else if age_in_days >= max_days {
        EligibilityStatus::TooOld
    } else {
        EligibilityStatus::TooYoung
    };

    EligibilityVerdict {
        age_eligible,
        criteria_eligible,
        age_delta_days,
        status,
    }
}
