//! Declaration schema: acknowledged-issue flags a trigger solicits.
//!
//! A declaration is a researcher-checked acknowledgment of a special
//! condition attached to a transition request. The schema is one data-driven
//! table per trigger; validation and UI rendering consume the same rows, so
//! the checkboxes a researcher sees are exactly the keys the engine accepts.

use crate::workflow::error::TransitionError;
use crate::workflow::table::Trigger;
use std::collections::BTreeSet;
use studyflow_core::Study;

/// The study is already collecting data and acknowledges submitting anyway.
pub const COLLECTING_DATA: &str = "collecting_data";

/// The consent flow has a known issue the researcher acknowledges.
pub const ISSUE_CONSENT: &str = "issue_consent";

/// One row of the declaration schema.
pub struct DeclarationSpec {
    pub key: &'static str,
    /// Checkbox label for the UI.
    pub label: &'static str,
    /// Whether this declaration applies to the given study at all. A
    /// declaration that does not apply is neither rendered nor accepted.
    pub applicable: fn(&Study) -> bool,
}

fn when_collecting(study: &Study) -> bool {
    study.collects_data
}

/// Consent issues are handled by the external host for external studies, so
/// the declaration is filtered out of the schema entirely.
fn when_platform_hosted(study: &Study) -> bool {
    !study.is_external
}

const SUBMIT_DECLARATIONS: &[DeclarationSpec] = &[
    DeclarationSpec {
        key: COLLECTING_DATA,
        label: "This study is already collecting data",
        applicable: when_collecting,
    },
    DeclarationSpec {
        key: ISSUE_CONSENT,
        label: "There is a known issue with the consent flow",
        applicable: when_platform_hosted,
    },
];

const NO_DECLARATIONS: &[DeclarationSpec] = &[];

/// The full schema for a trigger, before per-study filtering.
pub fn schema(trigger: Trigger) -> &'static [DeclarationSpec] {
    match trigger {
        Trigger::Submit => SUBMIT_DECLARATIONS,
        _ => NO_DECLARATIONS,
    }
}

/// The schema rows that apply to `study` — what the UI should render.
pub fn applicable(trigger: Trigger, study: &Study) -> Vec<&'static DeclarationSpec> {
    schema(trigger)
        .iter()
        .filter(|spec| (spec.applicable)(study))
        .collect()
}

/// Validate a supplied declaration set against the filtered schema.
///
/// Any key outside the applicable set is rejected, including keys that exist
/// in the unfiltered schema but do not apply to this study (e.g.
/// `issue_consent` on an external study).
pub fn validate(
    trigger: Trigger,
    study: &Study,
    supplied: &BTreeSet<String>,
) -> Result<(), TransitionError> {
    let applicable = applicable(trigger, study);
    for key in supplied {
        if !applicable.iter().any(|spec| spec.key == key) {
            return Err(TransitionError::UnknownDeclaration { key: key.clone() });
        }
    }
    Ok(())
}
