use serde::Serialize;

use super::super::domain::{Mooring, Vessel};

/// Result of a physical-fit check with human readable reasons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuitabilityCheck {
    pub passed: bool,
    pub reasons: Vec<String>,
}

impl SuitabilityCheck {
    fn from_reasons(reasons: Vec<String>) -> Self {
        Self {
            passed: reasons.is_empty(),
            reasons,
        }
    }
}

/// Decide whether `vessel` fits `mooring`.
///
/// Missing records short-circuit. A dimension is only checked when the mooring defines a
/// bound and the vessel carries a usable value for it.
pub fn check_suitability(vessel: Option<&Vessel>, mooring: Option<&Mooring>) -> SuitabilityCheck {
    let mut reasons = Vec::new();

    if vessel.is_none() {
        reasons.push("Vessel not found".to_string());
    }
    if mooring.is_none() {
        reasons.push("Mooring not found".to_string());
    }

    let (Some(vessel), Some(mooring)) = (vessel, mooring) else {
        return SuitabilityCheck::from_reasons(reasons);
    };

    if !mooring.is_active() {
        reasons.push("Mooring is not active".to_string());
    }

    if let (Some(length), Some(max_length)) = (vessel.length(), mooring.max_length()) {
        if length > max_length {
            reasons.push(format!(
                "Vessel length {length}m exceeds mooring max length {max_length}m"
            ));
        }
    }

    if let (Some(draft), Some(max_draft)) = (vessel.draft(), mooring.max_draft()) {
        if draft > max_draft {
            reasons.push(format!(
                "Vessel draft {draft}m exceeds mooring max draft {max_draft}m"
            ));
        }
    }

    SuitabilityCheck::from_reasons(reasons)
}
