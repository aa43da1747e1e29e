use serde::Serialize;

use super::domain::{blocking, Booking, ConflictView, Mooring, Vessel};
use super::rules::{check_suitability, find_conflicts};

/// Approval-time verdict for a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionClass {
    AlreadyDecided,
    Unknown,
    StructurallyUnsuitable,
    TempUnavailable,
    Approvable,
}

impl DecisionClass {
    pub const fn label(self) -> &'static str {
        match self {
            DecisionClass::AlreadyDecided => "ALREADY_DECIDED",
            DecisionClass::Unknown => "UNKNOWN",
            DecisionClass::StructurallyUnsuitable => "STRUCTURALLY_UNSUITABLE",
            DecisionClass::TempUnavailable => "TEMP_UNAVAILABLE",
            DecisionClass::Approvable => "APPROVABLE",
        }
    }

    /// Whether choosing other dates or another mooring could resolve the verdict.
    pub const fn is_temporary(self) -> bool {
        matches!(self, DecisionClass::TempUnavailable)
    }
}

/// Explainable decision intelligence attached to application packs and approvals.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionIntel {
    pub status: DecisionClass,
    pub approvable: bool,
    pub reasons: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub conflicts: Vec<ConflictView>,
}

impl DecisionIntel {
    fn blocked(status: DecisionClass, reasons: Vec<String>) -> Self {
        Self {
            status,
            approvable: false,
            reasons,
            conflicts: Vec::new(),
        }
    }

    pub fn summary(&self) -> String {
        if self.reasons.is_empty() {
            self.status.label().to_string()
        } else {
            format!("{}: {}", self.status.label(), self.reasons.join("; "))
        }
    }
}

/// Classify `booking` against the current ledger.
///
/// Structural problems are reported before date conflicts so an unsuitable booking is
/// never presented as fixable by picking other dates. Date conflicts only consider other
/// approved bookings.
pub fn classify_booking(
    booking: &Booking,
    vessel: Option<&Vessel>,
    mooring: Option<&Mooring>,
    ledger: &[Booking],
) -> DecisionIntel {
    if booking.status.is_terminal() {
        return DecisionIntel::blocked(
            DecisionClass::AlreadyDecided,
            vec![format!("Booking is already {}.", booking.status)],
        );
    }

    let (Some(vessel), Some(mooring)) = (vessel, mooring) else {
        let mut reasons = Vec::new();
        if vessel.is_none() {
            reasons.push("Booking has invalid vesselId (cannot evaluate).".to_string());
        }
        if mooring.is_none() {
            reasons.push("Booking has invalid mooringId (cannot evaluate).".to_string());
        }
        return DecisionIntel::blocked(DecisionClass::Unknown, reasons);
    };

    let Some(range) = booking.range() else {
        return DecisionIntel::blocked(
            DecisionClass::Unknown,
            vec!["Booking has invalid startDate/endDate (cannot evaluate).".to_string()],
        );
    };

    let suitability = check_suitability(Some(vessel), Some(mooring));
    if !suitability.passed {
        return DecisionIntel::blocked(DecisionClass::StructurallyUnsuitable, suitability.reasons);
    }

    let conflicts = find_conflicts(
        ledger,
        booking.mooring_id,
        &range,
        blocking::APPROVED_ONLY,
        Some(booking.id),
    );

    if !conflicts.is_empty() {
        let ids = conflicts
            .iter()
            .map(|conflict| conflict.id.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let mut reasons = vec![format!("Overlaps approved booking(s): {ids}")];
        reasons.extend(conflicts.iter().map(|conflict| {
            format!(
                "Conflict booking {}: {} to {}",
                conflict.id, conflict.start_date, conflict.end_date
            )
        }));

        return DecisionIntel {
            status: DecisionClass::TempUnavailable,
            approvable: false,
            reasons,
            conflicts: conflicts
                .into_iter()
                .map(Booking::conflict_view)
                .collect(),
        };
    }

    DecisionIntel {
        status: DecisionClass::Approvable,
        approvable: true,
        reasons: vec!["Suitable and no approved booking conflicts for requested dates.".to_string()],
        conflicts: Vec::new(),
    }
}
