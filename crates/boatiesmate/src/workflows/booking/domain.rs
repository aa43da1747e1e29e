use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::range::TimeRange;

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

numeric_id!(
    /// Identifier assigned by the booking ledger.
    BookingId
);
numeric_id!(MooringId);
numeric_id!(MarinaId);
numeric_id!(VesselId);
numeric_id!(OwnerId);

/// Marina (site) that scopes moorings, compliance rules, and operator access.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Marina {
    pub id: MarinaId,
    pub name: String,
}

/// Requester profile. Dimensions that are absent or non-finite leave that dimension
/// unconstrained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vessel {
    pub id: VesselId,
    pub name: String,
    #[serde(default)]
    pub owner_id: Option<OwnerId>,
    #[serde(default)]
    pub length_metres: Option<f64>,
    #[serde(default)]
    pub draft_metres: Option<f64>,
    #[serde(default)]
    pub beam_metres: Option<f64>,
    #[serde(default)]
    pub has_shore_power: bool,
}

impl Vessel {
    pub fn length(&self) -> Option<f64> {
        valid_measure(self.length_metres)
    }

    pub fn draft(&self) -> Option<f64> {
        valid_measure(self.draft_metres)
    }
}

/// Anything other than `active` takes the mooring out of allocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MooringStatus {
    Active,
    Inactive,
    Maintenance,
    #[serde(untagged)]
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mooring {
    pub id: MooringId,
    pub marina_id: MarinaId,
    pub name: String,
    /// Free-form tag such as `swing` or `berth`; only used for soft ranking.
    #[serde(default, rename = "type")]
    pub mooring_type: Option<String>,
    #[serde(default)]
    pub max_length_metres: Option<f64>,
    #[serde(default)]
    pub max_draft_metres: Option<f64>,
    #[serde(default)]
    pub status: Option<MooringStatus>,
}

impl Mooring {
    /// Moorings without a recorded status are treated as active.
    pub fn is_active(&self) -> bool {
        self.status
            .as_ref()
            .map_or(true, |status| *status == MooringStatus::Active)
    }

    pub fn max_length(&self) -> Option<f64> {
        valid_measure(self.max_length_metres)
    }

    pub fn max_draft(&self) -> Option<f64> {
        valid_measure(self.max_draft_metres)
    }
}

fn valid_measure(value: Option<f64>) -> Option<f64> {
    value.filter(|metres| metres.is_finite())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Approved,
    Declined,
}

impl BookingStatus {
    pub const fn label(self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Approved => "approved",
            BookingStatus::Declined => "declined",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, BookingStatus::Approved | BookingStatus::Declined)
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(BookingStatus::Pending),
            "approved" => Some(BookingStatus::Approved),
            "declined" => Some(BookingStatus::Declined),
            _ => None,
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Status sets that block a date range. Each call site names the set it uses.
pub mod blocking {
    use super::BookingStatus;

    /// Only authoritative bookings block; pending requests may coexist.
    pub const APPROVED_ONLY: &[BookingStatus] = &[BookingStatus::Approved];

    /// Pending requests are treated as holds as well.
    pub const PENDING_AND_APPROVED: &[BookingStatus] =
        &[BookingStatus::Pending, BookingStatus::Approved];
}

/// Ledger record for a mooring booking.
///
/// Dates are stored as received so a corrupt record stays visible to conflict checks
/// instead of failing deserialization of the whole ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: BookingId,
    #[serde(default)]
    pub owner_id: Option<OwnerId>,
    pub vessel_id: VesselId,
    pub mooring_id: MooringId,
    pub marina_id: MarinaId,
    pub start_date: String,
    pub end_date: String,
    pub status: BookingStatus,
    #[serde(default)]
    pub notes: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub decision_type: Option<BookingStatus>,
    #[serde(default)]
    pub decision_by_user_id: Option<String>,
    #[serde(default)]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub declined_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub decline_reason: Option<String>,
}

impl Booking {
    /// Parsed date range, or `None` when the stored dates are unreadable.
    pub fn range(&self) -> Option<TimeRange> {
        TimeRange::parse(&self.start_date, &self.end_date)
    }

    pub fn conflict_view(&self) -> ConflictView {
        ConflictView {
            id: self.id,
            start_date: self.start_date.clone(),
            end_date: self.end_date.clone(),
            status: self.status,
        }
    }

    /// Apply a terminal decision. Fails without touching any field when the booking has
    /// already been decided.
    pub fn apply(&mut self, transition: &StatusTransition) -> Result<(), TransitionError> {
        if self.status.is_terminal() {
            return Err(TransitionError::AlreadyDecided {
                id: self.id,
                status: self.status,
            });
        }

        match transition.target {
            BookingStatus::Pending => {
                return Err(TransitionError::NotTerminal { id: self.id });
            }
            BookingStatus::Approved => {
                self.approved_at = Some(transition.at);
                self.declined_at = None;
                self.decline_reason = None;
            }
            BookingStatus::Declined => {
                self.declined_at = Some(transition.at);
                self.approved_at = None;
                self.decline_reason = transition
                    .reason
                    .as_deref()
                    .map(str::trim)
                    .filter(|reason| !reason.is_empty())
                    .map(str::to_string);
            }
        }

        self.status = transition.target;
        self.decision_type = Some(transition.target);
        self.decision_by_user_id = Some(transition.actor.clone());
        Ok(())
    }
}

/// Request to append a booking; the ledger assigns the identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBooking {
    pub owner_id: Option<OwnerId>,
    pub vessel_id: VesselId,
    pub mooring_id: MooringId,
    pub marina_id: MarinaId,
    pub range: TimeRange,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

impl NewBooking {
    pub fn into_booking(self, id: BookingId) -> Booking {
        Booking {
            id,
            owner_id: self.owner_id,
            vessel_id: self.vessel_id,
            mooring_id: self.mooring_id,
            marina_id: self.marina_id,
            start_date: self.range.start().format("%Y-%m-%d").to_string(),
            end_date: self.range.end().format("%Y-%m-%d").to_string(),
            status: BookingStatus::Pending,
            notes: self.notes,
            created_at: self.created_at,
            decision_type: None,
            decision_by_user_id: None,
            approved_at: None,
            declined_at: None,
            decline_reason: None,
        }
    }
}

/// Terminal decision recorded against a pending booking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusTransition {
    pub target: BookingStatus,
    pub actor: String,
    pub reason: Option<String>,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("booking {id} is already {status}")]
    AlreadyDecided { id: BookingId, status: BookingStatus },
    #[error("booking {id} can only transition to approved or declined")]
    NotTerminal { id: BookingId },
}

/// Conflicting booking as reported to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictView {
    pub id: BookingId,
    pub start_date: String,
    pub end_date: String,
    pub status: BookingStatus,
}

/// Operator performing a decision. `marina_scope` is set for marina operators and left
/// empty for administrators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub user_id: String,
    #[serde(default)]
    pub marina_scope: Option<MarinaId>,
}

impl Actor {
    pub fn admin(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            marina_scope: None,
        }
    }

    pub fn operator(user_id: impl Into<String>, marina_id: MarinaId) -> Self {
        Self {
            user_id: user_id.into(),
            marina_scope: Some(marina_id),
        }
    }

    pub fn can_decide_for(&self, marina_id: MarinaId) -> bool {
        self.marina_scope.map_or(true, |scope| scope == marina_id)
    }
}
