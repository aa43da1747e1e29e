use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::BookingConfig;

use super::compliance::{evaluate_compliance, ComplianceResult, ComplianceRule};
use super::decision::{classify_booking, DecisionClass, DecisionIntel};
use super::domain::{
    blocking, Actor, Booking, BookingId, BookingStatus, ConflictView, Marina, MarinaId, Mooring,
    MooringId, NewBooking, OwnerId, StatusTransition, Vessel, VesselId,
};
use super::locks::MooringLocks;
use super::range::{RangeError, TimeRange};
use super::repository::{BookingLedger, MarinaDirectory, RepositoryError};
use super::rules::{
    check_suitability, find_alternatives, find_conflicts, AlternativeQuery, RankedAlternative,
};

/// Source of "now" so compliance windows and audit stamps are testable.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Today's date at UTC midnight.
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to a single instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    pub fn on(date: NaiveDate) -> Self {
        Self(date.and_time(NaiveTime::MIN).and_utc())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Inbound request to hold a mooring for a date range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    #[serde(default)]
    pub owner_id: Option<OwnerId>,
    pub vessel_id: VesselId,
    pub mooring_id: MooringId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Result of a booking request. Business rejections are outcomes, not errors.
#[derive(Debug, Clone, PartialEq)]
pub enum BookingOutcome {
    Created(Booking),
    ComplianceBlocked(ComplianceResult),
    Unsuitable {
        reasons: Vec<String>,
        alternatives: Vec<RankedAlternative>,
    },
    Unavailable {
        mooring_id: MooringId,
        requested: TimeRange,
        conflicts: Vec<ConflictView>,
        alternatives: Vec<RankedAlternative>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApprovalOutcome {
    Approved(Booking),
    AlreadyDecided { id: BookingId, status: BookingStatus },
    Blocked {
        intel: DecisionIntel,
        alternatives: Vec<RankedAlternative>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeclineOutcome {
    Declined(Booking),
    AlreadyDecided { id: BookingId, status: BookingStatus },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AvailabilityQuery {
    pub marina_id: MarinaId,
    pub vessel_id: VesselId,
    pub range: TimeRange,
    /// Statuses that block a mooring; empty means approved only.
    pub blocking: Vec<BookingStatus>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MooringSummary {
    pub mooring_id: MooringId,
    pub name: String,
    #[serde(rename = "type")]
    pub mooring_type: Option<String>,
    pub max_length_metres: Option<f64>,
    pub max_draft_metres: Option<f64>,
}

impl From<&Mooring> for MooringSummary {
    fn from(mooring: &Mooring) -> Self {
        Self {
            mooring_id: mooring.id,
            name: mooring.name.clone(),
            mooring_type: mooring.mooring_type.clone(),
            max_length_metres: mooring.max_length_metres,
            max_draft_metres: mooring.max_draft_metres,
        }
    }
}

/// Explains an empty availability search.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityDiagnostics {
    pub moorings_in_marina: usize,
    pub suitable_ignoring_availability_count: usize,
    pub suitable_ignoring_availability: Vec<MooringSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityReport {
    pub marina: Marina,
    pub vessel: Vessel,
    pub requested: TimeRange,
    pub blocking_statuses: Vec<BookingStatus>,
    pub count: usize,
    pub results: Vec<RankedAlternative>,
    pub diagnostics: Option<AvailabilityDiagnostics>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MooringAvailability {
    pub mooring_id: MooringId,
    pub requested: TimeRange,
    pub available: bool,
    pub conflicts: Vec<ConflictView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceSummary {
    #[serde(flatten)]
    pub result: ComplianceResult,
    pub computed_at: DateTime<Utc>,
}

/// Everything an operator needs to decide a booking.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationPack {
    pub booking: Booking,
    pub vessel: Option<Vessel>,
    pub mooring: Option<Mooring>,
    pub marina_requirements: Option<Vec<ComplianceRule>>,
    pub compliance_summary: ComplianceSummary,
    pub decision_intel: DecisionIntel,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InboxStatus {
    #[default]
    Pending,
    Approved,
    Declined,
    All,
}

impl InboxStatus {
    fn admits(self, status: BookingStatus) -> bool {
        match self {
            InboxStatus::Pending => status == BookingStatus::Pending,
            InboxStatus::Approved => status == BookingStatus::Approved,
            InboxStatus::Declined => status == BookingStatus::Declined,
            InboxStatus::All => true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InboxSort {
    #[default]
    StartDate,
    Created,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Operator inbox filter. Dates bound the booking start date, both ends inclusive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InboxQuery {
    pub status: InboxStatus,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub mooring_id: Option<MooringId>,
    pub vessel_id: Option<VesselId>,
    pub owner_id: Option<OwnerId>,
    pub sort: InboxSort,
    pub direction: SortDirection,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InboxPage {
    pub marina_id: MarinaId,
    pub count: usize,
    pub limit: usize,
    pub results: Vec<Booking>,
}

enum Commit {
    Appended(Booking),
    Conflicted(Vec<ConflictView>),
}

/// Booking workflow composing the compliance gate, fit and conflict rules, and the ledger.
pub struct BookingService<L, D> {
    ledger: Arc<L>,
    directory: Arc<D>,
    config: BookingConfig,
    clock: Arc<dyn Clock>,
    locks: MooringLocks,
}

impl<L, D> BookingService<L, D>
where
    L: BookingLedger + 'static,
    D: MarinaDirectory + 'static,
{
    pub fn new(ledger: Arc<L>, directory: Arc<D>, config: BookingConfig) -> Self {
        Self::with_clock(ledger, directory, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        ledger: Arc<L>,
        directory: Arc<D>,
        config: BookingConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            ledger,
            directory,
            config,
            clock,
            locks: MooringLocks::default(),
        }
    }

    /// Request a booking: compliance gate, then fit, then dates.
    ///
    /// The conflict check and the append run under the mooring's lock. Creation only
    /// blocks on approved bookings so several pending requests may compete for a slot.
    pub fn request(&self, request: BookingRequest) -> Result<BookingOutcome, BookingServiceError> {
        let range = TimeRange::new(request.start_date, request.end_date)?;
        let vessel = self.require_vessel(request.vessel_id)?;
        let mooring = self.require_mooring(request.mooring_id)?;
        let marina = self.require_marina(mooring.marina_id)?;

        let compliance = self.evaluate(&vessel, marina.id)?;
        if !compliance.eligible_to_book {
            warn!(
                vessel_id = vessel.id.0,
                marina_id = marina.id.0,
                blocking = compliance.blocking_issues.len(),
                "booking blocked by compliance"
            );
            return Ok(BookingOutcome::ComplianceBlocked(compliance));
        }

        let suitability = check_suitability(Some(&vessel), Some(&mooring));
        if !suitability.passed {
            let query = AlternativeQuery::new(marina.id, range)
                .preferring(mooring.mooring_type.as_deref())
                .blocking_on(blocking::APPROVED_ONLY)
                .limit(self.config.alternatives_limit);
            let alternatives = self.alternatives(&vessel, &query)?;
            warn!(
                vessel_id = vessel.id.0,
                mooring_id = mooring.id.0,
                alternatives = alternatives.len(),
                "mooring unsuitable for vessel"
            );
            return Ok(BookingOutcome::Unsuitable {
                reasons: suitability.reasons,
                alternatives,
            });
        }

        let draft = NewBooking {
            owner_id: request.owner_id.or(vessel.owner_id),
            vessel_id: vessel.id,
            mooring_id: mooring.id,
            marina_id: marina.id,
            range,
            notes: request.notes.unwrap_or_default(),
            created_at: self.clock.now(),
        };

        let commit = self.locks.with_lock(mooring.id, || -> Result<Commit, RepositoryError> {
            let existing = self.ledger.list(Some(mooring.id))?;
            let conflicts = find_conflicts(
                &existing,
                mooring.id,
                &range,
                blocking::APPROVED_ONLY,
                None,
            );
            if !conflicts.is_empty() {
                return Ok(Commit::Conflicted(
                    conflicts.into_iter().map(Booking::conflict_view).collect(),
                ));
            }
            self.ledger.append(draft).map(Commit::Appended)
        })?;

        match commit {
            Commit::Appended(booking) => {
                info!(
                    booking_id = booking.id.0,
                    mooring_id = booking.mooring_id.0,
                    vessel_id = booking.vessel_id.0,
                    "booking created"
                );
                Ok(BookingOutcome::Created(booking))
            }
            Commit::Conflicted(conflicts) => {
                // Substitutes must also be clear of other pending requests.
                let query = AlternativeQuery::new(marina.id, range)
                    .preferring(mooring.mooring_type.as_deref())
                    .excluding(mooring.id)
                    .blocking_on(blocking::PENDING_AND_APPROVED)
                    .limit(self.config.alternatives_limit);
                let alternatives = self.alternatives(&vessel, &query)?;
                warn!(
                    mooring_id = mooring.id.0,
                    days = range.days(),
                    conflicts = conflicts.len(),
                    "requested dates unavailable"
                );
                Ok(BookingOutcome::Unavailable {
                    mooring_id: mooring.id,
                    requested: range,
                    conflicts,
                    alternatives,
                })
            }
        }
    }

    /// Approve a pending booking after re-running the fit and approved-conflict checks on
    /// current state.
    pub fn approve(
        &self,
        id: BookingId,
        actor: &Actor,
        reason: Option<String>,
    ) -> Result<ApprovalOutcome, BookingServiceError> {
        let booking = self.require_booking(id)?;
        self.authorize(actor, &booking)?;

        self.locks.with_lock(booking.mooring_id, || -> Result<_, BookingServiceError> {
            let booking = self.require_booking(id)?;
            if booking.status.is_terminal() {
                return Ok(ApprovalOutcome::AlreadyDecided {
                    id,
                    status: booking.status,
                });
            }

            let vessel = self.directory.vessel(booking.vessel_id)?;
            let mooring = self.directory.mooring(booking.mooring_id)?;
            let ledger = self.ledger.list(Some(booking.mooring_id))?;
            let intel = classify_booking(&booking, vessel.as_ref(), mooring.as_ref(), &ledger);

            match intel.status {
                DecisionClass::Approvable => {
                    let transition = StatusTransition {
                        target: BookingStatus::Approved,
                        actor: actor.user_id.clone(),
                        reason,
                        at: self.clock.now(),
                    };
                    match self.ledger.transition(id, transition) {
                        Ok(approved) => {
                            info!(
                                booking_id = id.0,
                                actor = %actor.user_id,
                                "booking approved"
                            );
                            Ok(ApprovalOutcome::Approved(approved))
                        }
                        Err(RepositoryError::AlreadyDecided { id, status }) => {
                            Ok(ApprovalOutcome::AlreadyDecided { id, status })
                        }
                        Err(err) => Err(err.into()),
                    }
                }
                DecisionClass::AlreadyDecided => Ok(ApprovalOutcome::AlreadyDecided {
                    id,
                    status: booking.status,
                }),
                DecisionClass::Unknown => Err(BookingServiceError::Unresolvable {
                    id,
                    reasons: intel.reasons,
                }),
                DecisionClass::StructurallyUnsuitable | DecisionClass::TempUnavailable => {
                    let alternatives = match (vessel.as_ref(), mooring.as_ref(), booking.range())
                    {
                        (Some(vessel), Some(mooring), Some(range)) => {
                            let query = AlternativeQuery::new(booking.marina_id, range)
                                .preferring(mooring.mooring_type.as_deref())
                                .blocking_on(blocking::APPROVED_ONLY)
                                .limit(self.config.alternatives_limit);
                            self.alternatives(vessel, &query)?
                        }
                        _ => Vec::new(),
                    };
                    warn!(
                        booking_id = id.0,
                        status = intel.status.label(),
                        "approval blocked"
                    );
                    Ok(ApprovalOutcome::Blocked {
                        intel,
                        alternatives,
                    })
                }
            }
        })
    }

    pub fn decline(
        &self,
        id: BookingId,
        actor: &Actor,
        reason: Option<String>,
    ) -> Result<DeclineOutcome, BookingServiceError> {
        let booking = self.require_booking(id)?;
        self.authorize(actor, &booking)?;

        self.locks.with_lock(booking.mooring_id, || -> Result<_, BookingServiceError> {
            let transition = StatusTransition {
                target: BookingStatus::Declined,
                actor: actor.user_id.clone(),
                reason,
                at: self.clock.now(),
            };
            match self.ledger.transition(id, transition) {
                Ok(declined) => {
                    info!(booking_id = id.0, actor = %actor.user_id, "booking declined");
                    Ok(DeclineOutcome::Declined(declined))
                }
                Err(RepositoryError::AlreadyDecided { id, status }) => {
                    Ok(DeclineOutcome::AlreadyDecided { id, status })
                }
                Err(err) => Err(err.into()),
            }
        })
    }

    pub fn get(&self, id: BookingId) -> Result<Booking, BookingServiceError> {
        self.require_booking(id)
    }

    /// Rank free, suitable moorings in a marina for a vessel and date range.
    pub fn search_availability(
        &self,
        query: AvailabilityQuery,
    ) -> Result<AvailabilityReport, BookingServiceError> {
        let marina = self.require_marina(query.marina_id)?;
        let vessel = self.require_vessel(query.vessel_id)?;
        let blocking_statuses = if query.blocking.is_empty() {
            blocking::APPROVED_ONLY.to_vec()
        } else {
            query.blocking
        };
        let limit = self.config.availability_limit(query.limit);

        let alternative_query = AlternativeQuery::new(marina.id, query.range)
            .blocking_on(&blocking_statuses)
            .limit(limit);
        let pool = self.directory.moorings(marina.id)?;
        let ledger = self.ledger.list(None)?;
        let results = find_alternatives(&pool, &ledger, &vessel, &alternative_query);
        debug!(
            marina_id = marina.id.0,
            vessel_id = vessel.id.0,
            results = results.len(),
            "availability search"
        );

        let diagnostics = if results.is_empty() {
            let suitable: Vec<MooringSummary> = pool
                .iter()
                .filter(|mooring| check_suitability(Some(&vessel), Some(mooring)).passed)
                .map(MooringSummary::from)
                .collect();
            Some(AvailabilityDiagnostics {
                moorings_in_marina: pool.len(),
                suitable_ignoring_availability_count: suitable.len(),
                suitable_ignoring_availability: suitable,
            })
        } else {
            None
        };

        Ok(AvailabilityReport {
            marina,
            vessel,
            requested: query.range,
            blocking_statuses,
            count: results.len(),
            results,
            diagnostics,
        })
    }

    /// Whether one mooring is free, treating pending requests as holds.
    pub fn mooring_availability(
        &self,
        mooring_id: MooringId,
        range: TimeRange,
    ) -> Result<MooringAvailability, BookingServiceError> {
        let mooring = self.require_mooring(mooring_id)?;
        let ledger = self.ledger.list(Some(mooring.id))?;
        let conflicts: Vec<ConflictView> = find_conflicts(
            &ledger,
            mooring.id,
            &range,
            blocking::PENDING_AND_APPROVED,
            None,
        )
        .into_iter()
        .map(Booking::conflict_view)
        .collect();

        Ok(MooringAvailability {
            mooring_id: mooring.id,
            requested: range,
            available: conflicts.is_empty(),
            conflicts,
        })
    }

    pub fn check_compliance(
        &self,
        vessel_id: VesselId,
        marina_id: MarinaId,
    ) -> Result<ComplianceResult, BookingServiceError> {
        let vessel = self.require_vessel(vessel_id)?;
        let marina = self.require_marina(marina_id)?;
        self.evaluate(&vessel, marina.id)
    }

    pub fn decision_intel(&self, id: BookingId) -> Result<DecisionIntel, BookingServiceError> {
        let booking = self.require_booking(id)?;
        let vessel = self.directory.vessel(booking.vessel_id)?;
        let mooring = self.directory.mooring(booking.mooring_id)?;
        let ledger = self.ledger.list(Some(booking.mooring_id))?;
        Ok(classify_booking(
            &booking,
            vessel.as_ref(),
            mooring.as_ref(),
            &ledger,
        ))
    }

    pub fn application_pack(&self, id: BookingId) -> Result<ApplicationPack, BookingServiceError> {
        let booking = self.require_booking(id)?;
        let vessel = self.directory.vessel(booking.vessel_id)?;
        let mooring = self.directory.mooring(booking.mooring_id)?;
        let requirements = self.directory.rules(booking.marina_id)?;
        let documents = match &vessel {
            Some(vessel) => self.directory.documents(vessel.id)?,
            None => Vec::new(),
        };

        let now = self.clock.now();
        let result = evaluate_compliance(
            vessel.as_ref(),
            &documents,
            requirements.as_deref(),
            now.date_naive(),
        );
        let ledger = self.ledger.list(Some(booking.mooring_id))?;
        let decision_intel = classify_booking(&booking, vessel.as_ref(), mooring.as_ref(), &ledger);

        Ok(ApplicationPack {
            booking,
            vessel,
            mooring,
            marina_requirements: requirements,
            compliance_summary: ComplianceSummary {
                result,
                computed_at: now,
            },
            decision_intel,
        })
    }

    /// Bookings for the operator's marina, filtered and sorted.
    pub fn inbox(
        &self,
        marina_id: MarinaId,
        query: &InboxQuery,
    ) -> Result<InboxPage, BookingServiceError> {
        let limit = self.config.inbox_limit(query.limit);
        let mut results: Vec<Booking> = self
            .ledger
            .list(query.mooring_id)?
            .into_iter()
            .filter(|booking| booking.marina_id == marina_id)
            .filter(|booking| query.status.admits(booking.status))
            .filter(|booking| query.vessel_id.map_or(true, |id| booking.vessel_id == id))
            .filter(|booking| query.owner_id.map_or(true, |id| booking.owner_id == Some(id)))
            .filter(|booking| within_window(booking, query.from, query.to))
            .collect();

        results.sort_by(|left, right| {
            let ordering = match query.sort {
                InboxSort::StartDate => start_key(left).cmp(&start_key(right)),
                InboxSort::Created => left.created_at.cmp(&right.created_at),
            };
            match query.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });
        results.truncate(limit);

        Ok(InboxPage {
            marina_id,
            count: results.len(),
            limit,
            results,
        })
    }

    fn evaluate(
        &self,
        vessel: &Vessel,
        marina_id: MarinaId,
    ) -> Result<ComplianceResult, BookingServiceError> {
        let documents = self.directory.documents(vessel.id)?;
        let rules = self.directory.rules(marina_id)?;
        Ok(evaluate_compliance(
            Some(vessel),
            &documents,
            rules.as_deref(),
            self.clock.today(),
        ))
    }

    fn alternatives(
        &self,
        vessel: &Vessel,
        query: &AlternativeQuery,
    ) -> Result<Vec<RankedAlternative>, BookingServiceError> {
        let pool = self.directory.moorings(query.marina_id)?;
        let ledger = self.ledger.list(None)?;
        Ok(find_alternatives(&pool, &ledger, vessel, query))
    }

    fn authorize(&self, actor: &Actor, booking: &Booking) -> Result<(), BookingServiceError> {
        if actor.can_decide_for(booking.marina_id) {
            return Ok(());
        }
        warn!(
            booking_id = booking.id.0,
            actor = %actor.user_id,
            "actor outside booking marina"
        );
        Err(BookingServiceError::Forbidden {
            user_id: actor.user_id.clone(),
            marina_id: booking.marina_id,
        })
    }

    fn require_booking(&self, id: BookingId) -> Result<Booking, BookingServiceError> {
        self.ledger
            .fetch(id)?
            .ok_or(BookingServiceError::BookingNotFound(id))
    }

    fn require_vessel(&self, id: VesselId) -> Result<Vessel, BookingServiceError> {
        self.directory
            .vessel(id)?
            .ok_or(BookingServiceError::UnknownVessel(id))
    }

    fn require_mooring(&self, id: MooringId) -> Result<Mooring, BookingServiceError> {
        self.directory
            .mooring(id)?
            .ok_or(BookingServiceError::UnknownMooring(id))
    }

    fn require_marina(&self, id: MarinaId) -> Result<Marina, BookingServiceError> {
        self.directory
            .marina(id)?
            .ok_or(BookingServiceError::UnknownMarina(id))
    }
}

fn start_key(booking: &Booking) -> NaiveDate {
    booking
        .range()
        .map(|range| range.start())
        .unwrap_or(NaiveDate::MIN)
}

fn within_window(booking: &Booking, from: Option<NaiveDate>, to: Option<NaiveDate>) -> bool {
    if from.is_none() && to.is_none() {
        return true;
    }
    let Some(start) = booking.range().map(|range| range.start()) else {
        return false;
    };
    from.map_or(true, |from| start >= from) && to.map_or(true, |to| start <= to)
}

/// Error raised by the booking service.
#[derive(Debug, thiserror::Error)]
pub enum BookingServiceError {
    #[error(transparent)]
    InvalidRange(#[from] RangeError),
    #[error("vessel {0} not found")]
    UnknownVessel(VesselId),
    #[error("mooring {0} not found")]
    UnknownMooring(MooringId),
    #[error("marina {0} not found")]
    UnknownMarina(MarinaId),
    #[error("booking {0} not found")]
    BookingNotFound(BookingId),
    #[error("user {user_id} may not decide bookings for marina {marina_id}")]
    Forbidden {
        user_id: String,
        marina_id: MarinaId,
    },
    #[error("booking {id} cannot be evaluated: {}", .reasons.join("; "))]
    Unresolvable { id: BookingId, reasons: Vec<String> },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
