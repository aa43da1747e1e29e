//! Mooring booking allocation: compliance gating, physical fit, date conflicts,
//! alternative ranking, and approval-time classification.
//!
//! The rule modules are pure functions over snapshots. [`BookingService`] loads those
//! snapshots from the ledger and directory traits and serializes writes per mooring.

pub mod compliance;
pub mod decision;
pub mod domain;
pub mod locks;
pub mod memory;
pub mod range;
pub mod repository;
pub mod router;
pub mod rules;
pub mod service;

#[cfg(test)]
mod tests;

pub use compliance::{
    evaluate_compliance, ComplianceIssue, ComplianceMode, ComplianceResult, ComplianceRule,
    Document, DocumentState, DocumentType, IssueCode, MarinaRequirements, RulePredicate,
};
pub use decision::{classify_booking, DecisionClass, DecisionIntel};
pub use domain::{
    Actor, Booking, BookingId, BookingStatus, ConflictView, Marina, MarinaId, Mooring, MooringId,
    MooringStatus, NewBooking, OwnerId, StatusTransition, TransitionError, Vessel, VesselId,
};
pub use memory::{InMemoryBookingLedger, InMemoryDirectory};
pub use range::{RangeError, TimeRange};
pub use repository::{
    BookingLedger, ComplianceRuleCatalog, MarinaDirectory, MooringCatalog, RepositoryError,
    VesselDirectory,
};
pub use router::booking_router;
pub use rules::{
    check_suitability, find_alternatives, find_conflicts, AlternativeQuery, RankedAlternative,
    SuitabilityCheck,
};
pub use service::{
    ApplicationPack, ApprovalOutcome, AvailabilityQuery, AvailabilityReport, BookingOutcome,
    BookingRequest, BookingService, BookingServiceError, Clock, DeclineOutcome, FixedClock,
    InboxPage, InboxQuery, InboxSort, InboxStatus, MooringAvailability, SortDirection,
    SystemClock,
};
