use super::compliance::{ComplianceRule, Document};
use super::domain::{
    Booking, BookingId, BookingStatus, Marina, MarinaId, Mooring, MooringId, NewBooking,
    StatusTransition, TransitionError, Vessel, VesselId,
};

/// Booking ledger. `list` must reflect every committed booking at call time.
pub trait BookingLedger: Send + Sync {
    fn list(&self, mooring_id: Option<MooringId>) -> Result<Vec<Booking>, RepositoryError>;
    fn fetch(&self, id: BookingId) -> Result<Option<Booking>, RepositoryError>;
    /// Store a new pending booking and assign its identifier.
    fn append(&self, booking: NewBooking) -> Result<Booking, RepositoryError>;
    /// Apply a terminal decision. Must reject bookings that are already decided.
    fn transition(
        &self,
        id: BookingId,
        transition: StatusTransition,
    ) -> Result<Booking, RepositoryError>;
}

pub trait MooringCatalog: Send + Sync {
    fn marina(&self, id: MarinaId) -> Result<Option<Marina>, RepositoryError>;
    fn mooring(&self, id: MooringId) -> Result<Option<Mooring>, RepositoryError>;
    fn moorings(&self, marina_id: MarinaId) -> Result<Vec<Mooring>, RepositoryError>;
}

pub trait VesselDirectory: Send + Sync {
    fn vessel(&self, id: VesselId) -> Result<Option<Vessel>, RepositoryError>;
    fn documents(&self, vessel_id: VesselId) -> Result<Vec<Document>, RepositoryError>;
}

pub trait ComplianceRuleCatalog: Send + Sync {
    /// `None` when the marina has no compliance configuration at all.
    fn rules(&self, marina_id: MarinaId) -> Result<Option<Vec<ComplianceRule>>, RepositoryError>;
}

/// Read side of everything the service needs besides the ledger.
pub trait MarinaDirectory: MooringCatalog + VesselDirectory + ComplianceRuleCatalog {}

impl<T> MarinaDirectory for T where T: MooringCatalog + VesselDirectory + ComplianceRuleCatalog {}

/// Error enumeration for collaborator failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("booking {0} not found")]
    NotFound(BookingId),
    #[error("booking {id} is already {status}")]
    AlreadyDecided { id: BookingId, status: BookingStatus },
    #[error("invalid transition: {0}")]
    InvalidTransition(TransitionError),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

impl From<TransitionError> for RepositoryError {
    fn from(value: TransitionError) -> Self {
        match value {
            TransitionError::AlreadyDecided { id, status } => {
                RepositoryError::AlreadyDecided { id, status }
            }
            other => RepositoryError::InvalidTransition(other),
        }
    }
}
