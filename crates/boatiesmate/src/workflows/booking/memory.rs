//! In-process collaborators used by the api binary and the test suites.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::compliance::{ComplianceRule, Document, MarinaRequirements};
use super::domain::{
    Booking, BookingId, Marina, MarinaId, Mooring, MooringId, NewBooking, StatusTransition,
    Vessel, VesselId,
};
use super::repository::{
    BookingLedger, ComplianceRuleCatalog, MooringCatalog, RepositoryError, VesselDirectory,
};

fn lock<'a, T>(mutex: &'a Mutex<T>, name: &str) -> Result<MutexGuard<'a, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Unavailable(format!("{name} mutex poisoned")))
}

#[derive(Default, Clone)]
pub struct InMemoryBookingLedger {
    bookings: Arc<Mutex<BTreeMap<BookingId, Booking>>>,
}

impl InMemoryBookingLedger {
    pub fn seeded(bookings: impl IntoIterator<Item = Booking>) -> Self {
        let bookings = bookings
            .into_iter()
            .map(|booking| (booking.id, booking))
            .collect();
        Self {
            bookings: Arc::new(Mutex::new(bookings)),
        }
    }
}

impl BookingLedger for InMemoryBookingLedger {
    fn list(&self, mooring_id: Option<MooringId>) -> Result<Vec<Booking>, RepositoryError> {
        let guard = lock(&self.bookings, "ledger")?;
        Ok(guard
            .values()
            .filter(|booking| mooring_id.map_or(true, |id| booking.mooring_id == id))
            .cloned()
            .collect())
    }

    fn fetch(&self, id: BookingId) -> Result<Option<Booking>, RepositoryError> {
        let guard = lock(&self.bookings, "ledger")?;
        Ok(guard.get(&id).cloned())
    }

    fn append(&self, booking: NewBooking) -> Result<Booking, RepositoryError> {
        let mut guard = lock(&self.bookings, "ledger")?;
        let next = guard.keys().next_back().map_or(1, |last| last.0 + 1);
        let booking = booking.into_booking(BookingId(next));
        guard.insert(booking.id, booking.clone());
        Ok(booking)
    }

    fn transition(
        &self,
        id: BookingId,
        transition: StatusTransition,
    ) -> Result<Booking, RepositoryError> {
        let mut guard = lock(&self.bookings, "ledger")?;
        let booking = guard.get_mut(&id).ok_or(RepositoryError::NotFound(id))?;
        booking.apply(&transition)?;
        Ok(booking.clone())
    }
}

#[derive(Default)]
struct DirectoryData {
    marinas: BTreeMap<MarinaId, Marina>,
    moorings: BTreeMap<MooringId, Mooring>,
    vessels: BTreeMap<VesselId, Vessel>,
    documents: Vec<Document>,
    requirements: BTreeMap<MarinaId, Vec<ComplianceRule>>,
}

/// Marinas, moorings, vessels, documents, and compliance rules held in memory.
#[derive(Default, Clone)]
pub struct InMemoryDirectory {
    data: Arc<Mutex<DirectoryData>>,
}

impl InMemoryDirectory {
    pub fn insert_marina(&self, marina: Marina) -> Result<(), RepositoryError> {
        lock(&self.data, "directory")?
            .marinas
            .insert(marina.id, marina);
        Ok(())
    }

    pub fn insert_mooring(&self, mooring: Mooring) -> Result<(), RepositoryError> {
        lock(&self.data, "directory")?
            .moorings
            .insert(mooring.id, mooring);
        Ok(())
    }

    pub fn insert_vessel(&self, vessel: Vessel) -> Result<(), RepositoryError> {
        lock(&self.data, "directory")?
            .vessels
            .insert(vessel.id, vessel);
        Ok(())
    }

    pub fn insert_document(&self, document: Document) -> Result<(), RepositoryError> {
        lock(&self.data, "directory")?.documents.push(document);
        Ok(())
    }

    pub fn set_requirements(&self, requirements: MarinaRequirements) -> Result<(), RepositoryError> {
        lock(&self.data, "directory")?
            .requirements
            .insert(requirements.marina_id, requirements.required_documents);
        Ok(())
    }
}

impl MooringCatalog for InMemoryDirectory {
    fn marina(&self, id: MarinaId) -> Result<Option<Marina>, RepositoryError> {
        Ok(lock(&self.data, "directory")?.marinas.get(&id).cloned())
    }

    fn mooring(&self, id: MooringId) -> Result<Option<Mooring>, RepositoryError> {
        Ok(lock(&self.data, "directory")?.moorings.get(&id).cloned())
    }

    fn moorings(&self, marina_id: MarinaId) -> Result<Vec<Mooring>, RepositoryError> {
        let guard = lock(&self.data, "directory")?;
        Ok(guard
            .moorings
            .values()
            .filter(|mooring| mooring.marina_id == marina_id)
            .cloned()
            .collect())
    }
}

impl VesselDirectory for InMemoryDirectory {
    fn vessel(&self, id: VesselId) -> Result<Option<Vessel>, RepositoryError> {
        Ok(lock(&self.data, "directory")?.vessels.get(&id).cloned())
    }

    fn documents(&self, vessel_id: VesselId) -> Result<Vec<Document>, RepositoryError> {
        let guard = lock(&self.data, "directory")?;
        Ok(guard
            .documents
            .iter()
            .filter(|document| document.vessel_id == vessel_id)
            .cloned()
            .collect())
    }
}

impl ComplianceRuleCatalog for InMemoryDirectory {
    fn rules(&self, marina_id: MarinaId) -> Result<Option<Vec<ComplianceRule>>, RepositoryError> {
        Ok(lock(&self.data, "directory")?
            .requirements
            .get(&marina_id)
            .cloned())
    }
}
