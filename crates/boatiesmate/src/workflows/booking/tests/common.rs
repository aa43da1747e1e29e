use std::sync::Arc;

use axum::response::Response;
use axum::Router;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde_json::Value;

use crate::config::BookingConfig;
use crate::workflows::booking::compliance::{
    ComplianceRule, Document, DocumentType, MarinaRequirements,
};
use crate::workflows::booking::domain::{
    Booking, BookingId, BookingStatus, Marina, MarinaId, Mooring, MooringId, MooringStatus,
    NewBooking, OwnerId, StatusTransition, Vessel, VesselId,
};
use crate::workflows::booking::memory::{InMemoryBookingLedger, InMemoryDirectory};
use crate::workflows::booking::range::TimeRange;
use crate::workflows::booking::repository::{BookingLedger, RepositoryError};
use crate::workflows::booking::router::booking_router;
use crate::workflows::booking::service::{BookingService, FixedClock};

pub(super) type MemoryService = BookingService<InMemoryBookingLedger, InMemoryDirectory>;

pub(super) const WESTHAVEN: MarinaId = MarinaId(1);
pub(super) const BAYSWATER: MarinaId = MarinaId(2);

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn range(start: &str, end: &str) -> TimeRange {
    TimeRange::parse(start, end).expect("valid range")
}

pub(super) fn today() -> NaiveDate {
    date(2026, 12, 15)
}

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 12, 15, 0, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn vessel(id: u64, length: Option<f64>, draft: Option<f64>) -> Vessel {
    Vessel {
        id: VesselId(id),
        name: format!("vessel-{id}"),
        owner_id: Some(OwnerId(id + 6)),
        length_metres: length,
        draft_metres: draft,
        beam_metres: None,
        has_shore_power: false,
    }
}

pub(super) fn mooring(
    id: u64,
    marina: MarinaId,
    max_length: Option<f64>,
    max_draft: Option<f64>,
    mooring_type: &str,
) -> Mooring {
    Mooring {
        id: MooringId(id),
        marina_id: marina,
        name: format!("M{id}"),
        mooring_type: Some(mooring_type.to_string()),
        max_length_metres: max_length,
        max_draft_metres: max_draft,
        status: Some(MooringStatus::Active),
    }
}

/// Ledger record on `mooring`. Marina is `mooring / 10`; owner follows the vessel fixture.
pub(super) fn booking(
    id: u64,
    vessel: u64,
    mooring: u64,
    status: BookingStatus,
    start: &str,
    end: &str,
) -> Booking {
    Booking {
        id: BookingId(id),
        owner_id: Some(OwnerId(vessel + 6)),
        vessel_id: VesselId(vessel),
        mooring_id: MooringId(mooring),
        marina_id: MarinaId(mooring / 10),
        start_date: start.to_string(),
        end_date: end.to_string(),
        status,
        notes: String::new(),
        created_at: now() - Duration::days(30) + Duration::minutes(id as i64),
        decision_type: None,
        decision_by_user_id: None,
        approved_at: None,
        declined_at: None,
        decline_reason: None,
    }
}

pub(super) fn insurance(vessel: u64, expiry: NaiveDate, coverage: u64) -> Document {
    Document {
        id: vessel * 100,
        vessel_id: VesselId(vessel),
        doc_type: DocumentType::new(DocumentType::INSURANCE),
        issuer: Some("Harbour Mutual".to_string()),
        policy_number: Some(format!("HM-{vessel}")),
        coverage_amount_nzd: Some(coverage),
        issue_date: Some("2026-01-01".to_string()),
        expiry_date: Some(expiry.to_string()),
    }
}

pub(super) fn westhaven_rules() -> Vec<ComplianceRule> {
    vec![
        ComplianceRule::required(DocumentType::INSURANCE).with_min_coverage(1_000_000),
        ComplianceRule::optional("EWoF"),
    ]
}

/// Two marinas:
///
/// * Westhaven (1): 11 berth 10m/2.5m, 12 berth 14m/3m, 13 swing 16m/3.5m,
///   14 berth 20m/4m under maintenance. Insurance required, EWoF optional.
/// * Bayswater (2): 21 berth 18m/4m. No compliance configuration.
///
/// Vessels: 1 is 12m/2m with insurance to mid 2027, 2 is 8m/1.5m with insurance
/// expiring 2027-01-01, 3 is 9m/1.2m with no documents.
pub(super) fn directory() -> InMemoryDirectory {
    let directory = InMemoryDirectory::default();
    for marina in [
        Marina {
            id: WESTHAVEN,
            name: "Westhaven".to_string(),
        },
        Marina {
            id: BAYSWATER,
            name: "Bayswater".to_string(),
        },
    ] {
        directory.insert_marina(marina).expect("marina stored");
    }

    let mut maintenance = mooring(14, WESTHAVEN, Some(20.0), Some(4.0), "berth");
    maintenance.status = Some(MooringStatus::Maintenance);
    for mooring in [
        mooring(11, WESTHAVEN, Some(10.0), Some(2.5), "berth"),
        mooring(12, WESTHAVEN, Some(14.0), Some(3.0), "berth"),
        mooring(13, WESTHAVEN, Some(16.0), Some(3.5), "swing"),
        maintenance,
        mooring(21, BAYSWATER, Some(18.0), Some(4.0), "berth"),
    ] {
        directory.insert_mooring(mooring).expect("mooring stored");
    }

    for vessel in [
        vessel(1, Some(12.0), Some(2.0)),
        vessel(2, Some(8.0), Some(1.5)),
        vessel(3, Some(9.0), Some(1.2)),
    ] {
        directory.insert_vessel(vessel).expect("vessel stored");
    }

    directory
        .insert_document(insurance(1, date(2027, 6, 30), 2_000_000))
        .expect("document stored");
    directory
        .insert_document(insurance(2, date(2027, 1, 1), 1_500_000))
        .expect("document stored");
    directory
        .set_requirements(MarinaRequirements {
            marina_id: WESTHAVEN,
            required_documents: westhaven_rules(),
        })
        .expect("requirements stored");

    directory
}

pub(super) struct Harness {
    pub(super) service: Arc<MemoryService>,
    pub(super) ledger: Arc<InMemoryBookingLedger>,
}

pub(super) fn harness() -> Harness {
    harness_with(Vec::new())
}

pub(super) fn harness_with(bookings: Vec<Booking>) -> Harness {
    let ledger = Arc::new(InMemoryBookingLedger::seeded(bookings));
    let service = Arc::new(BookingService::with_clock(
        ledger.clone(),
        Arc::new(directory()),
        BookingConfig::default(),
        Arc::new(FixedClock::on(today())),
    ));
    Harness { service, ledger }
}

pub(super) fn router_with(bookings: Vec<Booking>) -> (Router, Arc<InMemoryBookingLedger>) {
    let Harness { service, ledger } = harness_with(bookings);
    (booking_router(service), ledger)
}

pub(super) fn stored(harness: &Harness, id: u64) -> Booking {
    harness
        .ledger
        .fetch(BookingId(id))
        .expect("ledger readable")
        .expect("booking present")
}

/// Ledger whose backing store is offline.
pub(super) struct UnavailableLedger;

impl BookingLedger for UnavailableLedger {
    fn list(&self, _mooring_id: Option<MooringId>) -> Result<Vec<Booking>, RepositoryError> {
        Err(RepositoryError::Unavailable("ledger offline".to_string()))
    }

    fn fetch(&self, _id: BookingId) -> Result<Option<Booking>, RepositoryError> {
        Err(RepositoryError::Unavailable("ledger offline".to_string()))
    }

    fn append(&self, _booking: NewBooking) -> Result<Booking, RepositoryError> {
        Err(RepositoryError::Unavailable("ledger offline".to_string()))
    }

    fn transition(
        &self,
        _id: BookingId,
        _transition: StatusTransition,
    ) -> Result<Booking, RepositoryError> {
        Err(RepositoryError::Unavailable("ledger offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
