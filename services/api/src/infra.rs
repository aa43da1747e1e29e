use boatiesmate::workflows::booking::{
    ComplianceRule, Document, DocumentType, InMemoryDirectory, Marina, MarinaId,
    MarinaRequirements, Mooring, MooringId, MooringStatus, OwnerId, RepositoryError,
    RulePredicate, Vessel, VesselId,
};
use chrono::{Duration, NaiveDate};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) const WESTHAVEN: MarinaId = MarinaId(1);
pub(crate) const BAYSWATER: MarinaId = MarinaId(2);

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

fn mooring(
    id: u64,
    marina_id: MarinaId,
    name: &str,
    mooring_type: &str,
    max_length: f64,
    max_draft: f64,
) -> Mooring {
    Mooring {
        id: MooringId(id),
        marina_id,
        name: name.to_string(),
        mooring_type: Some(mooring_type.to_string()),
        max_length_metres: Some(max_length),
        max_draft_metres: Some(max_draft),
        status: Some(MooringStatus::Active),
    }
}

fn vessel(id: u64, name: &str, owner: u64, length: f64, draft: f64, shore_power: bool) -> Vessel {
    Vessel {
        id: VesselId(id),
        name: name.to_string(),
        owner_id: Some(OwnerId(owner)),
        length_metres: Some(length),
        draft_metres: Some(draft),
        beam_metres: None,
        has_shore_power: shore_power,
    }
}

fn document(
    id: u64,
    vessel: u64,
    doc_type: &str,
    expiry: NaiveDate,
    coverage: Option<u64>,
) -> Document {
    Document {
        id,
        vessel_id: VesselId(vessel),
        doc_type: DocumentType::new(doc_type),
        issuer: None,
        policy_number: None,
        coverage_amount_nzd: coverage,
        issue_date: Some((expiry - Duration::days(365)).to_string()),
        expiry_date: Some(expiry.to_string()),
    }
}

/// Demo marinas, moorings, vessels, and documents. Document expiries are placed relative
/// to `today` so the walkthrough shows the same verdicts whenever it runs.
pub(crate) fn seed_directory(today: NaiveDate) -> Result<InMemoryDirectory, RepositoryError> {
    let directory = InMemoryDirectory::default();

    directory.insert_marina(Marina {
        id: WESTHAVEN,
        name: "Westhaven Marina".to_string(),
    })?;
    directory.insert_marina(Marina {
        id: BAYSWATER,
        name: "Bayswater Marina".to_string(),
    })?;

    let mut slipway = mooring(104, WESTHAVEN, "Slipway Berth", "berth", 22.0, 4.5);
    slipway.status = Some(MooringStatus::Maintenance);
    for mooring in [
        mooring(101, WESTHAVEN, "A Pier 1", "berth", 10.0, 2.5),
        mooring(102, WESTHAVEN, "A Pier 2", "berth", 14.0, 3.0),
        mooring(103, WESTHAVEN, "Outer Swing 3", "swing", 16.0, 3.5),
        slipway,
        mooring(201, BAYSWATER, "B Pier 1", "berth", 18.0, 4.0),
        mooring(202, BAYSWATER, "Fore Pile 2", "pile", 12.0, 2.2),
    ] {
        directory.insert_mooring(mooring)?;
    }

    for vessel in [
        vessel(1, "Kotare", 501, 12.0, 2.0, true),
        vessel(2, "Tui", 502, 8.5, 1.4, false),
        vessel(3, "Weka", 503, 9.0, 1.2, false),
    ] {
        directory.insert_vessel(vessel)?;
    }

    directory.insert_document(document(
        1,
        1,
        DocumentType::INSURANCE,
        today + Duration::days(200),
        Some(2_000_000),
    ))?;
    directory.insert_document(document(
        2,
        1,
        "SHORE_POWER_LEAD_TEST",
        today + Duration::days(90),
        None,
    ))?;
    directory.insert_document(document(
        3,
        2,
        DocumentType::INSURANCE,
        today + Duration::days(17),
        Some(1_500_000),
    ))?;

    directory.set_requirements(MarinaRequirements {
        marina_id: WESTHAVEN,
        required_documents: vec![
            ComplianceRule::required(DocumentType::INSURANCE).with_min_coverage(1_000_000),
            ComplianceRule::required("SHORE_POWER_LEAD_TEST")
                .with_grace_days(14)
                .when(RulePredicate::has_shore_power(true)),
            ComplianceRule::optional("EWoF"),
        ],
    })?;

    Ok(directory)
}
