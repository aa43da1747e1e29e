use std::sync::Arc;
use std::thread;

use super::common::*;
use crate::config::BookingConfig;
use crate::workflows::booking::compliance::{ComplianceMode, DocumentState, IssueCode};
use crate::workflows::booking::decision::DecisionClass;
use crate::workflows::booking::domain::{
    Actor, BookingId, BookingStatus, MooringId, OwnerId, VesselId,
};
use crate::workflows::booking::memory::InMemoryDirectory;
use crate::workflows::booking::repository::RepositoryError;
use crate::workflows::booking::service::{
    ApprovalOutcome, AvailabilityQuery, BookingOutcome, BookingRequest, BookingService,
    BookingServiceError, DeclineOutcome, FixedClock, InboxQuery, InboxSort, InboxStatus,
    SortDirection,
};

fn request(vessel: u64, mooring: u64, start: &str, end: &str) -> BookingRequest {
    let range = range(start, end);
    BookingRequest {
        owner_id: None,
        vessel_id: VesselId(vessel),
        mooring_id: MooringId(mooring),
        start_date: range.start(),
        end_date: range.end(),
        notes: Some("arriving from Tauranga".to_string()),
    }
}

fn admin() -> Actor {
    Actor::admin("admin-1")
}

#[test]
fn request_creates_pending_booking() {
    let harness = harness();

    let outcome = harness
        .service
        .request(request(1, 12, "2027-03-01", "2027-03-05"))
        .expect("request handled");

    let BookingOutcome::Created(booking) = outcome else {
        panic!("expected created booking");
    };
    assert_eq!(booking.id, BookingId(1));
    assert_eq!(booking.status, BookingStatus::Pending);
    assert_eq!(booking.owner_id, Some(OwnerId(7)));
    assert_eq!(booking.marina_id, WESTHAVEN);
    assert_eq!(booking.start_date, "2027-03-01");
    assert_eq!(booking.end_date, "2027-03-05");
    assert_eq!(booking.created_at, now());
    assert_eq!(stored(&harness, 1), booking);
}

#[test]
fn request_rejects_inverted_range() {
    let harness = harness();
    let mut inverted = request(1, 12, "2027-03-01", "2027-03-05");
    std::mem::swap(&mut inverted.start_date, &mut inverted.end_date);

    match harness.service.request(inverted) {
        Err(BookingServiceError::InvalidRange(_)) => {}
        other => panic!("expected invalid range, got {other:?}"),
    }
}

#[test]
fn request_rejects_unknown_references() {
    let harness = harness();

    match harness
        .service
        .request(request(99, 12, "2027-03-01", "2027-03-05"))
    {
        Err(BookingServiceError::UnknownVessel(id)) => assert_eq!(id, VesselId(99)),
        other => panic!("expected unknown vessel, got {other:?}"),
    }
    match harness
        .service
        .request(request(1, 99, "2027-03-01", "2027-03-05"))
    {
        Err(BookingServiceError::UnknownMooring(id)) => assert_eq!(id, MooringId(99)),
        other => panic!("expected unknown mooring, got {other:?}"),
    }
}

#[test]
fn compliance_gate_runs_before_fit_and_dates() {
    let harness = harness_with(vec![booking(
        1,
        2,
        12,
        BookingStatus::Approved,
        "2027-03-01",
        "2027-03-05",
    )]);

    // Vessel 3 carries no insurance and the dates also clash; compliance is reported.
    let outcome = harness
        .service
        .request(request(3, 12, "2027-03-01", "2027-03-05"))
        .expect("request handled");

    let BookingOutcome::ComplianceBlocked(compliance) = outcome else {
        panic!("expected compliance block");
    };
    assert!(!compliance.eligible_to_book);
    assert_eq!(compliance.blocking_issues[0].code, IssueCode::MissingDocument);
    let pending = harness
        .service
        .inbox(WESTHAVEN, &InboxQuery::default())
        .expect("inbox listed");
    assert!(pending.results.is_empty());
}

#[test]
fn marina_without_rules_does_not_gate() {
    let harness = harness();

    let outcome = harness
        .service
        .request(request(3, 21, "2027-03-01", "2027-03-05"))
        .expect("request handled");

    assert!(matches!(outcome, BookingOutcome::Created(_)));
    let compliance = harness
        .service
        .check_compliance(VesselId(3), BAYSWATER)
        .expect("compliance evaluated");
    assert_eq!(compliance.mode, ComplianceMode::NoRulesConfigured);
}

#[test]
fn unsuitable_request_offers_alternatives_preferring_type() {
    let harness = harness();

    let outcome = harness
        .service
        .request(request(1, 11, "2027-03-01", "2027-03-05"))
        .expect("request handled");

    let BookingOutcome::Unsuitable {
        reasons,
        alternatives,
    } = outcome
    else {
        panic!("expected unsuitable outcome");
    };
    assert_eq!(
        reasons,
        vec!["Vessel length 12m exceeds mooring max length 10m".to_string()]
    );
    let ranked: Vec<(u64, i64)> = alternatives
        .iter()
        .map(|alternative| (alternative.mooring_id.0, alternative.score))
        .collect();
    assert_eq!(ranked, vec![(12, 10150), (13, 9275)]);
}

#[test]
fn approved_overlap_makes_request_unavailable() {
    let harness = harness_with(vec![
        booking(1, 2, 12, BookingStatus::Approved, "2027-03-01", "2027-03-05"),
        booking(2, 2, 13, BookingStatus::Pending, "2027-02-20", "2027-02-25"),
    ]);

    let outcome = harness
        .service
        .request(request(1, 12, "2027-03-04", "2027-03-06"))
        .expect("request handled");

    let BookingOutcome::Unavailable {
        mooring_id,
        requested,
        conflicts,
        alternatives,
    } = outcome
    else {
        panic!("expected unavailable outcome");
    };
    assert_eq!(mooring_id, MooringId(12));
    assert_eq!(requested, range("2027-03-04", "2027-03-06"));
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].id, BookingId(1));
    let ids: Vec<u64> = alternatives
        .iter()
        .map(|alternative| alternative.mooring_id.0)
        .collect();
    assert_eq!(ids, vec![13]);
}

#[test]
fn unavailable_alternatives_treat_pending_as_holds() {
    let harness = harness_with(vec![
        booking(1, 2, 12, BookingStatus::Approved, "2027-03-01", "2027-03-05"),
        booking(2, 2, 13, BookingStatus::Pending, "2027-03-05", "2027-03-08"),
    ]);

    let outcome = harness
        .service
        .request(request(1, 12, "2027-03-04", "2027-03-06"))
        .expect("request handled");

    let BookingOutcome::Unavailable { alternatives, .. } = outcome else {
        panic!("expected unavailable outcome");
    };
    assert!(alternatives.is_empty());
}

#[test]
fn pending_requests_may_compete_for_the_same_dates() {
    let harness = harness();

    let first = harness
        .service
        .request(request(1, 12, "2027-03-01", "2027-03-05"))
        .expect("first request");
    let second = harness
        .service
        .request(request(2, 12, "2027-03-03", "2027-03-04"))
        .expect("second request");

    assert!(matches!(first, BookingOutcome::Created(_)));
    assert!(matches!(second, BookingOutcome::Created(_)));

    let probe = harness
        .service
        .mooring_availability(MooringId(12), range("2027-03-02", "2027-03-02"))
        .expect("probe");
    assert!(!probe.available);
    assert_eq!(probe.conflicts.len(), 2);
}

#[test]
fn approve_records_audit_fields() {
    let harness = harness_with(vec![booking(
        1,
        1,
        12,
        BookingStatus::Pending,
        "2027-03-01",
        "2027-03-05",
    )]);

    let outcome = harness
        .service
        .approve(BookingId(1), &admin(), None)
        .expect("approval handled");

    let ApprovalOutcome::Approved(approved) = outcome else {
        panic!("expected approval");
    };
    assert_eq!(approved.status, BookingStatus::Approved);
    assert_eq!(approved.decision_type, Some(BookingStatus::Approved));
    assert_eq!(approved.decision_by_user_id.as_deref(), Some("admin-1"));
    assert_eq!(approved.approved_at, Some(now()));
    assert_eq!(stored(&harness, 1), approved);
}

#[test]
fn second_decision_is_rejected_without_side_effects() {
    let harness = harness_with(vec![booking(
        1,
        1,
        12,
        BookingStatus::Pending,
        "2027-03-01",
        "2027-03-05",
    )]);
    harness
        .service
        .approve(BookingId(1), &admin(), None)
        .expect("first approval");
    let after_first = stored(&harness, 1);

    let again = harness
        .service
        .approve(BookingId(1), &Actor::admin("admin-2"), None)
        .expect("second approval handled");
    assert_eq!(
        again,
        ApprovalOutcome::AlreadyDecided {
            id: BookingId(1),
            status: BookingStatus::Approved,
        }
    );

    let decline = harness
        .service
        .decline(BookingId(1), &admin(), Some("changed mind".to_string()))
        .expect("decline handled");
    assert_eq!(
        decline,
        DeclineOutcome::AlreadyDecided {
            id: BookingId(1),
            status: BookingStatus::Approved,
        }
    );
    assert_eq!(stored(&harness, 1), after_first);
}

#[test]
fn approval_is_blocked_once_a_competitor_is_approved() {
    let harness = harness_with(vec![
        booking(1, 1, 12, BookingStatus::Pending, "2027-03-01", "2027-03-05"),
        booking(2, 2, 12, BookingStatus::Pending, "2027-03-04", "2027-03-06"),
    ]);

    harness
        .service
        .approve(BookingId(1), &admin(), None)
        .expect("first approval");
    let outcome = harness
        .service
        .approve(BookingId(2), &admin(), None)
        .expect("second approval handled");

    let ApprovalOutcome::Blocked {
        intel,
        alternatives,
    } = outcome
    else {
        panic!("expected blocked approval");
    };
    assert_eq!(intel.status, DecisionClass::TempUnavailable);
    assert_eq!(intel.conflicts[0].id, BookingId(1));
    assert!(alternatives
        .iter()
        .all(|alternative| alternative.mooring_id != MooringId(12)));
    assert_eq!(stored(&harness, 2).status, BookingStatus::Pending);
}

#[test]
fn approval_rechecks_fit() {
    let harness = harness_with(vec![booking(
        1,
        1,
        11,
        BookingStatus::Pending,
        "2027-03-01",
        "2027-03-05",
    )]);

    let outcome = harness
        .service
        .approve(BookingId(1), &admin(), None)
        .expect("approval handled");

    let ApprovalOutcome::Blocked {
        intel,
        alternatives,
    } = outcome
    else {
        panic!("expected blocked approval");
    };
    assert_eq!(intel.status, DecisionClass::StructurallyUnsuitable);
    assert_eq!(alternatives[0].mooring_id, MooringId(12));
}

#[test]
fn approval_of_unresolvable_booking_is_an_error() {
    let harness = harness_with(vec![booking(
        1,
        99,
        12,
        BookingStatus::Pending,
        "2027-03-01",
        "2027-03-05",
    )]);

    match harness.service.approve(BookingId(1), &admin(), None) {
        Err(BookingServiceError::Unresolvable { id, reasons }) => {
            assert_eq!(id, BookingId(1));
            assert_eq!(
                reasons,
                vec!["Booking has invalid vesselId (cannot evaluate).".to_string()]
            );
        }
        other => panic!("expected unresolvable error, got {other:?}"),
    }
    assert_eq!(stored(&harness, 1).status, BookingStatus::Pending);
}

#[test]
fn operators_are_confined_to_their_marina() {
    let harness = harness_with(vec![booking(
        1,
        1,
        12,
        BookingStatus::Pending,
        "2027-03-01",
        "2027-03-05",
    )]);

    let outsider = Actor::operator("op-bays", BAYSWATER);
    match harness.service.approve(BookingId(1), &outsider, None) {
        Err(BookingServiceError::Forbidden { user_id, marina_id }) => {
            assert_eq!(user_id, "op-bays");
            assert_eq!(marina_id, WESTHAVEN);
        }
        other => panic!("expected forbidden, got {other:?}"),
    }
    assert!(matches!(
        harness.service.decline(BookingId(1), &outsider, None),
        Err(BookingServiceError::Forbidden { .. })
    ));

    let local = Actor::operator("op-west", WESTHAVEN);
    let outcome = harness
        .service
        .approve(BookingId(1), &local, None)
        .expect("local operator may approve");
    assert!(matches!(outcome, ApprovalOutcome::Approved(_)));
}

#[test]
fn decline_trims_reason() {
    let harness = harness_with(vec![
        booking(1, 1, 12, BookingStatus::Pending, "2027-03-01", "2027-03-05"),
        booking(2, 2, 12, BookingStatus::Pending, "2027-04-01", "2027-04-05"),
    ]);

    let outcome = harness
        .service
        .decline(
            BookingId(1),
            &admin(),
            Some("  Berth under repair  ".to_string()),
        )
        .expect("decline handled");
    let DeclineOutcome::Declined(declined) = outcome else {
        panic!("expected declined booking");
    };
    assert_eq!(declined.status, BookingStatus::Declined);
    assert_eq!(declined.decline_reason.as_deref(), Some("Berth under repair"));
    assert_eq!(declined.declined_at, Some(now()));
    assert_eq!(declined.approved_at, None);

    let blank = harness
        .service
        .decline(BookingId(2), &admin(), Some("   ".to_string()))
        .expect("decline handled");
    let DeclineOutcome::Declined(blank) = blank else {
        panic!("expected declined booking");
    };
    assert_eq!(blank.decline_reason, None);
}

#[test]
fn unknown_booking_is_not_found() {
    let harness = harness();

    assert!(matches!(
        harness.service.approve(BookingId(5), &admin(), None),
        Err(BookingServiceError::BookingNotFound(BookingId(5)))
    ));
    assert!(matches!(
        harness.service.decision_intel(BookingId(5)),
        Err(BookingServiceError::BookingNotFound(_))
    ));
}

#[test]
fn concurrent_approvals_admit_exactly_one_winner() {
    let bookings = (1..=6)
        .map(|id| booking(id, 1 + id % 2, 12, BookingStatus::Pending, "2027-03-01", "2027-03-05"))
        .collect();
    let harness = harness_with(bookings);
    let service = harness.service.clone();

    let outcomes: Vec<ApprovalOutcome> = thread::scope(|scope| {
        let handles: Vec<_> = (1..=6)
            .map(|id| {
                let service = Arc::clone(&service);
                scope.spawn(move || {
                    service
                        .approve(BookingId(id), &Actor::admin(format!("admin-{id}")), None)
                        .expect("approval handled")
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("worker finished"))
            .collect()
    });

    let approved = outcomes
        .iter()
        .filter(|outcome| matches!(outcome, ApprovalOutcome::Approved(_)))
        .count();
    assert_eq!(approved, 1);
    assert!(outcomes.iter().all(|outcome| match outcome {
        ApprovalOutcome::Approved(_) => true,
        ApprovalOutcome::Blocked { intel, .. } => intel.status == DecisionClass::TempUnavailable,
        ApprovalOutcome::AlreadyDecided { .. } => false,
    }));
}

#[test]
fn availability_search_ranks_and_limits() {
    let harness = harness();
    let query = AvailabilityQuery {
        marina_id: WESTHAVEN,
        vessel_id: VesselId(2),
        range: range("2027-02-01", "2027-02-03"),
        blocking: Vec::new(),
        limit: None,
    };

    let report = harness
        .service
        .search_availability(query.clone())
        .expect("search runs");
    let ids: Vec<u64> = report
        .results
        .iter()
        .map(|alternative| alternative.mooring_id.0)
        .collect();
    assert_eq!(ids, vec![13, 12, 11]);
    assert_eq!(report.count, 3);
    assert_eq!(report.blocking_statuses, vec![BookingStatus::Approved]);
    assert!(report.diagnostics.is_none());

    let limited = harness
        .service
        .search_availability(AvailabilityQuery {
            limit: Some(1),
            ..query
        })
        .expect("search runs");
    assert_eq!(limited.count, 1);
}

#[test]
fn availability_search_honours_blocking_statuses() {
    let harness = harness_with(vec![booking(
        1,
        1,
        13,
        BookingStatus::Pending,
        "2027-02-02",
        "2027-02-02",
    )]);
    let query = AvailabilityQuery {
        marina_id: WESTHAVEN,
        vessel_id: VesselId(2),
        range: range("2027-02-01", "2027-02-03"),
        blocking: Vec::new(),
        limit: None,
    };

    let default = harness
        .service
        .search_availability(query.clone())
        .expect("search runs");
    assert!(default
        .results
        .iter()
        .any(|alternative| alternative.mooring_id == MooringId(13)));

    let holds = harness
        .service
        .search_availability(AvailabilityQuery {
            blocking: vec![BookingStatus::Pending, BookingStatus::Approved],
            ..query
        })
        .expect("search runs");
    assert!(holds
        .results
        .iter()
        .all(|alternative| alternative.mooring_id != MooringId(13)));
}

#[test]
fn empty_search_explains_itself() {
    let harness = harness_with(vec![
        booking(1, 2, 12, BookingStatus::Approved, "2027-02-01", "2027-02-10"),
        booking(2, 2, 13, BookingStatus::Approved, "2027-02-01", "2027-02-10"),
    ]);

    let report = harness
        .service
        .search_availability(AvailabilityQuery {
            marina_id: WESTHAVEN,
            vessel_id: VesselId(1),
            range: range("2027-02-03", "2027-02-04"),
            blocking: Vec::new(),
            limit: None,
        })
        .expect("search runs");

    assert!(report.results.is_empty());
    let diagnostics = report.diagnostics.expect("diagnostics present");
    assert_eq!(diagnostics.moorings_in_marina, 4);
    assert_eq!(diagnostics.suitable_ignoring_availability_count, 2);
    let ids: Vec<u64> = diagnostics
        .suitable_ignoring_availability
        .iter()
        .map(|mooring| mooring.mooring_id.0)
        .collect();
    assert_eq!(ids, vec![12, 13]);
}

#[test]
fn availability_search_rejects_unknown_marina() {
    let harness = harness();

    let result = harness.service.search_availability(AvailabilityQuery {
        marina_id: crate::workflows::booking::domain::MarinaId(9),
        vessel_id: VesselId(1),
        range: range("2027-02-03", "2027-02-04"),
        blocking: Vec::new(),
        limit: None,
    });

    assert!(matches!(result, Err(BookingServiceError::UnknownMarina(_))));
}

#[test]
fn compliance_check_reports_expiring_insurance() {
    let harness = harness();

    let result = harness
        .service
        .check_compliance(VesselId(2), WESTHAVEN)
        .expect("compliance evaluated");

    assert!(result.eligible_to_book);
    assert_eq!(result.state_of("INSURANCE"), Some(DocumentState::ExpiringSoon));
    assert_eq!(result.warnings[0].message, "Document expires in 17 day(s).");
}

#[test]
fn compliance_verdict_follows_the_clock() {
    let ledger = Arc::new(crate::workflows::booking::memory::InMemoryBookingLedger::default());
    let service = BookingService::with_clock(
        ledger,
        Arc::new(directory()),
        BookingConfig::default(),
        Arc::new(FixedClock::on(date(2027, 1, 2))),
    );

    let result = service
        .check_compliance(VesselId(2), WESTHAVEN)
        .expect("compliance evaluated");

    assert!(!result.eligible_to_book);
    assert_eq!(result.state_of("INSURANCE"), Some(DocumentState::Expired));
}

#[test]
fn application_pack_bundles_everything_for_the_operator() {
    let harness = harness_with(vec![booking(
        1,
        1,
        12,
        BookingStatus::Pending,
        "2027-03-01",
        "2027-03-05",
    )]);

    let pack = harness
        .service
        .application_pack(BookingId(1))
        .expect("pack built");

    assert_eq!(pack.booking.id, BookingId(1));
    assert_eq!(pack.vessel.as_ref().map(|vessel| vessel.id), Some(VesselId(1)));
    assert_eq!(pack.mooring.as_ref().map(|mooring| mooring.id), Some(MooringId(12)));
    assert_eq!(pack.marina_requirements.as_ref().map(Vec::len), Some(2));
    assert!(pack.compliance_summary.result.eligible_to_book);
    assert_eq!(pack.compliance_summary.computed_at, now());
    assert_eq!(pack.decision_intel.status, DecisionClass::Approvable);

    let json = serde_json::to_value(&pack).expect("serializes");
    assert_eq!(json["complianceSummary"]["eligibleToBook"], true);
    assert_eq!(json["decisionIntel"]["status"], "APPROVABLE");
}

fn inbox_ledger() -> Vec<crate::workflows::booking::domain::Booking> {
    vec![
        booking(1, 1, 12, BookingStatus::Pending, "2027-03-10", "2027-03-12"),
        booking(2, 2, 11, BookingStatus::Pending, "2027-02-01", "2027-02-02"),
        booking(3, 2, 13, BookingStatus::Approved, "2027-04-01", "2027-04-03"),
        booking(4, 1, 12, BookingStatus::Declined, "2027-01-05", "2027-01-06"),
        booking(5, 3, 21, BookingStatus::Pending, "2027-02-10", "2027-02-11"),
    ]
}

fn inbox_ids(harness: &Harness, query: InboxQuery) -> Vec<u64> {
    harness
        .service
        .inbox(WESTHAVEN, &query)
        .expect("inbox listed")
        .results
        .iter()
        .map(|booking| booking.id.0)
        .collect()
}

#[test]
fn inbox_defaults_to_pending_by_start_date() {
    let harness = harness_with(inbox_ledger());

    assert_eq!(inbox_ids(&harness, InboxQuery::default()), vec![2, 1]);
}

#[test]
fn inbox_filters_sorts_and_limits() {
    let harness = harness_with(inbox_ledger());

    let newest_first = InboxQuery {
        status: InboxStatus::All,
        sort: InboxSort::Created,
        direction: SortDirection::Desc,
        ..InboxQuery::default()
    };
    assert_eq!(inbox_ids(&harness, newest_first), vec![4, 3, 2, 1]);

    let window = InboxQuery {
        status: InboxStatus::All,
        from: Some(date(2027, 2, 1)),
        to: Some(date(2027, 3, 10)),
        ..InboxQuery::default()
    };
    assert_eq!(inbox_ids(&harness, window), vec![2, 1]);

    let by_vessel = InboxQuery {
        status: InboxStatus::All,
        vessel_id: Some(VesselId(2)),
        ..InboxQuery::default()
    };
    assert_eq!(inbox_ids(&harness, by_vessel), vec![2, 3]);

    let by_owner = InboxQuery {
        status: InboxStatus::All,
        owner_id: Some(OwnerId(7)),
        mooring_id: Some(MooringId(12)),
        ..InboxQuery::default()
    };
    assert_eq!(inbox_ids(&harness, by_owner), vec![4, 1]);

    let declined = InboxQuery {
        status: InboxStatus::Declined,
        ..InboxQuery::default()
    };
    assert_eq!(inbox_ids(&harness, declined), vec![4]);

    let page = harness
        .service
        .inbox(
            WESTHAVEN,
            &InboxQuery {
                limit: Some(1),
                ..InboxQuery::default()
            },
        )
        .expect("inbox listed");
    assert_eq!(page.limit, 1);
    assert_eq!(page.count, 1);
}

#[test]
fn repository_failures_surface_as_errors() {
    let service = BookingService::with_clock(
        Arc::new(UnavailableLedger),
        Arc::new(InMemoryDirectory::default()),
        BookingConfig::default(),
        Arc::new(FixedClock::on(today())),
    );

    match service.get(BookingId(1)) {
        Err(BookingServiceError::Repository(RepositoryError::Unavailable(message))) => {
            assert_eq!(message, "ledger offline");
        }
        other => panic!("expected repository error, got {other:?}"),
    }
}
