use crate::infra::{seed_directory, BAYSWATER, WESTHAVEN};
use boatiesmate::config::BookingConfig;
use boatiesmate::error::AppError;
use boatiesmate::workflows::booking::domain::blocking;
use boatiesmate::workflows::booking::{
    Actor, ApprovalOutcome, AvailabilityQuery, BookingId, BookingOutcome, BookingRequest,
    BookingService, BookingServiceError, ComplianceResult, DeclineOutcome, FixedClock,
    InMemoryBookingLedger, InMemoryDirectory, InboxQuery, InboxStatus, MarinaId, MooringId,
    RankedAlternative, TimeRange, VesselId,
};
use chrono::{Duration, Local, NaiveDate};
use clap::Args;
use std::sync::Arc;

type DemoService = BookingService<InMemoryBookingLedger, InMemoryDirectory>;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Override the evaluation date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Days from today until the first requested arrival.
    #[arg(long, default_value_t = 30)]
    pub(crate) lead_days: i64,
}

#[derive(Args, Debug)]
pub(crate) struct AvailabilityArgs {
    /// Marina to search
    #[arg(long)]
    pub(crate) marina_id: u64,
    /// Vessel that needs a mooring
    #[arg(long)]
    pub(crate) vessel_id: u64,
    /// Arrival date (YYYY-MM-DD)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) start: NaiveDate,
    /// Departure date (YYYY-MM-DD)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) end: NaiveDate,
    /// Maximum number of moorings to list
    #[arg(long)]
    pub(crate) limit: Option<usize>,
    /// Treat pending requests as holds as well as approved bookings
    #[arg(long)]
    pub(crate) include_pending: bool,
    /// Print the report as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

fn demo_service(today: NaiveDate) -> Result<DemoService, AppError> {
    let directory = seed_directory(today).map_err(BookingServiceError::from)?;
    Ok(BookingService::with_clock(
        Arc::new(InMemoryBookingLedger::default()),
        Arc::new(directory),
        BookingConfig::default(),
        Arc::new(FixedClock::on(today)),
    ))
}

pub(crate) fn run_availability(args: AvailabilityArgs) -> Result<(), AppError> {
    let today = Local::now().date_naive();
    let service = demo_service(today)?;
    let range = TimeRange::new(args.start, args.end).map_err(BookingServiceError::from)?;
    let blocking = if args.include_pending {
        blocking::PENDING_AND_APPROVED.to_vec()
    } else {
        Vec::new()
    };

    let report = service.search_availability(AvailabilityQuery {
        marina_id: MarinaId(args.marina_id),
        vessel_id: VesselId(args.vessel_id),
        range,
        blocking,
        limit: args.limit,
    })?;

    if args.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{json}"),
            Err(err) => println!("Availability report unavailable: {err}"),
        }
        return Ok(());
    }

    println!(
        "Availability at {} for {} ({} to {})",
        report.marina.name,
        report.vessel.name,
        report.requested.start(),
        report.requested.end()
    );
    render_alternatives(&report.results);
    if let Some(diagnostics) = &report.diagnostics {
        println!(
            "  {} moorings in marina, {} would fit if free",
            diagnostics.moorings_in_marina, diagnostics.suitable_ignoring_availability_count
        );
    }
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let today = args.today.unwrap_or_else(|| Local::now().date_naive());
    let arrival = today + Duration::days(args.lead_days);
    let service = demo_service(today)?;
    let operator = Actor::operator("harbourmaster-westhaven", WESTHAVEN);

    println!("BoatiesMate booking demo ({today})");

    println!("\nCompliance checks");
    for (vessel, marina) in [(1, WESTHAVEN), (2, WESTHAVEN), (3, WESTHAVEN), (3, BAYSWATER)] {
        let result = service.check_compliance(VesselId(vessel), marina)?;
        print!("- vessel {vessel} at marina {marina}: ");
        render_compliance(&result);
    }

    println!("\nBooking requests");
    let stay = |days: i64, nights: i64| {
        let start = arrival + Duration::days(days);
        (start, start + Duration::days(nights))
    };

    let (start, end) = stay(0, 7);
    show_request(&service, "Weka on A Pier 1", request(3, 101, start, end))?;
    show_request(&service, "Kotare on A Pier 1", request(1, 101, start, end))?;
    let kotare = show_request(&service, "Kotare on A Pier 2", request(1, 102, start, end))?;
    let (start, end) = stay(3, 2);
    let tui = show_request(&service, "Tui on A Pier 2", request(2, 102, start, end))?;

    println!("\nOperator decisions");
    if let Some(id) = kotare {
        show_approval(&service, id, &operator)?;
    }
    if let Some(id) = tui {
        show_approval(&service, id, &operator)?;
        match service.decline(id, &operator, Some("Berth taken for those dates".to_string()))? {
            DeclineOutcome::Declined(booking) => println!(
                "- booking {id} declined: {}",
                booking.decline_reason.unwrap_or_default()
            ),
            DeclineOutcome::AlreadyDecided { status, .. } => {
                println!("- booking {id} is already {status}")
            }
        }
    }

    println!("\nRetrying after approval");
    let (start, end) = stay(3, 2);
    show_request(&service, "Tui on A Pier 2", request(2, 102, start, end))?;

    println!("\nOperator inbox (all statuses)");
    let inbox = service.inbox(
        WESTHAVEN,
        &InboxQuery {
            status: InboxStatus::All,
            ..InboxQuery::default()
        },
    )?;
    for booking in &inbox.results {
        println!(
            "- booking {} | vessel {} | mooring {} | {} to {} | {}",
            booking.id,
            booking.vessel_id,
            booking.mooring_id,
            booking.start_date,
            booking.end_date,
            booking.status
        );
    }

    Ok(())
}

fn request(vessel: u64, mooring: u64, start: NaiveDate, end: NaiveDate) -> BookingRequest {
    BookingRequest {
        owner_id: None,
        vessel_id: VesselId(vessel),
        mooring_id: MooringId(mooring),
        start_date: start,
        end_date: end,
        notes: None,
    }
}

fn show_request(
    service: &DemoService,
    label: &str,
    request: BookingRequest,
) -> Result<Option<BookingId>, AppError> {
    let (start, end) = (request.start_date, request.end_date);
    print!("- {label} ({start} to {end}): ");
    match service.request(request)? {
        BookingOutcome::Created(booking) => {
            println!("created booking {} ({})", booking.id, booking.status);
            Ok(Some(booking.id))
        }
        BookingOutcome::ComplianceBlocked(result) => {
            render_compliance(&result);
            Ok(None)
        }
        BookingOutcome::Unsuitable {
            reasons,
            alternatives,
        } => {
            println!("unsuitable ({})", reasons.join("; "));
            render_alternatives(&alternatives);
            Ok(None)
        }
        BookingOutcome::Unavailable {
            conflicts,
            alternatives,
            ..
        } => {
            let ids: Vec<String> = conflicts.iter().map(|c| c.id.to_string()).collect();
            println!("unavailable (conflicts with {})", ids.join(", "));
            render_alternatives(&alternatives);
            Ok(None)
        }
    }
}

fn show_approval(service: &DemoService, id: BookingId, actor: &Actor) -> Result<(), AppError> {
    match service.approve(id, actor, None)? {
        ApprovalOutcome::Approved(booking) => println!(
            "- booking {id} approved by {}",
            booking.decision_by_user_id.unwrap_or_default()
        ),
        ApprovalOutcome::AlreadyDecided { status, .. } => {
            println!("- booking {id} is already {status}")
        }
        ApprovalOutcome::Blocked {
            intel,
            alternatives,
        } => {
            println!("- booking {id} blocked: {}", intel.summary());
            render_alternatives(&alternatives);
        }
    }
    Ok(())
}

fn render_compliance(result: &ComplianceResult) {
    if result.eligible_to_book {
        println!("eligible ({} warnings)", result.warnings.len());
    } else {
        println!("not eligible");
    }
    for issue in result.blocking_issues.iter().chain(&result.warnings) {
        println!("    {}: {}", issue.doc_type, issue.message);
    }
}

fn render_alternatives(alternatives: &[RankedAlternative]) {
    if alternatives.is_empty() {
        println!("    no alternatives free for those dates");
        return;
    }
    for alternative in alternatives {
        println!(
            "    alternative {} {} (score {})",
            alternative.mooring_id, alternative.name, alternative.score
        );
    }
}
