use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{Actor, BookingId, BookingStatus, MarinaId, MooringId, OwnerId, VesselId};
use super::range::{parse_calendar_date, TimeRange};
use super::repository::{BookingLedger, MarinaDirectory, RepositoryError};
use super::service::{
    ApprovalOutcome, AvailabilityQuery, BookingOutcome, BookingRequest, BookingService,
    BookingServiceError, DeclineOutcome, InboxQuery, InboxSort, InboxStatus, SortDirection,
};

/// Header naming the authenticated operator.
pub const USER_HEADER: &str = "x-user-id";
/// Header carrying the operator's marina scope; absent for administrators.
pub const MARINA_SCOPE_HEADER: &str = "x-marina-scope";

/// Router exposing booking intake, operator decisions, and availability lookups.
pub fn booking_router<L, D>(service: Arc<BookingService<L, D>>) -> Router
where
    L: BookingLedger + 'static,
    D: MarinaDirectory + 'static,
{
    Router::new()
        .route("/api/v1/bookings", post(request_handler::<L, D>))
        .route("/api/v1/bookings/inbox", get(inbox_handler::<L, D>))
        .route("/api/v1/bookings/:booking_id", get(booking_handler::<L, D>))
        .route(
            "/api/v1/bookings/:booking_id/application-pack",
            get(application_pack_handler::<L, D>),
        )
        .route(
            "/api/v1/bookings/:booking_id/decision-intel",
            get(decision_intel_handler::<L, D>),
        )
        .route(
            "/api/v1/bookings/:booking_id/approve",
            post(approve_handler::<L, D>),
        )
        .route(
            "/api/v1/bookings/:booking_id/decline",
            post(decline_handler::<L, D>),
        )
        .route("/api/v1/availability", get(availability_handler::<L, D>))
        .route(
            "/api/v1/moorings/:mooring_id/availability",
            get(mooring_availability_handler::<L, D>),
        )
        .route("/api/v1/compliance/check", get(compliance_handler::<L, D>))
        .with_state(service)
}

/// Status code for a service error.
pub fn error_status(error: &BookingServiceError) -> StatusCode {
    match error {
        BookingServiceError::InvalidRange(_)
        | BookingServiceError::UnknownVessel(_)
        | BookingServiceError::UnknownMooring(_)
        | BookingServiceError::UnknownMarina(_)
        | BookingServiceError::Unresolvable { .. } => StatusCode::BAD_REQUEST,
        BookingServiceError::BookingNotFound(_)
        | BookingServiceError::Repository(RepositoryError::NotFound(_)) => StatusCode::NOT_FOUND,
        BookingServiceError::Forbidden { .. } => StatusCode::FORBIDDEN,
        BookingServiceError::Repository(RepositoryError::AlreadyDecided { .. }) => {
            StatusCode::CONFLICT
        }
        BookingServiceError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(error: BookingServiceError) -> Response {
    let status = error_status(&error);
    let payload = match &error {
        BookingServiceError::Unresolvable { id, reasons } => json!({
            "error": error.to_string(),
            "bookingId": id,
            "reasons": reasons,
        }),
        _ => json!({ "error": error.to_string() }),
    };
    (status, axum::Json(payload)).into_response()
}

fn bad_request(message: impl Into<String>) -> Response {
    let payload = json!({ "error": message.into() });
    (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
}

fn conflict(message: String) -> Response {
    (StatusCode::CONFLICT, axum::Json(json!({ "error": message }))).into_response()
}

fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, Response> {
    let user_id = headers
        .get(USER_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            let payload = json!({ "error": format!("missing {USER_HEADER} header") });
            (StatusCode::UNAUTHORIZED, axum::Json(payload)).into_response()
        })?;

    let marina_scope = match headers.get(MARINA_SCOPE_HEADER) {
        None => None,
        Some(value) => {
            let id = value
                .to_str()
                .ok()
                .and_then(|raw| raw.trim().parse::<u64>().ok())
                .ok_or_else(|| bad_request(format!("invalid {MARINA_SCOPE_HEADER} header")))?;
            Some(MarinaId(id))
        }
    };

    Ok(Actor {
        user_id: user_id.to_string(),
        marina_scope,
    })
}

fn required_date(raw: Option<&str>, field: &str) -> Result<chrono::NaiveDate, Response> {
    raw.and_then(parse_calendar_date)
        .ok_or_else(|| bad_request(format!("{field} must be a valid date (YYYY-MM-DD)")))
}

fn optional_date(raw: Option<&str>, field: &str) -> Result<Option<chrono::NaiveDate>, Response> {
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        None => Ok(None),
        Some(value) => required_date(Some(value), field).map(Some),
    }
}

fn required_range(start: Option<&str>, end: Option<&str>) -> Result<TimeRange, Response> {
    let start = required_date(start, "startDate")?;
    let end = required_date(end, "endDate")?;
    TimeRange::new(start, end).map_err(|err| bad_request(err.to_string()))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingPayload {
    pub owner_id: Option<u64>,
    pub vessel_id: Option<u64>,
    pub mooring_id: Option<u64>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub notes: Option<String>,
}

impl BookingPayload {
    fn into_request(self) -> Result<BookingRequest, Response> {
        let vessel_id = self
            .vessel_id
            .ok_or_else(|| bad_request("vesselId is required"))?;
        let mooring_id = self
            .mooring_id
            .ok_or_else(|| bad_request("mooringId is required"))?;
        let range = required_range(self.start_date.as_deref(), self.end_date.as_deref())?;

        Ok(BookingRequest {
            owner_id: self.owner_id.map(OwnerId),
            vessel_id: VesselId(vessel_id),
            mooring_id: MooringId(mooring_id),
            start_date: range.start(),
            end_date: range.end(),
            notes: self.notes,
        })
    }
}

pub(crate) async fn request_handler<L, D>(
    State(service): State<Arc<BookingService<L, D>>>,
    axum::Json(payload): axum::Json<BookingPayload>,
) -> Response
where
    L: BookingLedger + 'static,
    D: MarinaDirectory + 'static,
{
    let request = match payload.into_request() {
        Ok(request) => request,
        Err(response) => return response,
    };

    match service.request(request) {
        Ok(BookingOutcome::Created(booking)) => {
            (StatusCode::CREATED, axum::Json(booking)).into_response()
        }
        Ok(BookingOutcome::ComplianceBlocked(compliance)) => {
            let payload = json!({
                "error": "COMPLIANCE_NOT_ELIGIBLE",
                "compliance": compliance,
            });
            (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
        }
        Ok(BookingOutcome::Unsuitable {
            reasons,
            alternatives,
        }) => {
            let payload = json!({
                "error": "Vessel is not suitable for this mooring",
                "reasons": reasons,
                "alternatives": alternatives,
            });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        Ok(BookingOutcome::Unavailable {
            mooring_id,
            requested,
            conflicts,
            alternatives,
        }) => {
            let payload = json!({
                "error": "Mooring is not available for the requested dates",
                "mooringId": mooring_id,
                "requested": requested,
                "conflictsWith": conflicts,
                "alternatives": alternatives,
            });
            (StatusCode::CONFLICT, axum::Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn booking_handler<L, D>(
    State(service): State<Arc<BookingService<L, D>>>,
    Path(booking_id): Path<u64>,
) -> Response
where
    L: BookingLedger + 'static,
    D: MarinaDirectory + 'static,
{
    match service.get(BookingId(booking_id)) {
        Ok(booking) => (StatusCode::OK, axum::Json(booking)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn application_pack_handler<L, D>(
    State(service): State<Arc<BookingService<L, D>>>,
    Path(booking_id): Path<u64>,
) -> Response
where
    L: BookingLedger + 'static,
    D: MarinaDirectory + 'static,
{
    match service.application_pack(BookingId(booking_id)) {
        Ok(pack) => (StatusCode::OK, axum::Json(pack)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn decision_intel_handler<L, D>(
    State(service): State<Arc<BookingService<L, D>>>,
    Path(booking_id): Path<u64>,
) -> Response
where
    L: BookingLedger + 'static,
    D: MarinaDirectory + 'static,
{
    match service.decision_intel(BookingId(booking_id)) {
        Ok(intel) => (StatusCode::OK, axum::Json(intel)).into_response(),
        Err(err) => error_response(err),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionPayload {
    #[serde(default, alias = "declineReason")]
    pub reason: Option<String>,
}

pub(crate) async fn approve_handler<L, D>(
    State(service): State<Arc<BookingService<L, D>>>,
    Path(booking_id): Path<u64>,
    headers: HeaderMap,
    payload: Option<axum::Json<DecisionPayload>>,
) -> Response
where
    L: BookingLedger + 'static,
    D: MarinaDirectory + 'static,
{
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let reason = payload.and_then(|axum::Json(body)| body.reason);

    match service.approve(BookingId(booking_id), &actor, reason) {
        Ok(ApprovalOutcome::Approved(booking)) => {
            (StatusCode::OK, axum::Json(booking)).into_response()
        }
        Ok(ApprovalOutcome::AlreadyDecided { status, .. }) => {
            conflict(format!("Booking is already {status}"))
        }
        Ok(ApprovalOutcome::Blocked {
            intel,
            alternatives,
        }) => {
            let status = if intel.status.is_temporary() {
                StatusCode::CONFLICT
            } else {
                StatusCode::UNPROCESSABLE_ENTITY
            };
            let payload = json!({
                "error": intel.summary(),
                "decisionIntel": intel,
                "alternatives": alternatives,
            });
            (status, axum::Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn decline_handler<L, D>(
    State(service): State<Arc<BookingService<L, D>>>,
    Path(booking_id): Path<u64>,
    headers: HeaderMap,
    payload: Option<axum::Json<DecisionPayload>>,
) -> Response
where
    L: BookingLedger + 'static,
    D: MarinaDirectory + 'static,
{
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let reason = payload.and_then(|axum::Json(body)| body.reason);

    match service.decline(BookingId(booking_id), &actor, reason) {
        Ok(DeclineOutcome::Declined(booking)) => {
            (StatusCode::OK, axum::Json(booking)).into_response()
        }
        Ok(DeclineOutcome::AlreadyDecided { status, .. }) => {
            conflict(format!("Booking is already {status}"))
        }
        Err(err) => error_response(err),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboxParams {
    pub marina_id: Option<u64>,
    pub status: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub mooring_id: Option<u64>,
    pub vessel_id: Option<u64>,
    pub owner_id: Option<u64>,
    pub sort: Option<String>,
    pub dir: Option<String>,
    pub limit: Option<usize>,
}

impl InboxParams {
    fn into_query(self) -> Result<InboxQuery, Response> {
        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") | Some("pending") => InboxStatus::Pending,
            Some("approved") => InboxStatus::Approved,
            Some("declined") => InboxStatus::Declined,
            Some("all") => InboxStatus::All,
            Some(other) => return Err(bad_request(format!("unsupported status '{other}'"))),
        };
        let sort = match self.sort.as_deref().map(str::trim) {
            None | Some("") | Some("startDate") => InboxSort::StartDate,
            Some("created") | Some("createdAt") => InboxSort::Created,
            Some(other) => return Err(bad_request(format!("unsupported sort '{other}'"))),
        };
        let direction = match self.dir.as_deref().map(str::trim) {
            Some(dir) if dir.eq_ignore_ascii_case("desc") => SortDirection::Desc,
            _ => SortDirection::Asc,
        };

        Ok(InboxQuery {
            status,
            from: optional_date(self.from.as_deref(), "from")?,
            to: optional_date(self.to.as_deref(), "to")?,
            mooring_id: self.mooring_id.map(MooringId),
            vessel_id: self.vessel_id.map(VesselId),
            owner_id: self.owner_id.map(OwnerId),
            sort,
            direction,
            limit: self.limit,
        })
    }
}

pub(crate) async fn inbox_handler<L, D>(
    State(service): State<Arc<BookingService<L, D>>>,
    headers: HeaderMap,
    Query(params): Query<InboxParams>,
) -> Response
where
    L: BookingLedger + 'static,
    D: MarinaDirectory + 'static,
{
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let Some(marina_id) = params.marina_id.map(MarinaId).or(actor.marina_scope) else {
        return bad_request("marinaId is required");
    };
    if !actor.can_decide_for(marina_id) {
        return error_response(BookingServiceError::Forbidden {
            user_id: actor.user_id,
            marina_id,
        });
    }

    let query = match params.into_query() {
        Ok(query) => query,
        Err(response) => return response,
    };

    match service.inbox(marina_id, &query) {
        Ok(page) => (StatusCode::OK, axum::Json(page)).into_response(),
        Err(err) => error_response(err),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityParams {
    pub marina_id: Option<u64>,
    pub vessel_id: Option<u64>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    /// Comma separated statuses, e.g. `pending,approved`.
    pub block_statuses: Option<String>,
    pub limit: Option<usize>,
}

fn parse_block_statuses(raw: Option<&str>) -> Result<Vec<BookingStatus>, Response> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            BookingStatus::parse(part)
                .ok_or_else(|| bad_request(format!("unsupported blockStatuses value '{part}'")))
        })
        .collect()
}

pub(crate) async fn availability_handler<L, D>(
    State(service): State<Arc<BookingService<L, D>>>,
    Query(params): Query<AvailabilityParams>,
) -> Response
where
    L: BookingLedger + 'static,
    D: MarinaDirectory + 'static,
{
    let (Some(marina_id), Some(vessel_id)) = (params.marina_id, params.vessel_id) else {
        return bad_request("marinaId and vesselId are required");
    };
    let range = match required_range(params.start_date.as_deref(), params.end_date.as_deref()) {
        Ok(range) => range,
        Err(response) => return response,
    };
    let blocking = match parse_block_statuses(params.block_statuses.as_deref()) {
        Ok(blocking) => blocking,
        Err(response) => return response,
    };

    let query = AvailabilityQuery {
        marina_id: MarinaId(marina_id),
        vessel_id: VesselId(vessel_id),
        range,
        blocking,
        limit: params.limit,
    };

    match service.search_availability(query) {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(err) => error_response(err),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeParams {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

pub(crate) async fn mooring_availability_handler<L, D>(
    State(service): State<Arc<BookingService<L, D>>>,
    Path(mooring_id): Path<u64>,
    Query(params): Query<RangeParams>,
) -> Response
where
    L: BookingLedger + 'static,
    D: MarinaDirectory + 'static,
{
    let range = match required_range(params.start_date.as_deref(), params.end_date.as_deref()) {
        Ok(range) => range,
        Err(response) => return response,
    };

    match service.mooring_availability(MooringId(mooring_id), range) {
        Ok(availability) => (StatusCode::OK, axum::Json(availability)).into_response(),
        Err(BookingServiceError::UnknownMooring(id)) => {
            let payload = json!({ "error": format!("mooring {id} not found") });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceParams {
    pub vessel_id: Option<u64>,
    pub marina_id: Option<u64>,
}

pub(crate) async fn compliance_handler<L, D>(
    State(service): State<Arc<BookingService<L, D>>>,
    Query(params): Query<ComplianceParams>,
) -> Response
where
    L: BookingLedger + 'static,
    D: MarinaDirectory + 'static,
{
    let (Some(vessel_id), Some(marina_id)) = (params.vessel_id, params.marina_id) else {
        return bad_request("vesselId and marinaId are required");
    };

    match service.check_compliance(VesselId(vessel_id), MarinaId(marina_id)) {
        Ok(result) => (StatusCode::OK, axum::Json(result)).into_response(),
        Err(err) => error_response(err),
    }
}
