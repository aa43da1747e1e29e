use serde::Serialize;

use super::super::domain::{blocking, Booking, BookingStatus, MarinaId, Mooring, MooringId, Vessel};
use super::super::range::TimeRange;
use super::conflicts::find_conflicts;
use super::suitability::check_suitability;

const BASE_SCORE: i64 = 9000;
const HEADROOM_WEIGHT: f64 = 50.0;
const PREFERRED_TYPE_BONUS: i64 = 1000;
const DEFAULT_LIMIT: usize = 10;
const AVAILABLE_REASON: &str = "Suitable and available";

/// Search parameters for substitute moorings within one marina.
#[derive(Debug, Clone, PartialEq)]
pub struct AlternativeQuery {
    pub marina_id: MarinaId,
    pub range: TimeRange,
    pub preferred_type: Option<String>,
    pub exclude_mooring: Option<MooringId>,
    pub blocking: Vec<BookingStatus>,
    pub limit: usize,
}

impl AlternativeQuery {
    pub fn new(marina_id: MarinaId, range: TimeRange) -> Self {
        Self {
            marina_id,
            range,
            preferred_type: None,
            exclude_mooring: None,
            blocking: blocking::APPROVED_ONLY.to_vec(),
            limit: DEFAULT_LIMIT,
        }
    }

    pub fn preferring(mut self, mooring_type: Option<&str>) -> Self {
        self.preferred_type = mooring_type.map(str::to_string);
        self
    }

    pub fn excluding(mut self, mooring_id: MooringId) -> Self {
        self.exclude_mooring = Some(mooring_id);
        self
    }

    pub fn blocking_on(mut self, statuses: &[BookingStatus]) -> Self {
        self.blocking = statuses.to_vec();
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

/// Mooring proposed as a substitute, best first.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedAlternative {
    pub mooring_id: MooringId,
    pub name: String,
    #[serde(rename = "type")]
    pub mooring_type: Option<String>,
    pub max_length_metres: Option<f64>,
    pub max_draft_metres: Option<f64>,
    pub score: i64,
    pub reason: &'static str,
}

/// Rank moorings in `query.marina_id` that fit `vessel` and are free for `query.range`.
///
/// Ties keep pool order.
pub fn find_alternatives(
    pool: &[Mooring],
    ledger: &[Booking],
    vessel: &Vessel,
    query: &AlternativeQuery,
) -> Vec<RankedAlternative> {
    let mut ranked: Vec<RankedAlternative> = pool
        .iter()
        .filter(|mooring| mooring.marina_id == query.marina_id)
        .filter(|mooring| Some(mooring.id) != query.exclude_mooring)
        .filter(|mooring| mooring.is_active())
        .filter(|mooring| check_suitability(Some(vessel), Some(mooring)).passed)
        .filter(|mooring| {
            find_conflicts(ledger, mooring.id, &query.range, &query.blocking, None).is_empty()
        })
        .map(|mooring| RankedAlternative {
            mooring_id: mooring.id,
            name: mooring.name.clone(),
            mooring_type: mooring.mooring_type.clone(),
            max_length_metres: mooring.max_length_metres,
            max_draft_metres: mooring.max_draft_metres,
            score: score(mooring, vessel, query.preferred_type.as_deref()),
            reason: AVAILABLE_REASON,
        })
        .collect();

    ranked.sort_by(|left, right| right.score.cmp(&left.score));
    ranked.truncate(query.limit);
    ranked
}

fn score(mooring: &Mooring, vessel: &Vessel, preferred_type: Option<&str>) -> i64 {
    let length_headroom = headroom(mooring.max_length(), vessel.length());
    let draft_headroom = headroom(mooring.max_draft(), vessel.draft());
    let preferred = match (preferred_type, mooring.mooring_type.as_deref()) {
        (Some(wanted), Some(actual)) if wanted == actual => PREFERRED_TYPE_BONUS,
        _ => 0,
    };

    BASE_SCORE
        .saturating_add(weighted(length_headroom))
        .saturating_add(weighted(draft_headroom))
        .saturating_add(preferred)
}

fn headroom(bound: Option<f64>, value: Option<f64>) -> f64 {
    match (bound, value) {
        (Some(bound), Some(value)) => bound - value,
        _ => 0.0,
    }
}

fn weighted(headroom: f64) -> i64 {
    (headroom * HEADROOM_WEIGHT).round() as i64
}
