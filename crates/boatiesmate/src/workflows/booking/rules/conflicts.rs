use super::super::domain::{Booking, BookingId, BookingStatus, MooringId};
use super::super::range::TimeRange;

/// Bookings on `mooring_id` whose status is in `blocking` and whose range overlaps
/// `range`, skipping `exclude`.
///
/// A booking with unreadable dates always counts as a conflict.
pub fn find_conflicts<'a>(
    ledger: &'a [Booking],
    mooring_id: MooringId,
    range: &TimeRange,
    blocking: &[BookingStatus],
    exclude: Option<BookingId>,
) -> Vec<&'a Booking> {
    ledger
        .iter()
        .filter(|booking| Some(booking.id) != exclude)
        .filter(|booking| booking.mooring_id == mooring_id)
        .filter(|booking| blocking.contains(&booking.status))
        .filter(|booking| match booking.range() {
            Some(existing) => existing.overlaps(range),
            None => true,
        })
        .collect()
}
