//! Physical fit, date conflict, and alternative ranking rules.
//!
//! Every function here is a pure computation over the records it is handed; callers
//! decide which ledger snapshot to pass and which statuses block a range.

mod alternatives;
mod conflicts;
mod suitability;

pub use alternatives::{find_alternatives, AlternativeQuery, RankedAlternative};
pub use conflicts::find_conflicts;
pub use suitability::{check_suitability, SuitabilityCheck};
