//! Alert decisions: when a report is bad enough to publish, and when the
//! data behind it is too old to trust.

pub mod stalenesses;
pub mod thresholds;
