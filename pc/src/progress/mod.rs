//! Progress bookkeeping for one update window
//!
//! The `ObjectRegistry` turns an in-process stage into a `FilterId` that every
//! rank agrees on, and the `ProgressLedger` keeps the last value each rank
//! reported for each filter. Neither keeps history across windows.

mod ledger;
mod registry;

pub use ledger::{MAX_PERCENT, ProgressLedger, STALE_PERCENT};
pub use registry::ObjectRegistry;
