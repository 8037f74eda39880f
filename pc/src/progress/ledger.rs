//! Per-filter, per-rank table of last-known percentages

use std::collections::BTreeMap;

use tracing::debug;

use crate::domain::{FilterId, Rank};

/// Marks a slot that has not reported in the current window
pub const STALE_PERCENT: u8 = 200;

/// Highest valid percentage
pub const MAX_PERCENT: u8 = 100;

/// Last-known progress of every `(filter, rank)` pair
///
/// Rows grow to fit the highest rank seen, or start at the process count when
/// one was given. Filters iterate in id order, so ties in `min_progress` go to
/// the lowest `FilterId`.
#[derive(Debug, Clone, Default)]
pub struct ProgressLedger {
    rows: BTreeMap<FilterId, Vec<u8>>,
    ranks: usize,
}

impl ProgressLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ledger whose rows are pre-sized for `num_processes` ranks
    pub fn with_ranks(num_processes: usize) -> Self {
        debug!(%num_processes, "ProgressLedger::with_ranks: called");
        Self {
            rows: BTreeMap::new(),
            ranks: num_processes,
        }
    }

    /// Mark every tracked slot stale
    pub fn reset(&mut self) {
        debug!(filters = self.rows.len(), "ProgressLedger::reset: called");
        for row in self.rows.values_mut() {
            row.fill(STALE_PERCENT);
        }
    }

    /// Store `percent` for `filter` at `rank`, overwriting any earlier value
    ///
    /// Values above 100 are clamped so a report can never collide with the
    /// stale marker.
    pub fn record_local(&mut self, filter: FilterId, rank: Rank, percent: u8) {
        let percent = percent.min(MAX_PERCENT);
        debug!(%filter, %rank, %percent, "ProgressLedger::record_local: called");

        let row = self.rows.entry(filter).or_default();
        let needed = self.ranks.max(rank.index() + 1);
        if row.len() < needed {
            row.resize(needed, STALE_PERCENT);
        }
        row[rank.index()] = percent;
    }

    /// Lowest non-stale value and the filter that owns it, or `None` if
    /// nothing reported since the last reset
    pub fn min_progress(&self) -> Option<(FilterId, u8)> {
        let mut best: Option<(FilterId, u8)> = None;
        for (&filter, row) in &self.rows {
            for &percent in row.iter().filter(|&&p| p != STALE_PERCENT) {
                match best {
                    Some((_, current)) if current <= percent => {}
                    _ => best = Some((filter, percent)),
                }
            }
        }
        best
    }

    /// Current value for one slot, if it reported this window
    pub fn get(&self, filter: FilterId, rank: Rank) -> Option<u8> {
        self.rows
            .get(&filter)
            .and_then(|row| row.get(rank.index()))
            .copied()
            .filter(|&p| p != STALE_PERCENT)
    }

    pub fn filter_count(&self) -> usize {
        self.rows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_ledger_has_no_data() {
        assert_eq!(ProgressLedger::new().min_progress(), None);
    }

    #[test]
    fn test_reset_then_min_is_no_data() {
        let mut ledger = ProgressLedger::with_ranks(4);
        ledger.record_local(FilterId(1), Rank(0), 30);
        ledger.record_local(FilterId(2), Rank(3), 80);

        ledger.reset();

        assert_eq!(ledger.min_progress(), None);
        assert_eq!(ledger.filter_count(), 2);
        assert_eq!(ledger.get(FilterId(1), Rank(0)), None);
    }

    #[test]
    fn test_min_across_ranks_and_filters() {
        let mut ledger = ProgressLedger::with_ranks(4);
        ledger.record_local(FilterId(5), Rank(1), 10);
        ledger.record_local(FilterId(5), Rank(2), 40);
        ledger.record_local(FilterId(5), Rank(3), 70);
        ledger.record_local(FilterId(5), Rank(0), 20);
        ledger.record_local(FilterId(6), Rank(0), 15);

        assert_eq!(ledger.min_progress(), Some((FilterId(5), 10)));
    }

    #[test]
    fn test_row_grows_to_fit_rank() {
        let mut ledger = ProgressLedger::new();
        ledger.record_local(FilterId(1), Rank(6), 50);

        assert_eq!(ledger.get(FilterId(1), Rank(6)), Some(50));
        assert_eq!(ledger.get(FilterId(1), Rank(2)), None);
        assert_eq!(ledger.min_progress(), Some((FilterId(1), 50)));
    }

    #[test]
    fn test_later_value_overwrites() {
        let mut ledger = ProgressLedger::new();
        ledger.record_local(FilterId(1), Rank(0), 10);
        ledger.record_local(FilterId(1), Rank(0), 90);

        assert_eq!(ledger.min_progress(), Some((FilterId(1), 90)));
    }

    #[test]
    fn test_out_of_range_percent_is_clamped() {
        let mut ledger = ProgressLedger::new();
        ledger.record_local(FilterId(1), Rank(0), STALE_PERCENT);

        assert_eq!(ledger.get(FilterId(1), Rank(0)), Some(MAX_PERCENT));
    }

    #[test]
    fn test_tie_goes_to_lowest_filter() {
        let mut ledger = ProgressLedger::new();
        ledger.record_local(FilterId(9), Rank(0), 25);
        ledger.record_local(FilterId(2), Rank(1), 25);

        assert_eq!(ledger.min_progress(), Some((FilterId(2), 25)));
    }

    fn records() -> impl Strategy<Value = Vec<(i32, usize, u8)>> {
        prop::collection::vec((0i32..6, 0usize..5, 0u8..=100), 1..24)
    }

    proptest! {
        #[test]
        fn prop_min_is_order_independent(records in records(), seed in any::<u64>()) {
            // Only the last write per slot matters, so dedupe before permuting.
            let mut last = std::collections::BTreeMap::new();
            for &(f, r, p) in &records {
                last.insert((f, r), p);
            }
            let table: Vec<_> = last.into_iter().map(|((f, r), p)| (f, r, p)).collect();

            let mut forward = ProgressLedger::with_ranks(5);
            for &(f, r, p) in &table {
                forward.record_local(FilterId(f), Rank(r), p);
            }

            let mut shuffled = table.clone();
            let len = shuffled.len();
            for i in 0..len {
                let j = (seed as usize).wrapping_mul(i + 7) % len;
                shuffled.swap(i, j);
            }
            let mut permuted = ProgressLedger::with_ranks(5);
            for &(f, r, p) in &shuffled {
                permuted.record_local(FilterId(f), Rank(r), p);
            }

            prop_assert_eq!(forward.min_progress(), permuted.min_progress());
        }

        #[test]
        fn prop_unique_minimum_is_returned(records in records(), low in 0u8..100) {
            let mut ledger = ProgressLedger::new();
            for &(f, r, p) in &records {
                ledger.record_local(FilterId(f), Rank(r), p.max(low + 1));
            }
            ledger.record_local(FilterId(99), Rank(2), low);

            prop_assert_eq!(ledger.min_progress(), Some((FilterId(99), low)));
        }
    }
}
