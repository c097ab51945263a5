use std::collections::HashSet;

use alloy::primitives::B256;

use crate::blocks::BlockTimestampCache;
use crate::decoder::{PurchaseRow, TransferRow, WithdrawalRow};
use crate::provider::IcoProvider;

/// Row types produced from event logs share these positional accessors.
pub trait EventRow {
    fn tx_hash(&self) -> B256;
    fn block_number(&self) -> u64;
    fn log_index(&self) -> u64;
    fn set_timestamp(&mut self, ts: u64);
}

macro_rules! impl_event_row {
    ($ty:ty) => {
        impl EventRow for $ty {
            fn tx_hash(&self) -> B256 {
                self.tx_hash
            }
            fn block_number(&self) -> u64 {
                self.block_number
            }
            fn log_index(&self) -> u64 {
                self.log_index
            }
            fn set_timestamp(&mut self, ts: u64) {
                self.timestamp = ts;
            }
        }
    };
}

impl_event_row!(PurchaseRow);
impl_event_row!(TransferRow);
impl_event_row!(WithdrawalRow);

/// Deduplicate by `(tx hash, log index)`, sort newest-first (block number
/// descending, log index descending within a block), truncate to `limit`.
///
/// Deterministic for any input order, and idempotent.
pub fn finalize_rows<T: EventRow>(rows: Vec<T>, limit: usize) -> Vec<T> {
    let mut seen: HashSet<(B256, u64)> = HashSet::with_capacity(rows.len());
    let mut out: Vec<T> = rows
        .into_iter()
        .filter(|r| seen.insert((r.tx_hash(), r.log_index())))
        .collect();

    out.sort_by(|a, b| {
        b.block_number()
            .cmp(&a.block_number())
            .then(b.log_index().cmp(&a.log_index()))
    });
    out.truncate(limit);
    out
}

/// Attach block timestamps to the surviving rows via the read-through cache.
///
/// Only cache misses hit the RPC, bounded by `concurrency`. Rows whose block
/// lookup failed keep the zero sentinel.
pub async fn enrich_timestamps<T: EventRow>(
    cache: &BlockTimestampCache,
    provider: &IcoProvider,
    rows: &mut [T],
    concurrency: usize,
) {
    let blocks: Vec<u64> = rows.iter().map(|r| r.block_number()).collect();
    cache.fill(provider, &blocks, concurrency).await;

    for row in rows.iter_mut() {
        row.set_timestamp(cache.get(row.block_number()).unwrap_or(0));
    }
}

/// Distinct buyers among the surviving purchase rows.
pub fn investor_count(rows: &[PurchaseRow]) -> usize {
    rows.iter().map(|r| r.buyer).collect::<HashSet<_>>().len()
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{Address, U256};

    use super::*;

    fn row(tx: u8, block: u64, log_index: u64) -> PurchaseRow {
        PurchaseRow {
            buyer: Address::with_last_byte(tx),
            amount_paid: U256::from(100u64),
            tokens_bought: U256::from(2_000u64),
            tx_hash: B256::with_last_byte(tx),
            block_number: block,
            log_index,
            timestamp: 0,
        }
    }

    #[test]
    fn dedupes_by_tx_hash_and_log_index() {
        let rows = vec![row(1, 10, 0), row(1, 10, 0), row(1, 10, 1), row(2, 11, 0)];
        let out = finalize_rows(rows, 50);

        assert_eq!(out.len(), 3);
        let mut keys: Vec<(B256, u64)> = out.iter().map(|r| (r.tx_hash, r.log_index)).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), 3);
    }

    #[test]
    fn sorts_newest_first_with_log_index_tiebreak() {
        let rows = vec![row(1, 5, 0), row(2, 9, 1), row(3, 9, 4), row(4, 12, 0)];
        let out = finalize_rows(rows, 50);

        for pair in out.windows(2) {
            let newer = &pair[0];
            let older = &pair[1];
            assert!(
                newer.block_number > older.block_number
                    || (newer.block_number == older.block_number
                        && newer.log_index >= older.log_index)
            );
        }
        assert_eq!(out[0].block_number, 12);
        assert_eq!(out[1].log_index, 4);
    }

    #[test]
    fn truncates_to_limit() {
        let rows = (0..20u64).map(|i| row(i as u8, i, 0)).collect();
        assert_eq!(finalize_rows::<PurchaseRow>(rows, 7).len(), 7);
    }

    #[test]
    fn idempotent_for_any_input_order() {
        let rows = vec![row(3, 9, 4), row(1, 5, 0), row(4, 12, 0), row(2, 9, 1)];
        let mut shuffled = rows.clone();
        shuffled.reverse();

        let a = finalize_rows(rows, 50);
        let b = finalize_rows(shuffled, 50);
        let c = finalize_rows(a.clone(), 50);
        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn counts_distinct_buyers() {
        let mut rows = vec![row(1, 5, 0), row(2, 6, 0), row(3, 7, 0)];
        rows[2].buyer = rows[0].buyer;
        assert_eq!(investor_count(&rows), 2);
    }
}
