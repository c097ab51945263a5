use std::collections::HashMap;
use std::sync::Mutex;

use alloy::consensus::BlockHeader;
use alloy::eips::BlockNumberOrTag;
use alloy::providers::Provider;
use futures::StreamExt;

use crate::provider::IcoProvider;

/// Sentinel timestamp recorded when a block lookup fails.
pub const TS_UNKNOWN: u64 = 0;

/// Lazily-populated block-number → unix-timestamp map.
///
/// Read-through, process-lifetime. Blocks are immutable once mined, so a
/// value never changes after it is set; racing writers at worst refetch the
/// same timestamp, which is harmless.
#[derive(Debug, Default)]
pub struct BlockTimestampCache {
    inner: Mutex<HashMap<u64, u64>>,
}

impl BlockTimestampCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, block_number: u64) -> Option<u64> {
        self.lock().get(&block_number).copied()
    }

    fn insert(&self, block_number: u64, timestamp: u64) {
        self.lock().insert(block_number, timestamp);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<u64, u64>> {
        // Writes are idempotent, so a poisoned lock is still usable.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Ensure timestamps for `block_numbers` are cached, fetching only the
    /// misses with at most `concurrency` lookups in flight.
    ///
    /// A failed lookup records [`TS_UNKNOWN`] rather than failing the batch.
    pub async fn fill(&self, provider: &IcoProvider, block_numbers: &[u64], concurrency: usize) {
        let mut missing: Vec<u64> = block_numbers
            .iter()
            .copied()
            .filter(|bn| self.get(*bn).is_none())
            .collect();
        missing.sort_unstable();
        missing.dedup();

        if missing.is_empty() {
            return;
        }

        let fetched: Vec<(u64, u64)> = futures::stream::iter(missing)
            .map(|bn| {
                let provider = provider.clone();
                async move { (bn, fetch_timestamp(&provider, bn).await) }
            })
            .buffer_unordered(concurrency.max(1))
            .collect()
            .await;

        for (bn, ts) in fetched {
            self.insert(bn, ts);
        }
    }
}

async fn fetch_timestamp(provider: &IcoProvider, block_number: u64) -> u64 {
    match provider
        .get_block_by_number(BlockNumberOrTag::Number(block_number))
        .await
    {
        Ok(Some(block)) => block.header.timestamp(),
        Ok(None) => {
            tracing::warn!(block = block_number, "Block not found during timestamp lookup");
            TS_UNKNOWN
        }
        Err(e) => {
            tracing::warn!(block = block_number, error = %e, "Timestamp lookup failed");
            TS_UNKNOWN
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_are_read_through_and_stable() {
        let cache = BlockTimestampCache::new();
        assert_eq!(cache.get(100), None);

        cache.insert(100, 1_700_000_000);
        assert_eq!(cache.get(100), Some(1_700_000_000));

        // Idempotent re-insert of the same immutable value.
        cache.insert(100, 1_700_000_000);
        assert_eq!(cache.get(100), Some(1_700_000_000));
    }
}
