use alloy::providers::Provider;
use alloy::rpc::types::{Filter, Log};

use aera_core::AppError;

use crate::provider::IcoProvider;

/// Chunks never shrink below this many blocks.
const MIN_CHUNK: u64 = 1_000;

/// A scan aborts after this many chunk-level failures instead of walking
/// (and shrinking) forever.
const MAX_CHUNK_FAILURES: u32 = 25;

/// Wide-range event-log fetcher with sequential chunked fallback.
///
/// The fast path is a single `eth_getLogs` over the whole range. Providers
/// commonly reject ranges wider than their configured maximum; the fallback
/// walks the range in fixed-size chunks, halving the chunk size whenever a
/// chunk itself fails with a range-shaped error.
pub struct LogScanner {
    provider: IcoProvider,
    chunk_size: u64,
}

impl LogScanner {
    pub fn new(provider: IcoProvider, chunk_size: u64) -> Self {
        Self {
            provider,
            chunk_size: chunk_size.max(MIN_CHUNK),
        }
    }

    /// Fetch all logs matching `filter` in `[from_block, to_block]`.
    ///
    /// `filter` carries the address/topic constraints; the block range is
    /// applied here.
    pub async fn fetch(
        &self,
        filter: &Filter,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<Log>, AppError> {
        if from_block > to_block {
            return Ok(Vec::new());
        }

        let wide = filter.clone().from_block(from_block).to_block(to_block);
        match self.provider.get_logs(&wide).await {
            Ok(logs) => return Ok(logs),
            Err(e) => {
                tracing::debug!(
                    from = from_block,
                    to = to_block,
                    error = %e,
                    "Wide getLogs rejected, falling back to chunked scan"
                );
            }
        }

        self.fetch_chunked(filter, from_block, to_block).await
    }

    async fn fetch_chunked(
        &self,
        filter: &Filter,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<Log>, AppError> {
        let mut all = Vec::new();
        let mut chunk = self.chunk_size;
        let mut cursor = from_block;
        let mut failures = 0u32;

        while cursor <= to_block {
            let end = chunk_end(cursor, chunk, to_block);
            let f = filter.clone().from_block(cursor).to_block(end);

            match self.provider.get_logs(&f).await {
                Ok(mut logs) => {
                    all.append(&mut logs);
                    if end == to_block {
                        break;
                    }
                    cursor = end + 1;
                }
                Err(e) => {
                    failures += 1;
                    if failures > MAX_CHUNK_FAILURES {
                        return Err(AppError::Rpc(format!(
                            "log scan aborted after {failures} chunk failures: {e}"
                        )));
                    }

                    let msg = e.to_string();
                    if is_range_error(&msg) && chunk > MIN_CHUNK {
                        chunk = shrink_chunk(chunk);
                        tracing::debug!(chunk, "Provider rejected chunk range, shrinking");
                        continue; // retry the same cursor with a smaller chunk
                    }

                    // Other chunk errors are skipped; the scan keeps going.
                    tracing::warn!(from = cursor, to = end, error = %msg, "Chunk failed, skipping");
                    if end == to_block {
                        break;
                    }
                    cursor = end + 1;
                }
            }
        }

        Ok(all)
    }
}

/// Inclusive end block for a chunk starting at `cursor`.
fn chunk_end(cursor: u64, chunk: u64, to_block: u64) -> u64 {
    cursor.saturating_add(chunk - 1).min(to_block)
}

/// Halve a chunk size, floored at [`MIN_CHUNK`].
fn shrink_chunk(chunk: u64) -> u64 {
    (chunk / 2).max(MIN_CHUNK)
}

/// Provider phrasing for "your block range is too wide" varies; match the
/// common ones.
fn is_range_error(msg: &str) -> bool {
    let m = msg.to_lowercase();
    m.contains("block range")
        || m.contains("too wide")
        || m.contains("too large")
        || m.contains("exceed")
        || m.contains("limited to")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_ends_are_inclusive_and_clamped() {
        assert_eq!(chunk_end(0, 5_000, 10_000), 4_999);
        assert_eq!(chunk_end(5_000, 5_000, 10_000), 9_999);
        assert_eq!(chunk_end(10_000, 5_000, 10_000), 10_000);
    }

    #[test]
    fn covers_a_range_in_sequential_chunks() {
        // 10,000 blocks with 5,000-block chunks → exactly two spans.
        let (from, to, chunk) = (0u64, 9_999u64, 5_000u64);
        let mut spans = Vec::new();
        let mut cursor = from;
        while cursor <= to {
            let end = chunk_end(cursor, chunk, to);
            spans.push((cursor, end));
            if end == to {
                break;
            }
            cursor = end + 1;
        }
        assert_eq!(spans, vec![(0, 4_999), (5_000, 9_999)]);
    }

    #[test]
    fn shrinks_to_a_floor() {
        assert_eq!(shrink_chunk(80_000), 40_000);
        assert_eq!(shrink_chunk(1_500), 1_000);
        assert_eq!(shrink_chunk(1_000), 1_000);
    }

    #[test]
    fn recognizes_range_errors() {
        assert!(is_range_error("query returned more than 10000 results, block range too wide"));
        assert!(is_range_error("eth_getLogs is limited to 5000 blocks"));
        assert!(is_range_error("block range exceeds maximum"));
        assert!(!is_range_error("connection reset by peer"));
    }
}
