use serde::{Deserialize, Serialize};

/// One cached purchase row.
///
/// Amounts are 256-bit integers serialized as decimal strings — JSON numbers
/// would round-trip through floats and lose precision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseRecord {
    pub buyer: String,
    pub amount_paid: String,
    pub tokens_bought: String,
    pub tx_hash: String,
    pub block_number: u64,
    pub log_index: u64,
    pub timestamp: u64,
}

/// On-disk shape of one cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheFile {
    pub rows: Vec<PurchaseRecord>,
    /// Unix millis when this entry was written.
    pub saved_at: i64,
}

impl CacheFile {
    pub fn new(rows: Vec<PurchaseRecord>) -> Self {
        Self {
            rows,
            saved_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amounts_round_trip_as_decimal_strings() {
        let record = PurchaseRecord {
            buyer: "0x1111111111111111111111111111111111111111".into(),
            amount_paid: "123456789012345678901234".into(),
            tokens_bought: "2000000000000000000000".into(),
            tx_hash: "0x2222222222222222222222222222222222222222222222222222222222222222"
                .into(),
            block_number: 73_858_251,
            log_index: 4,
            timestamp: 1_700_000_000,
        };

        let json = serde_json::to_string(&record).unwrap();
        let back: PurchaseRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
        // The amount survives verbatim, digit for digit.
        assert!(json.contains("\"123456789012345678901234\""));
    }
}
