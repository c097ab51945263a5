use std::fs;
use std::path::{Path, PathBuf};

use aera_core::AppError;

use crate::models::CacheFile;

/// File-backed purchase-row cache, one JSON file per wallet key.
///
/// This is the persistence layer behind "instant rows on revisit": rows are
/// written after every successful fetch and read once at startup. A missing
/// or corrupt file is treated as an empty cache, never an error.
#[derive(Debug, Clone)]
pub struct PurchaseCache {
    dir: PathBuf,
}

impl PurchaseCache {
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, AppError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| AppError::Storage(e.to_string()))?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let safe: String = key
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        self.dir.join(format!("purchases-{safe}.json"))
    }

    /// Load the cached entry for `key`, if one exists and parses.
    pub fn load(&self, key: &str) -> Option<CacheFile> {
        let path = self.path_for(key);
        let raw = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&raw) {
            Ok(file) => Some(file),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Ignoring corrupt cache file");
                None
            }
        }
    }

    /// Persist `entry` under `key`, replacing any previous entry.
    ///
    /// Written to a sibling temp file first, then renamed into place, so a
    /// crash mid-write never leaves a truncated cache behind.
    pub fn store(&self, key: &str, entry: &CacheFile) -> Result<(), AppError> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");

        let json = serde_json::to_string(entry).map_err(|e| AppError::Storage(e.to_string()))?;
        fs::write(&tmp, json).map_err(|e| AppError::Storage(e.to_string()))?;
        fs::rename(&tmp, &path).map_err(|e| AppError::Storage(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PurchaseRecord;

    fn record() -> PurchaseRecord {
        PurchaseRecord {
            buyer: "0xAbCd111111111111111111111111111111111111".into(),
            amount_paid: "100000000".into(),
            tokens_bought: "2000000000000000000000".into(),
            tx_hash: "0x3333333333333333333333333333333333333333333333333333333333333333"
                .into(),
            block_number: 10,
            log_index: 0,
            timestamp: 1_700_000_000,
        }
    }

    #[test]
    fn stores_and_loads_per_key() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PurchaseCache::new(dir.path()).unwrap();

        let entry = CacheFile::new(vec![record()]);
        cache.store("0xAbCd", &entry).unwrap();

        let loaded = cache.load("0xabcd").unwrap(); // key is case-insensitive
        assert_eq!(loaded.rows, entry.rows);
        assert!(cache.load("0xother").is_none());
    }

    #[test]
    fn corrupt_files_read_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PurchaseCache::new(dir.path()).unwrap();

        std::fs::write(dir.path().join("purchases-0xabcd.json"), "{not json").unwrap();
        assert!(cache.load("0xAbCd").is_none());
    }
}
