use serde::Deserialize;

/// Global application settings loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// BSC JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// Address of the deployed TokenIco presale contract.
    pub ico_address: String,

    /// Block explorer base URL (deep links only, no API calls).
    pub explorer_url: String,

    /// Port for the dashboard API server.
    pub api_port: u16,

    /// Directory for the persisted purchase-row cache.
    pub cache_dir: String,

    /// How many blocks back from the chain head purchase scans look.
    pub lookback_blocks: u64,

    /// Chunk size used when the provider rejects a wide getLogs range.
    pub fallback_chunk_size: u64,

    /// Reuse the last successful fetch for this long before re-issuing RPCs.
    pub refresh_ttl_ms: u64,

    /// Skip refetching unless the head advanced by at least this many blocks.
    pub min_block_delta: u64,

    /// Concurrent in-flight block-timestamp lookups.
    pub ts_concurrency: usize,

    /// Poller tick interval for the API server.
    pub poll_interval_secs: u64,

    /// Signer key for the CLI's write operations. The API never needs it.
    pub private_key: Option<String>,
}

impl Settings {
    /// Load settings from environment variables (with optional `.env` file).
    pub fn from_env() -> eyre::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            rpc_url: std::env::var("RPC_URL")
                .unwrap_or_else(|_| "https://bsc-dataseed.binance.org".into()),
            ico_address: std::env::var("ICO_ADDRESS")
                .map_err(|_| eyre::eyre!("ICO_ADDRESS must be set"))?,
            explorer_url: std::env::var("EXPLORER_URL")
                .unwrap_or_else(|_| "https://bscscan.com".into()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".into())
                .parse()?,
            cache_dir: std::env::var("CACHE_DIR").unwrap_or_else(|_| ".aera-cache".into()),
            lookback_blocks: std::env::var("LOOKBACK_BLOCKS")
                .unwrap_or_else(|_| "500000".into())
                .parse()?,
            fallback_chunk_size: std::env::var("FALLBACK_CHUNK_SIZE")
                .unwrap_or_else(|_| "80000".into())
                .parse()?,
            refresh_ttl_ms: std::env::var("REFRESH_TTL_MS")
                .unwrap_or_else(|_| "25000".into())
                .parse()?,
            min_block_delta: std::env::var("MIN_BLOCK_DELTA")
                .unwrap_or_else(|_| "3".into())
                .parse()?,
            ts_concurrency: std::env::var("TS_CONCURRENCY")
                .unwrap_or_else(|_| "12".into())
                .parse()?,
            poll_interval_secs: std::env::var("POLL_INTERVAL_SECS")
                .unwrap_or_else(|_| "8".into())
                .parse()?,
            private_key: std::env::var("PRIVATE_KEY").ok().filter(|k| !k.is_empty()),
        })
    }
}
