//! Aera Dashboard API — serves presale state and purchase history over HTTP.
//!
//! Flow:
//! 1. Connect to the BSC RPC, load any persisted purchase rows
//! 2. Background poller refetches the dashboard snapshot + purchase logs,
//!    throttled by a TTL and a minimum head advance
//! 3. Handlers serve the cached data; a fetch failure never blanks it —
//!    the last good rows stay up with a `stale_error` banner field
//!
//! Forced refreshes (`POST /api/v1/refresh`) park in a depth-one queue, so a
//! refresh requested mid-cycle runs right after the current cycle instead of
//! being silently dropped.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use alloy::primitives::{Address, U256};
use alloy::providers::Provider;
use alloy::rpc::types::Filter;
use alloy::sol_types::SolEvent;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, mpsc};

use aera_chain::{
    DashboardSnapshot, IcoProvider, LogScanner, PurchaseRow, TokenIco, TransferRow,
    blocks::BlockTimestampCache,
    dashboard,
    decoder::{self, Direction},
    errors,
    explorer::Explorer,
    range,
    refresh::RefreshGate,
    rows, units,
};
use aera_core::{Settings, telemetry};
use aera_storage::{CacheFile, PurchaseCache, PurchaseRecord};

/// How many purchase rows the poller keeps cached.
const PURCHASE_LIMIT: usize = 200;

/// Shared application state.
struct AppState {
    provider: IcoProvider,
    scanner: LogScanner,
    ico: Address,
    explorer: Explorer,
    settings: Settings,
    ts_cache: BlockTimestampCache,
    snapshot: RwLock<Option<DashboardSnapshot>>,
    purchases: RwLock<Vec<PurchaseRow>>,
    stale_error: RwLock<Option<String>>,
    chain_now: RwLock<u64>,
    refresh_tx: mpsc::Sender<()>,
}

#[tokio::main]
async fn main() {
    telemetry::init();
    let settings = Settings::from_env().expect("Failed to load settings");

    tracing::info!(rpc = %settings.rpc_url, "Starting Aera Dashboard API");

    let ico: Address = settings
        .ico_address
        .parse()
        .expect("ICO_ADDRESS is not a valid address");

    let provider =
        aera_chain::create_provider(&settings.rpc_url).expect("Failed to create RPC provider");
    let scanner = LogScanner::new(provider.clone(), settings.fallback_chunk_size);
    let cache = PurchaseCache::new(&settings.cache_dir).expect("Failed to open purchase cache");

    // Persisted rows give the dashboard instant history on restart.
    let initial_rows = cache
        .load(&format!("{ico:#x}"))
        .map(|file| file.rows.iter().filter_map(record_to_row).collect::<Vec<_>>())
        .unwrap_or_default();
    if !initial_rows.is_empty() {
        tracing::info!(count = initial_rows.len(), "Restored purchase rows from cache");
    }

    let (refresh_tx, refresh_rx) = mpsc::channel(1);

    let state = Arc::new(AppState {
        provider,
        scanner,
        ico,
        explorer: Explorer::new(&settings.explorer_url),
        ts_cache: BlockTimestampCache::new(),
        snapshot: RwLock::new(None),
        purchases: RwLock::new(initial_rows),
        stale_error: RwLock::new(None),
        chain_now: RwLock::new(0),
        refresh_tx,
        settings,
    });

    tokio::spawn(run_poller(state.clone(), cache, refresh_rx));

    let app = Router::new()
        .route("/api/v1/dashboard", get(get_dashboard))
        .route("/api/v1/purchases", get(list_purchases))
        .route("/api/v1/purchases/:buyer", get(purchases_by_buyer))
        .route("/api/v1/transfers/:wallet", get(list_transfers))
        .route("/api/v1/refresh", post(force_refresh))
        .route("/health", get(health))
        .with_state(state.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], state.settings.api_port));
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

// ─── Background poller ──────────────────────────────────────────────────────

async fn run_poller(state: Arc<AppState>, cache: PurchaseCache, mut force_rx: mpsc::Receiver<()>) {
    let mut gate = RefreshGate::new(
        Duration::from_millis(state.settings.refresh_ttl_ms),
        state.settings.min_block_delta,
    );
    let mut ticker = tokio::time::interval(Duration::from_secs(state.settings.poll_interval_secs));

    loop {
        let forced = tokio::select! {
            _ = ticker.tick() => false,
            req = force_rx.recv() => {
                if req.is_none() {
                    break; // all senders dropped — shutting down
                }
                true
            }
        };

        match refresh_cycle(&state, &cache, &mut gate, forced).await {
            Ok(()) => {}
            Err(e) => {
                tracing::warn!(error = %e, "Refresh cycle failed, keeping cached data");
                let msg = errors::classify_read(&format!("{e:#}"));
                *state.stale_error.write().await = Some(msg);
            }
        }
    }
}

/// One fetch cycle: snapshot + purchase logs, gated by staleness rules.
async fn refresh_cycle(
    state: &AppState,
    cache: &PurchaseCache,
    gate: &mut RefreshGate,
    force: bool,
) -> eyre::Result<()> {
    let to_block = state.provider.get_block_number().await?;
    if gate.should_skip(Instant::now(), to_block, force) {
        return Ok(());
    }

    tracing::debug!(to_block, force, "Refreshing dashboard state");

    let snapshot = dashboard::fetch_snapshot(&state.provider, state.ico).await?;

    let from_block = range::lookback_range(to_block, state.settings.lookback_blocks);
    let filter = Filter::new()
        .address(state.ico)
        .event_signature(TokenIco::TokensPurchased::SIGNATURE_HASH);
    let logs = state.scanner.fetch(&filter, from_block, to_block).await?;

    let decoded: Vec<PurchaseRow> = logs.iter().filter_map(decoder::decode_purchase_log).collect();
    let mut fresh = rows::finalize_rows(decoded, PURCHASE_LIMIT);
    rows::enrich_timestamps(
        &state.ts_cache,
        &state.provider,
        &mut fresh,
        state.settings.ts_concurrency,
    )
    .await;

    // Chain time for sale-window display comes from the head block.
    state.ts_cache.fill(&state.provider, &[to_block], 1).await;
    let head_ts = state.ts_cache.get(to_block).unwrap_or(0);

    let records: Vec<PurchaseRecord> = fresh.iter().map(row_to_record).collect();
    if let Err(e) = cache.store(&format!("{:#x}", state.ico), &CacheFile::new(records)) {
        tracing::warn!(error = %e, "Failed to persist purchase rows");
    }

    *state.snapshot.write().await = Some(snapshot);
    *state.purchases.write().await = fresh;
    *state.chain_now.write().await = head_ts;
    *state.stale_error.write().await = None;
    gate.note_success(Instant::now(), to_block);

    tracing::info!(to_block, "Refresh complete");
    Ok(())
}

// ─── Row <-> record conversion ──────────────────────────────────────────────

fn row_to_record(row: &PurchaseRow) -> PurchaseRecord {
    PurchaseRecord {
        buyer: format!("{:#x}", row.buyer),
        amount_paid: row.amount_paid.to_string(),
        tokens_bought: row.tokens_bought.to_string(),
        tx_hash: format!("{:#x}", row.tx_hash),
        block_number: row.block_number,
        log_index: row.log_index,
        timestamp: row.timestamp,
    }
}

fn record_to_row(record: &PurchaseRecord) -> Option<PurchaseRow> {
    Some(PurchaseRow {
        buyer: record.buyer.parse().ok()?,
        amount_paid: U256::from_str_radix(&record.amount_paid, 10).ok()?,
        tokens_bought: U256::from_str_radix(&record.tokens_bought, 10).ok()?,
        tx_hash: record.tx_hash.parse().ok()?,
        block_number: record.block_number,
        log_index: record.log_index,
        timestamp: record.timestamp,
    })
}

// ─── Query Params ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct PaginationParams {
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct TransferParams {
    limit: Option<usize>,
    direction: Option<String>,
}

// ─── Response Types ─────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ApiResponse<T: Serialize> {
    success: bool,
    data: T,
}

#[derive(Serialize)]
struct DashboardView {
    ico: String,
    token_address: String,
    symbol: String,
    token_decimals: u8,
    pay_token: String,
    pay_symbol: String,
    pay_decimals: u8,
    price: String,
    price_display: String,
    tokens_remaining: String,
    tokens_remaining_display: String,
    raised: String,
    raised_display: String,
    raised_compact: String,
    total_sold: String,
    total_sold_display: String,
    total_sold_compact: String,
    min_buy: String,
    max_buy: String,
    hard_cap_pay: String,
    hard_cap_tokens: String,
    paused: bool,
    sale_start: u64,
    sale_end: u64,
    sale_active: bool,
    progress_pct: Option<f64>,
    stale_error: Option<String>,
}

#[derive(Serialize)]
struct PurchaseView {
    buyer: String,
    buyer_url: String,
    amount_paid: String,
    amount_display: String,
    tokens_bought: String,
    tokens_display: String,
    tx_hash: String,
    tx_url: String,
    block_number: u64,
    timestamp: u64,
}

#[derive(Serialize)]
struct PurchasesData {
    rows: Vec<PurchaseView>,
    investors: usize,
    stale_error: Option<String>,
}

#[derive(Serialize)]
struct TransferView {
    from: String,
    to: String,
    value: String,
    value_display: String,
    tx_hash: String,
    tx_url: String,
    block_number: u64,
    timestamp: u64,
}

fn json_ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        data,
    })
}

fn json_err(msg: &str) -> (StatusCode, Json<ApiResponse<String>>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiResponse {
            success: false,
            data: msg.to_string(),
        }),
    )
}

// ─── Handlers ───────────────────────────────────────────────────────────────

async fn health() -> &'static str {
    "ok"
}

/// GET /api/v1/dashboard — current snapshot of the sale.
async fn get_dashboard(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, Json<ApiResponse<String>>)> {
    let snapshot = state.snapshot.read().await;
    let Some(snap) = snapshot.as_ref() else {
        return Err(json_err("Dashboard not loaded yet"));
    };

    let chain_now = *state.chain_now.read().await;
    let now = if chain_now != 0 { chain_now } else { unix_now() };
    let stale_error = state.stale_error.read().await.clone();

    Ok(json_ok(dashboard_view(snap, now, stale_error)))
}

/// GET /api/v1/purchases — most recent purchases across all buyers.
async fn list_purchases(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> impl IntoResponse {
    let limit = params.limit.unwrap_or(50).min(PURCHASE_LIMIT);
    let snapshot = state.snapshot.read().await;
    let rows = state.purchases.read().await;

    let views: Vec<PurchaseView> = rows
        .iter()
        .take(limit)
        .map(|r| purchase_view(r, snapshot.as_ref(), &state.explorer))
        .collect();

    json_ok(PurchasesData {
        investors: rows::investor_count(&rows),
        rows: views,
        stale_error: state.stale_error.read().await.clone(),
    })
}

/// GET /api/v1/purchases/:buyer — purchases for one wallet, filtered at the
/// RPC level via the event's indexed buyer argument.
async fn purchases_by_buyer(
    State(state): State<Arc<AppState>>,
    Path(buyer): Path<String>,
    Query(params): Query<PaginationParams>,
) -> Result<impl IntoResponse, (StatusCode, Json<ApiResponse<String>>)> {
    let buyer: Address = buyer
        .parse()
        .map_err(|_| json_err("Invalid buyer address"))?;
    let limit = params.limit.unwrap_or(50).min(PURCHASE_LIMIT);

    let to_block = state
        .provider
        .get_block_number()
        .await
        .map_err(|e| json_err(&errors::classify_read(&e.to_string())))?;
    let from_block = range::lookback_range(to_block, state.settings.lookback_blocks);

    let filter = Filter::new()
        .address(state.ico)
        .event_signature(TokenIco::TokensPurchased::SIGNATURE_HASH)
        .topic1(buyer.into_word());

    let logs = state
        .scanner
        .fetch(&filter, from_block, to_block)
        .await
        .map_err(|e| json_err(&errors::classify_read(&e.to_string())))?;

    let decoded: Vec<PurchaseRow> = logs.iter().filter_map(decoder::decode_purchase_log).collect();
    let mut fresh = rows::finalize_rows(decoded, limit);
    rows::enrich_timestamps(
        &state.ts_cache,
        &state.provider,
        &mut fresh,
        state.settings.ts_concurrency,
    )
    .await;

    let snapshot = state.snapshot.read().await;
    let views: Vec<PurchaseView> = fresh
        .iter()
        .map(|r| purchase_view(r, snapshot.as_ref(), &state.explorer))
        .collect();

    Ok(json_ok(PurchasesData {
        investors: rows::investor_count(&fresh),
        rows: views,
        stale_error: None,
    }))
}

/// GET /api/v1/transfers/:wallet — sale-token transfers touching a wallet.
async fn list_transfers(
    State(state): State<Arc<AppState>>,
    Path(wallet): Path<String>,
    Query(params): Query<TransferParams>,
) -> Result<impl IntoResponse, (StatusCode, Json<ApiResponse<String>>)> {
    let wallet: Address = wallet
        .parse()
        .map_err(|_| json_err("Invalid wallet address"))?;
    let limit = params.limit.unwrap_or(10).min(PURCHASE_LIMIT);
    let direction = match params.direction.as_deref() {
        None | Some("both") => Direction::Both,
        Some("sent") => Direction::Sent,
        Some("received") => Direction::Received,
        Some(_) => return Err(json_err("direction must be sent, received or both")),
    };

    let token = {
        let snapshot = state.snapshot.read().await;
        match snapshot.as_ref() {
            Some(s) => s.token_addr,
            None => return Err(json_err("Dashboard not loaded yet")),
        }
    };

    let to_block = state
        .provider
        .get_block_number()
        .await
        .map_err(|e| json_err(&errors::classify_read(&e.to_string())))?;
    let from_block = range::lookback_range(to_block, state.settings.lookback_blocks);

    let filter = Filter::new()
        .address(token)
        .event_signature(aera_chain::Erc20::Transfer::SIGNATURE_HASH);

    let logs = state
        .scanner
        .fetch(&filter, from_block, to_block)
        .await
        .map_err(|e| json_err(&errors::classify_read(&e.to_string())))?;

    let decoded: Vec<TransferRow> = logs
        .iter()
        .filter_map(decoder::decode_transfer_log)
        .filter(|r| direction.matches(r, wallet))
        .collect();
    let mut fresh = rows::finalize_rows(decoded, limit);
    rows::enrich_timestamps(
        &state.ts_cache,
        &state.provider,
        &mut fresh,
        state.settings.ts_concurrency,
    )
    .await;

    let snapshot = state.snapshot.read().await;
    let token_decimals = snapshot.as_ref().map(|s| s.token_decimals).unwrap_or(18);
    let views: Vec<TransferView> = fresh
        .iter()
        .map(|r| TransferView {
            from: format!("{:#x}", r.from),
            to: format!("{:#x}", r.to),
            value: r.value.to_string(),
            value_display: units::format_amount(Some(r.value), token_decimals, 4),
            tx_hash: format!("{:#x}", r.tx_hash),
            tx_url: state.explorer.tx_url(r.tx_hash),
            block_number: r.block_number,
            timestamp: r.timestamp,
        })
        .collect();

    Ok(json_ok(views))
}

/// POST /api/v1/refresh — force a refetch, bypassing the staleness guards.
///
/// If a cycle is already running the request parks in the depth-one queue;
/// it is never dropped on the floor.
async fn force_refresh(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.refresh_tx.try_send(()) {
        Ok(()) => json_ok("refresh queued".to_string()),
        // The single pending slot is taken: a refresh is already on its way.
        Err(_) => json_ok("refresh already pending".to_string()),
    }
}

// ─── View builders ──────────────────────────────────────────────────────────

fn dashboard_view(snap: &DashboardSnapshot, now: u64, stale_error: Option<String>) -> DashboardView {
    DashboardView {
        ico: format!("{:#x}", snap.ico),
        token_address: format!("{:#x}", snap.token_addr),
        symbol: snap.symbol.clone(),
        token_decimals: snap.token_decimals,
        pay_token: format!("{:#x}", snap.pay_token),
        pay_symbol: snap.pay_symbol.clone(),
        pay_decimals: snap.pay_decimals,
        price: snap.price.to_string(),
        price_display: units::format_amount(Some(snap.price), snap.pay_decimals, 6),
        tokens_remaining: snap.tokens_remaining.to_string(),
        tokens_remaining_display: units::format_amount(
            Some(snap.tokens_remaining),
            snap.token_decimals,
            2,
        ),
        raised: snap.raised.to_string(),
        raised_display: units::format_amount(Some(snap.raised), snap.pay_decimals, 2),
        raised_compact: units::abbreviate(&units::format_units(snap.raised, snap.pay_decimals)),
        total_sold: snap.total_sold.to_string(),
        total_sold_display: units::format_amount(Some(snap.total_sold), snap.token_decimals, 2),
        total_sold_compact: units::abbreviate(&units::format_units(
            snap.total_sold,
            snap.token_decimals,
        )),
        min_buy: snap.min_buy.to_string(),
        max_buy: snap.max_buy.to_string(),
        hard_cap_pay: snap.hard_cap_pay.to_string(),
        hard_cap_tokens: snap.hard_cap_tokens.to_string(),
        paused: snap.paused,
        sale_start: snap.sale_start,
        sale_end: snap.sale_end,
        sale_active: !snap.paused && snap.sale_active(now),
        progress_pct: snap.progress_pct(),
        stale_error,
    }
}

fn purchase_view(
    row: &PurchaseRow,
    snapshot: Option<&DashboardSnapshot>,
    explorer: &Explorer,
) -> PurchaseView {
    let pay_decimals = snapshot.map(|s| s.pay_decimals).unwrap_or(18);
    let token_decimals = snapshot.map(|s| s.token_decimals).unwrap_or(18);

    PurchaseView {
        buyer: format!("{:#x}", row.buyer),
        buyer_url: explorer.address_url(row.buyer),
        amount_paid: row.amount_paid.to_string(),
        amount_display: units::format_amount(Some(row.amount_paid), pay_decimals, 2),
        tokens_bought: row.tokens_bought.to_string(),
        tokens_display: units::format_amount(Some(row.tokens_bought), token_decimals, 2),
        tx_hash: format!("{:#x}", row.tx_hash),
        tx_url: explorer.tx_url(row.tx_hash),
        block_number: row.block_number,
        timestamp: row.timestamp,
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
