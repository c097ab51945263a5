//! Aera wallet CLI — signed operations and read queries for the presale.
//!
//! Reads (status, purchases, transfers) only need an RPC endpoint. Writes
//! (buy, transfer, admin operations) sign with the key in `PRIVATE_KEY` and
//! wait for the receipt before printing the explorer link.

use std::process::ExitCode;

use alloy::consensus::BlockHeader;
use alloy::eips::BlockNumberOrTag;
use alloy::primitives::Address;
use alloy::providers::Provider;
use alloy::rpc::types::Filter;
use alloy::sol_types::SolEvent;
use clap::{Parser, Subcommand, ValueEnum};

use aera_chain::{
    Erc20, IcoProvider, LogScanner, PurchaseRow, TokenIco, TransferRow, WithdrawalRow,
    blocks::BlockTimestampCache,
    dashboard,
    decoder::{self, Direction},
    errors,
    explorer::Explorer,
    provider, range,
    rows, sale, tx, units,
};
use aera_core::{Settings, telemetry};
use aera_storage::{CacheFile, PurchaseCache, PurchaseRecord};

#[derive(Parser)]
#[command(name = "aera", about = "Dashboard and wallet operations for the AERA presale")]
struct Cli {
    /// Show raw provider error detail on failures.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the current sale snapshot.
    Status,
    /// List recent purchases, newest first.
    Purchases {
        /// Only purchases made by this wallet (filtered at the RPC level).
        #[arg(long)]
        buyer: Option<Address>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// List sale-token transfers touching a wallet.
    Transfers {
        #[arg(long)]
        wallet: Address,
        #[arg(long, value_enum, default_value = "both")]
        direction: DirectionArg,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Buy sale tokens, spending the given payment-token amount.
    Buy {
        /// Decimal amount of the payment token, e.g. "100" or "12.50".
        amount: String,
    },
    /// Transfer sale tokens to another wallet.
    Transfer { to: Address, amount: String },
    /// Approve the ICO to spend exactly this payment-token amount.
    Approve { amount: String },
    /// Owner and operator operations.
    #[command(subcommand)]
    Admin(AdminCommand),
}

#[derive(Subcommand)]
enum AdminCommand {
    /// Show owner, treasury and contract addresses.
    Info,
    /// List recent token withdrawals from the contract.
    Withdrawals {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Set the token price, in payment-token units per whole token.
    Price { value: String },
    /// Pause the sale.
    Pause,
    /// Resume the sale.
    Unpause,
    /// Set the sale window; a zero bound is open-ended.
    Window {
        #[arg(long, default_value_t = 0)]
        start: u64,
        #[arg(long, default_value_t = 0)]
        end: u64,
    },
    /// Point the ICO at a different sale token.
    SaleToken { address: Address },
    /// Set the treasury wallet.
    Treasury { address: Address },
    /// Grant or revoke an operator/treasurer role.
    Role {
        #[arg(value_enum)]
        role: RoleArg,
        address: Address,
        #[arg(long)]
        revoke: bool,
    },
    /// Withdraw unsold sale tokens from the contract.
    WithdrawTokens { amount: String },
    /// Rescue payment tokens held by the contract.
    RescueUsdt { amount: String },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DirectionArg {
    Sent,
    Received,
    Both,
}

impl From<DirectionArg> for Direction {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Sent => Direction::Sent,
            DirectionArg::Received => Direction::Received,
            DirectionArg::Both => Direction::Both,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RoleArg {
    Operator,
    Treasurer,
}

#[tokio::main]
async fn main() -> ExitCode {
    telemetry::init();
    let cli = Cli::parse();
    let verbose = cli.verbose;

    let settings = match Settings::from_env() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    match run(cli, settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let failure = errors::classify(&format!("{e:#}"));
            eprintln!("error: {failure}");
            if verbose {
                eprintln!("detail: {}", failure.detail);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, settings: Settings) -> eyre::Result<()> {
    let ico: Address = settings
        .ico_address
        .parse()
        .map_err(|_| eyre::eyre!("ICO_ADDRESS is not a valid address"))?;
    let read_provider = provider::create_provider(&settings.rpc_url)?;
    let explorer = Explorer::new(&settings.explorer_url);

    match cli.command {
        Command::Status => status(&read_provider, ico).await,
        Command::Purchases { buyer, limit } => {
            purchases(&read_provider, &settings, ico, &explorer, buyer, limit).await
        }
        Command::Transfers {
            wallet,
            direction,
            limit,
        } => {
            transfers(
                &read_provider,
                &settings,
                ico,
                &explorer,
                wallet,
                direction.into(),
                limit,
            )
            .await
        }
        Command::Buy { amount } => buy(&read_provider, &settings, ico, &explorer, &amount).await,
        Command::Transfer { to, amount } => {
            transfer(&read_provider, &settings, ico, &explorer, to, &amount).await
        }
        Command::Approve { amount } => {
            approve(&read_provider, &settings, ico, &explorer, &amount).await
        }
        Command::Admin(cmd) => admin(&read_provider, &settings, ico, &explorer, cmd).await,
    }
}

/// Wallet provider + signer address, or a clear error if no key is set.
fn wallet(settings: &Settings) -> eyre::Result<(IcoProvider, Address)> {
    let key = settings
        .private_key
        .as_deref()
        .ok_or_else(|| eyre::eyre!("PRIVATE_KEY must be set for write operations"))?;
    let from = provider::signer_address(key)?;
    let p = provider::create_wallet_provider(&settings.rpc_url, key)?;
    Ok((p, from))
}

/// Chain time from the latest block header.
async fn chain_now(provider: &IcoProvider) -> eyre::Result<u64> {
    let block = provider
        .get_block_by_number(BlockNumberOrTag::Latest)
        .await?
        .ok_or_else(|| eyre::eyre!("latest block not found"))?;
    Ok(block.header.timestamp())
}

fn fmt_time(ts: u64) -> String {
    if ts == 0 {
        return units::PLACEHOLDER.to_string();
    }
    chrono::DateTime::from_timestamp(ts as i64, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| units::PLACEHOLDER.to_string())
}

// ─── Read commands ──────────────────────────────────────────────────────────

async fn status(provider: &IcoProvider, ico: Address) -> eyre::Result<()> {
    let snap = dashboard::fetch_snapshot(provider, ico).await?;
    let now = chain_now(provider).await?;

    println!("Sale token     {} ({:#x})", snap.symbol, snap.token_addr);
    println!("Pay token      {} ({:#x})", snap.pay_symbol, snap.pay_token);
    println!(
        "Price          {} {} per {}",
        units::format_amount(Some(snap.price), snap.pay_decimals, 6),
        snap.pay_symbol,
        snap.symbol
    );
    println!(
        "Raised         {} {}",
        units::format_amount(Some(snap.raised), snap.pay_decimals, 2),
        snap.pay_symbol
    );
    println!(
        "Sold           {} {}",
        units::format_amount(Some(snap.total_sold), snap.token_decimals, 2),
        snap.symbol
    );
    println!(
        "Remaining      {} {}",
        units::format_amount(Some(snap.tokens_remaining), snap.token_decimals, 2),
        snap.symbol
    );

    if snap.window_enabled() {
        println!("Window         {} → {}", fmt_time(snap.sale_start), fmt_time(snap.sale_end));
    } else {
        println!("Window         unrestricted");
    }

    let state = if snap.paused {
        "paused"
    } else if snap.sale_active(now) {
        "active"
    } else {
        "inactive (outside window)"
    };
    println!("State          {state}");

    if let Some(pct) = snap.progress_pct() {
        println!("Progress       {pct:.2}%");
    }

    if !snap.price.is_zero() {
        if let Ok(one_pay) = units::parse_units("1", snap.pay_decimals) {
            let rate = sale::tokens_out(one_pay, snap.price, snap.token_decimals);
            println!(
                "Rate           {} {} per 1 {}",
                units::format_amount(Some(rate), snap.token_decimals, 6),
                snap.symbol,
                snap.pay_symbol
            );
        }
    }
    Ok(())
}

async fn admin_info(provider: &IcoProvider, ico: Address, explorer: &Explorer) -> eyre::Result<()> {
    let contract = TokenIco::new(ico, provider.clone());
    let owner = contract.owner().call().await?;
    let treasury = contract.treasury().call().await?;
    let snap = dashboard::fetch_snapshot(provider, ico).await?;

    println!("Contract   {:#x}  {}", ico, explorer.address_url(ico));
    println!("Owner      {:#x}  {}", owner, explorer.address_url(owner));
    println!("Treasury   {:#x}  {}", treasury, explorer.address_url(treasury));
    println!(
        "Sale token {:#x}  {}",
        snap.token_addr,
        explorer.address_url(snap.token_addr)
    );
    println!(
        "Pay token  {:#x}  {}",
        snap.pay_token,
        explorer.address_url(snap.pay_token)
    );
    Ok(())
}

async fn admin_withdrawals(
    provider: &IcoProvider,
    settings: &Settings,
    ico: Address,
    explorer: &Explorer,
    limit: usize,
) -> eyre::Result<()> {
    let snap = dashboard::fetch_snapshot(provider, ico).await?;
    let scanner = LogScanner::new(provider.clone(), settings.fallback_chunk_size);
    let ts_cache = BlockTimestampCache::new();

    let to_block = provider.get_block_number().await?;
    let from_block = range::lookback_range(to_block, settings.lookback_blocks);

    let filter = Filter::new()
        .address(ico)
        .event_signature(TokenIco::TokensWithdrawn::SIGNATURE_HASH);
    let logs = scanner
        .fetch(&filter, from_block, to_block)
        .await
        .map_err(|e| eyre::eyre!(e.to_string()))?;

    let decoded: Vec<WithdrawalRow> = logs
        .iter()
        .filter_map(decoder::decode_withdrawal_log)
        .collect();
    let mut out = rows::finalize_rows(decoded, limit);
    rows::enrich_timestamps(&ts_cache, provider, &mut out, settings.ts_concurrency).await;

    if out.is_empty() {
        println!("No withdrawals found in the last {} blocks.", settings.lookback_blocks);
        return Ok(());
    }

    for row in &out {
        println!(
            "{}  to {}  {} {}  {}",
            fmt_time(row.timestamp),
            units::short_addr(&row.to),
            units::format_amount(Some(row.amount), snap.token_decimals, 2),
            snap.symbol,
            explorer.tx_url(row.tx_hash),
        );
    }
    Ok(())
}

async fn purchases(
    provider: &IcoProvider,
    settings: &Settings,
    ico: Address,
    explorer: &Explorer,
    buyer: Option<Address>,
    limit: usize,
) -> eyre::Result<()> {
    let snap = dashboard::fetch_snapshot(provider, ico).await?;
    let scanner = LogScanner::new(provider.clone(), settings.fallback_chunk_size);
    let ts_cache = BlockTimestampCache::new();
    let cache = PurchaseCache::new(&settings.cache_dir)?;

    let to_block = provider.get_block_number().await?;
    let from_block = range::lookback_range(to_block, settings.lookback_blocks);

    let mut filter = Filter::new()
        .address(ico)
        .event_signature(TokenIco::TokensPurchased::SIGNATURE_HASH);
    if let Some(buyer) = buyer {
        filter = filter.topic1(buyer.into_word());
    }

    let out = match scanner.fetch(&filter, from_block, to_block).await {
        Ok(logs) => {
            let decoded: Vec<PurchaseRow> =
                logs.iter().filter_map(decoder::decode_purchase_log).collect();
            let mut fresh = rows::finalize_rows(decoded, limit);
            rows::enrich_timestamps(&ts_cache, provider, &mut fresh, settings.ts_concurrency)
                .await;

            if let Some(buyer) = buyer {
                let records: Vec<PurchaseRecord> = fresh.iter().map(row_to_record).collect();
                if let Err(e) = cache.store(&format!("{buyer:#x}"), &CacheFile::new(records)) {
                    tracing::warn!(error = %e, "Failed to persist purchase rows");
                }
            }
            fresh
        }
        Err(e) => {
            // Keep showing the last good rows for this wallet, if any.
            let cached = buyer
                .and_then(|b| cache.load(&format!("{b:#x}")))
                .map(|file| file.rows.iter().filter_map(record_to_row).collect::<Vec<_>>())
                .unwrap_or_default();
            if cached.is_empty() {
                return Err(eyre::eyre!(e.to_string()));
            }
            println!("warning: {} — showing cached rows", errors::classify_read(&e.to_string()));
            cached
        }
    };

    if out.is_empty() {
        println!("No purchases found in the last {} blocks.", settings.lookback_blocks);
        return Ok(());
    }

    println!("{} investor(s) in view", rows::investor_count(&out));
    for row in &out {
        println!(
            "{}  {}  {} {} → {} {}  {}",
            fmt_time(row.timestamp),
            units::short_addr(&row.buyer),
            units::format_amount(Some(row.amount_paid), snap.pay_decimals, 2),
            snap.pay_symbol,
            units::format_amount(Some(row.tokens_bought), snap.token_decimals, 2),
            snap.symbol,
            explorer.tx_url(row.tx_hash),
        );
    }
    Ok(())
}

/// Serialize a row for the JSON cache; amounts become decimal strings.
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
        amount_paid: alloy::primitives::U256::from_str_radix(&record.amount_paid, 10).ok()?,
        tokens_bought: alloy::primitives::U256::from_str_radix(&record.tokens_bought, 10).ok()?,
        tx_hash: record.tx_hash.parse().ok()?,
        block_number: record.block_number,
        log_index: record.log_index,
        timestamp: record.timestamp,
    })
}

async fn transfers(
    provider: &IcoProvider,
    settings: &Settings,
    ico: Address,
    explorer: &Explorer,
    wallet: Address,
    direction: Direction,
    limit: usize,
) -> eyre::Result<()> {
    let snap = dashboard::fetch_snapshot(provider, ico).await?;
    let scanner = LogScanner::new(provider.clone(), settings.fallback_chunk_size);
    let ts_cache = BlockTimestampCache::new();

    let to_block = provider.get_block_number().await?;
    let from_block = range::lookback_range(to_block, settings.lookback_blocks);

    let filter = Filter::new()
        .address(snap.token_addr)
        .event_signature(Erc20::Transfer::SIGNATURE_HASH);

    let logs = scanner
        .fetch(&filter, from_block, to_block)
        .await
        .map_err(|e| eyre::eyre!(e.to_string()))?;
    let decoded: Vec<TransferRow> = logs
        .iter()
        .filter_map(decoder::decode_transfer_log)
        .filter(|r| direction.matches(r, wallet))
        .collect();
    let mut out = rows::finalize_rows(decoded, limit);
    rows::enrich_timestamps(&ts_cache, provider, &mut out, settings.ts_concurrency).await;

    if out.is_empty() {
        println!("No transfers found in the last {} blocks.", settings.lookback_blocks);
        return Ok(());
    }

    for row in &out {
        let tag = if row.from == wallet { "sent" } else { "recv" };
        println!(
            "{}  {}  {} → {}  {} {}  {}",
            fmt_time(row.timestamp),
            tag,
            units::short_addr(&row.from),
            units::short_addr(&row.to),
            units::format_amount(Some(row.value), snap.token_decimals, 4),
            snap.symbol,
            explorer.tx_url(row.tx_hash),
        );
    }
    Ok(())
}

// ─── Write commands ─────────────────────────────────────────────────────────

async fn buy(
    read_provider: &IcoProvider,
    settings: &Settings,
    ico: Address,
    explorer: &Explorer,
    amount: &str,
) -> eyre::Result<()> {
    let (wallet_provider, from) = wallet(settings)?;
    let snap = dashboard::fetch_snapshot(read_provider, ico).await?;
    let position = dashboard::fetch_wallet_position(read_provider, &snap, from).await?;
    let now = chain_now(read_provider).await?;

    let pay_amount = units::parse_units(amount, snap.pay_decimals)
        .map_err(|e| eyre::eyre!("invalid amount: {e}"))?;

    let ctx = sale::QuoteContext {
        snapshot: &snap,
        position: &position,
        now,
    };
    let tokens = ctx.validate(pay_amount).map_err(|e| eyre::eyre!(e))?;

    println!(
        "Buying {} {} for {} {} (max spend right now: {} {})",
        units::format_amount(Some(tokens), snap.token_decimals, 2),
        snap.symbol,
        units::format_amount(Some(pay_amount), snap.pay_decimals, 2),
        snap.pay_symbol,
        units::format_amount(Some(ctx.max_spend()), snap.pay_decimals, 2),
        snap.pay_symbol,
    );

    let hash = tx::buy(&wallet_provider, from, ico, snap.pay_token, pay_amount).await?;
    println!("Purchase confirmed: {}", explorer.tx_url(hash));
    Ok(())
}

async fn transfer(
    read_provider: &IcoProvider,
    settings: &Settings,
    ico: Address,
    explorer: &Explorer,
    to: Address,
    amount: &str,
) -> eyre::Result<()> {
    let (wallet_provider, from) = wallet(settings)?;
    let snap = dashboard::fetch_snapshot(read_provider, ico).await?;
    let position = dashboard::fetch_wallet_position(read_provider, &snap, from).await?;

    let value = units::parse_units(amount, snap.token_decimals)
        .map_err(|e| eyre::eyre!("invalid amount: {e}"))?;
    if value.is_zero() {
        eyre::bail!("amount must be greater than zero");
    }
    if position.token_balance < value {
        eyre::bail!(
            "insufficient {} balance: have {}",
            snap.symbol,
            units::format_amount(Some(position.token_balance), snap.token_decimals, 4)
        );
    }

    let hash = tx::transfer_tokens(&wallet_provider, snap.token_addr, to, value).await?;
    println!("Transfer confirmed: {}", explorer.tx_url(hash));
    Ok(())
}

async fn approve(
    read_provider: &IcoProvider,
    settings: &Settings,
    ico: Address,
    explorer: &Explorer,
    amount: &str,
) -> eyre::Result<()> {
    let (wallet_provider, _) = wallet(settings)?;
    let snap = dashboard::fetch_snapshot(read_provider, ico).await?;

    let value = units::parse_units(amount, snap.pay_decimals)
        .map_err(|e| eyre::eyre!("invalid amount: {e}"))?;

    let hash = tx::approve(&wallet_provider, ico, snap.pay_token, value).await?;
    println!("Approval confirmed: {}", explorer.tx_url(hash));
    Ok(())
}

async fn admin(
    read_provider: &IcoProvider,
    settings: &Settings,
    ico: Address,
    explorer: &Explorer,
    cmd: AdminCommand,
) -> eyre::Result<()> {
    // The two read-only admin views don't need a signer.
    match cmd {
        AdminCommand::Info => return admin_info(read_provider, ico, explorer).await,
        AdminCommand::Withdrawals { limit } => {
            return admin_withdrawals(read_provider, settings, ico, explorer, limit).await;
        }
        _ => {}
    }

    let (wallet_provider, _) = wallet(settings)?;
    let snap = dashboard::fetch_snapshot(read_provider, ico).await?;

    let hash = match cmd {
        AdminCommand::Info | AdminCommand::Withdrawals { .. } => unreachable!(),
        AdminCommand::Price { value } => {
            let price = units::parse_units(&value, snap.pay_decimals)
                .map_err(|e| eyre::eyre!("invalid price: {e}"))?;
            if price.is_zero() {
                eyre::bail!("price must be greater than zero");
            }
            tx::update_price(&wallet_provider, ico, price).await?
        }
        AdminCommand::Pause => tx::pause(&wallet_provider, ico).await?,
        AdminCommand::Unpause => tx::unpause(&wallet_provider, ico).await?,
        AdminCommand::Window { start, end } => {
            if start != 0 && end != 0 && end < start {
                eyre::bail!("window end is before its start");
            }
            tx::set_sale_window(&wallet_provider, ico, start, end).await?
        }
        AdminCommand::SaleToken { address } => {
            tx::set_sale_token(&wallet_provider, ico, address).await?
        }
        AdminCommand::Treasury { address } => {
            tx::set_treasury(&wallet_provider, ico, address).await?
        }
        AdminCommand::Role {
            role,
            address,
            revoke,
        } => {
            let role = match role {
                RoleArg::Operator => tx::Role::Operator,
                RoleArg::Treasurer => tx::Role::Treasurer,
            };
            tx::set_role(&wallet_provider, ico, role, address, !revoke).await?
        }
        AdminCommand::WithdrawTokens { amount } => {
            let value = units::parse_units(&amount, snap.token_decimals)
                .map_err(|e| eyre::eyre!("invalid amount: {e}"))?;
            tx::withdraw_tokens(&wallet_provider, ico, value).await?
        }
        AdminCommand::RescueUsdt { amount } => {
            let value = units::parse_units(&amount, snap.pay_decimals)
                .map_err(|e| eyre::eyre!("invalid amount: {e}"))?;
            tx::rescue_usdt(&wallet_provider, ico, value).await?
        }
    };

    println!("Confirmed: {}", explorer.tx_url(hash));
    Ok(())
}
