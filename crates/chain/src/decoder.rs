use alloy::primitives::{Address, B256, U256};
use alloy::rpc::types::Log;

use crate::abi::{Erc20, TokenIco};

/// One on-chain purchase, discovered via a `TokensPurchased` log.
///
/// Immutable once mined; the timestamp comes from the containing block, not
/// the event, and stays [`crate::blocks::TS_UNKNOWN`] until enriched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseRow {
    pub buyer: Address,
    pub amount_paid: U256,
    pub tokens_bought: U256,
    pub tx_hash: B256,
    pub block_number: u64,
    pub log_index: u64,
    pub timestamp: u64,
}

/// One sale-token `Transfer` log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRow {
    pub from: Address,
    pub to: Address,
    pub value: U256,
    pub tx_hash: B256,
    pub block_number: u64,
    pub log_index: u64,
    pub timestamp: u64,
}

/// One `TokensWithdrawn` log (admin withdraw history).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawalRow {
    pub to: Address,
    pub amount: U256,
    pub tx_hash: B256,
    pub block_number: u64,
    pub log_index: u64,
    pub timestamp: u64,
}

/// Which side of a transfer a wallet must appear on to be kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Sent,
    Received,
    Both,
}

impl Direction {
    pub fn matches(&self, row: &TransferRow, wallet: Address) -> bool {
        let sent = row.from == wallet;
        let received = row.to == wallet;
        match self {
            Direction::Sent => sent,
            Direction::Received => received,
            Direction::Both => sent || received,
        }
    }
}

/// Positional fields every row type needs from its raw log.
///
/// Logs missing a block number or transaction hash are dropped — mined logs
/// always carry both. A missing log index only matters for tie-breaking and
/// defaults to 0.
fn log_position(log: &Log) -> Option<(u64, B256, u64)> {
    let block_number = log.block_number?;
    let tx_hash = log.transaction_hash?;
    let log_index = log.log_index.unwrap_or(0);
    Some((block_number, tx_hash, log_index))
}

/// Attempt to decode a log as a TokenIco `TokensPurchased` event.
pub fn decode_purchase_log(log: &Log) -> Option<PurchaseRow> {
    let (block_number, tx_hash, log_index) = log_position(log)?;
    let decoded = log.log_decode::<TokenIco::TokensPurchased>().ok()?;
    let inner = decoded.inner.data;

    Some(PurchaseRow {
        buyer: inner.buyer,
        amount_paid: inner.amountPaid,
        tokens_bought: inner.tokensBought,
        tx_hash,
        block_number,
        log_index,
        timestamp: 0,
    })
}

/// Attempt to decode a log as an ERC-20 `Transfer` event.
pub fn decode_transfer_log(log: &Log) -> Option<TransferRow> {
    let (block_number, tx_hash, log_index) = log_position(log)?;
    let decoded = log.log_decode::<Erc20::Transfer>().ok()?;
    let inner = decoded.inner.data;

    Some(TransferRow {
        from: inner.from,
        to: inner.to,
        value: inner.value,
        tx_hash,
        block_number,
        log_index,
        timestamp: 0,
    })
}

/// Attempt to decode a log as a TokenIco `TokensWithdrawn` event.
pub fn decode_withdrawal_log(log: &Log) -> Option<WithdrawalRow> {
    let (block_number, tx_hash, log_index) = log_position(log)?;
    let decoded = log.log_decode::<TokenIco::TokensWithdrawn>().ok()?;
    let inner = decoded.inner.data;

    Some(WithdrawalRow {
        to: inner.to,
        amount: inner.amount,
        tx_hash,
        block_number,
        log_index,
        timestamp: 0,
    })
}
