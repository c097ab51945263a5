use alloy::primitives::{Address, B256, U256};
use alloy::providers::PendingTransactionBuilder;

use crate::abi::{Erc20, TokenIco};
use crate::provider::IcoProvider;
use crate::sale;

/// Wait for a submitted transaction to be mined and check its status.
async fn confirm(pending: PendingTransactionBuilder<alloy::network::Ethereum>) -> eyre::Result<B256> {
    let receipt = pending.get_receipt().await?;
    if !receipt.status() {
        eyre::bail!(
            "execution reverted in transaction {:#x}",
            receipt.transaction_hash
        );
    }
    Ok(receipt.transaction_hash)
}

/// Buy sale tokens with `pay_amount` of the payment token.
///
/// Raises the ICO's allowance first when needed. Some ERC-20s (USDT among
/// them) reject changing a non-zero allowance, so a live allowance below the
/// target is reset to zero before the exact-amount approval.
///
/// Returns the hash of the final `buyToken` transaction.
pub async fn buy(
    provider: &IcoProvider,
    from: Address,
    ico: Address,
    pay_token: Address,
    pay_amount: U256,
) -> eyre::Result<B256> {
    let pay = Erc20::new(pay_token, provider.clone());
    let sale_contract = TokenIco::new(ico, provider.clone());

    let allowance = pay.allowance(from, ico).call().await?;
    if sale::needs_approval(allowance, pay_amount) {
        if !allowance.is_zero() {
            tracing::info!(%ico, "Resetting existing allowance to zero");
            confirm(pay.approve(ico, U256::ZERO).send().await?).await?;
        }
        tracing::info!(%ico, amount = %pay_amount, "Approving exact pay amount");
        confirm(pay.approve(ico, pay_amount).send().await?).await?;
    }

    tracing::info!(%ico, amount = %pay_amount, "Submitting buyToken");
    confirm(sale_contract.buyToken(pay_amount).send().await?).await
}

/// Approve the ICO to spend exactly `amount` of the payment token.
pub async fn approve(
    provider: &IcoProvider,
    ico: Address,
    pay_token: Address,
    amount: U256,
) -> eyre::Result<B256> {
    let pay = Erc20::new(pay_token, provider.clone());
    confirm(pay.approve(ico, amount).send().await?).await
}

/// Transfer sale tokens to another wallet.
pub async fn transfer_tokens(
    provider: &IcoProvider,
    token: Address,
    to: Address,
    amount: U256,
) -> eyre::Result<B256> {
    let erc = Erc20::new(token, provider.clone());
    confirm(erc.transfer(to, amount).send().await?).await
}

// ─── Owner / operator operations ────────────────────────────────────────────

pub async fn update_price(provider: &IcoProvider, ico: Address, new_price: U256) -> eyre::Result<B256> {
    let c = TokenIco::new(ico, provider.clone());
    confirm(c.updateTokenPrice(new_price).send().await?).await
}

pub async fn pause(provider: &IcoProvider, ico: Address) -> eyre::Result<B256> {
    let c = TokenIco::new(ico, provider.clone());
    confirm(c.pause().send().await?).await
}

pub async fn unpause(provider: &IcoProvider, ico: Address) -> eyre::Result<B256> {
    let c = TokenIco::new(ico, provider.clone());
    confirm(c.unpause().send().await?).await
}

/// Set the sale window; either bound may be zero to leave it open.
pub async fn set_sale_window(
    provider: &IcoProvider,
    ico: Address,
    start: u64,
    end: u64,
) -> eyre::Result<B256> {
    let c = TokenIco::new(ico, provider.clone());
    confirm(c.setSaleWindow(start, end).send().await?).await
}

pub async fn set_sale_token(provider: &IcoProvider, ico: Address, token: Address) -> eyre::Result<B256> {
    let c = TokenIco::new(ico, provider.clone());
    confirm(c.setSaleToken(token).send().await?).await
}

pub async fn set_treasury(provider: &IcoProvider, ico: Address, wallet: Address) -> eyre::Result<B256> {
    let c = TokenIco::new(ico, provider.clone());
    confirm(c.setTreasuryWallet(wallet).send().await?).await
}

/// Grantable roles on the ICO contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Operator,
    Treasurer,
}

pub async fn set_role(
    provider: &IcoProvider,
    ico: Address,
    role: Role,
    account: Address,
    enabled: bool,
) -> eyre::Result<B256> {
    let c = TokenIco::new(ico, provider.clone());
    match role {
        Role::Operator => confirm(c.setOperator(account, enabled).send().await?).await,
        Role::Treasurer => confirm(c.setTreasurer(account, enabled).send().await?).await,
    }
}

/// Withdraw unsold sale tokens from the ICO contract.
pub async fn withdraw_tokens(provider: &IcoProvider, ico: Address, amount: U256) -> eyre::Result<B256> {
    let c = TokenIco::new(ico, provider.clone());
    confirm(c.withdrawTokens(amount).send().await?).await
}

/// Rescue payment tokens held by the ICO contract to the treasury.
pub async fn rescue_usdt(provider: &IcoProvider, ico: Address, amount: U256) -> eyre::Result<B256> {
    let c = TokenIco::new(ico, provider.clone());
    confirm(c.rescueUSDT(amount).send().await?).await
}
