use alloy::primitives::{Address, U256};

use crate::abi::{Erc20, TokenIco};
use crate::provider::IcoProvider;

/// Read-only aggregate of ICO contract state at one point in time.
///
/// Refetched wholesale; never mutated locally. All quantities are
/// non-negative by construction. A sale bound of 0 means "unbounded" and a
/// hard cap of 0 means "uncapped" for that dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardSnapshot {
    pub ico: Address,
    pub token_addr: Address,
    pub symbol: String,
    pub token_decimals: u8,
    pub pay_token: Address,
    pub pay_symbol: String,
    pub pay_decimals: u8,
    pub price: U256,
    pub tokens_remaining: U256,
    pub raised: U256,
    pub paused: bool,
    pub sale_start: u64,
    pub sale_end: u64,
    pub hard_cap_pay: U256,
    pub hard_cap_tokens: U256,
    pub min_buy: U256,
    pub max_buy: U256,
    pub total_sold: U256,
}

impl DashboardSnapshot {
    /// Whether a sale window is configured at all.
    ///
    /// The window counts as enabled when either bound is non-zero; each
    /// bound is then enforced independently only if non-zero. This rule is
    /// applied uniformly across the workspace.
    pub fn window_enabled(&self) -> bool {
        self.sale_start != 0 || self.sale_end != 0
    }

    /// Whether the sale accepts purchases at unix time `now` (pause aside).
    pub fn sale_active(&self, now: u64) -> bool {
        if !self.window_enabled() {
            return true;
        }
        (self.sale_start == 0 || now >= self.sale_start)
            && (self.sale_end == 0 || now <= self.sale_end)
    }

    /// Sale progress in percent, if any cap can be inferred.
    ///
    /// Prefers the token hard cap, then the pay-token hard cap, then the
    /// implied cap (sold + remaining). Basis-point integer math; the final
    /// division to percent is display-only.
    pub fn progress_pct(&self) -> Option<f64> {
        let bps = |part: U256, whole: U256| -> Option<u64> {
            if whole.is_zero() {
                return None;
            }
            let bps = part.checked_mul(U256::from(10_000u64))? / whole;
            Some(bps.try_into().unwrap_or(10_000u64))
        };

        let raw = if !self.hard_cap_tokens.is_zero() {
            bps(self.total_sold, self.hard_cap_tokens)
        } else if !self.hard_cap_pay.is_zero() {
            bps(self.raised, self.hard_cap_pay)
        } else {
            bps(self.total_sold, self.total_sold + self.tokens_remaining)
        }?;

        Some((raw.min(10_000) as f64) / 100.0)
    }
}

/// Fetch a fresh snapshot from the ICO contract.
///
/// The pay-token symbol comes from the pay token's own ERC-20 metadata,
/// defaulting to "USDT" if the read fails or the address is unset.
pub async fn fetch_snapshot(provider: &IcoProvider, ico: Address) -> eyre::Result<DashboardSnapshot> {
    let contract = TokenIco::new(ico, provider.clone());

    let info = contract.getContractInfo().call().await?;
    let settings = contract.getPresaleSettings().call().await?;
    let pay_token = contract.payToken().call().await?;
    let pay_decimals = contract.payDecimals().call().await?;

    let pay_symbol = if pay_token == Address::ZERO {
        "USDT".to_string()
    } else {
        Erc20::new(pay_token, provider.clone())
            .symbol()
            .call()
            .await
            .unwrap_or_else(|_| "USDT".to_string())
    };

    Ok(DashboardSnapshot {
        ico,
        token_addr: info.tokenAddr,
        symbol: info.symbol,
        token_decimals: info.tokenDecimals,
        pay_token,
        pay_symbol,
        pay_decimals,
        price: info.tokenPrice,
        tokens_remaining: info.tokensRemaining,
        raised: info.usdtRaised,
        paused: settings.paused,
        sale_start: settings.start,
        sale_end: settings.end,
        hard_cap_pay: settings.hardCapUsdt,
        hard_cap_tokens: settings.hardCapTokens,
        min_buy: settings.minBuyUsdt,
        max_buy: settings.maxBuyUsdt,
        total_sold: settings.totalTokensSold,
    })
}

/// A wallet's standing relative to the sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalletPosition {
    pub pay_balance: U256,
    pub token_balance: U256,
    pub allowance: U256,
    pub contributed: U256,
}

/// Fetch the per-wallet reads the purchase flow depends on.
pub async fn fetch_wallet_position(
    provider: &IcoProvider,
    snapshot: &DashboardSnapshot,
    wallet: Address,
) -> eyre::Result<WalletPosition> {
    let ico = TokenIco::new(snapshot.ico, provider.clone());
    let pay = Erc20::new(snapshot.pay_token, provider.clone());
    let sale = Erc20::new(snapshot.token_addr, provider.clone());

    let pay_balance = pay.balanceOf(wallet).call().await?;
    let token_balance = sale.balanceOf(wallet).call().await?;
    let allowance = pay.allowance(wallet, snapshot.ico).call().await?;
    let contributed = ico.usdtContributed(wallet).call().await?;

    Ok(WalletPosition {
        pay_balance,
        token_balance,
        allowance,
        contributed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> DashboardSnapshot {
        DashboardSnapshot {
            ico: Address::with_last_byte(1),
            token_addr: Address::with_last_byte(2),
            symbol: "AERA".into(),
            token_decimals: 18,
            pay_token: Address::with_last_byte(3),
            pay_symbol: "USDT".into(),
            pay_decimals: 6,
            price: U256::from(50_000u64),
            tokens_remaining: U256::from(600u64),
            raised: U256::ZERO,
            paused: false,
            sale_start: 0,
            sale_end: 0,
            hard_cap_pay: U256::ZERO,
            hard_cap_tokens: U256::ZERO,
            min_buy: U256::ZERO,
            max_buy: U256::ZERO,
            total_sold: U256::from(400u64),
        }
    }

    #[test]
    fn zero_zero_window_means_no_restriction() {
        let s = snapshot();
        assert!(!s.window_enabled());
        assert!(s.sale_active(0));
        assert!(s.sale_active(u64::MAX));
    }

    #[test]
    fn either_nonzero_bound_enables_the_window() {
        let mut s = snapshot();
        s.sale_start = 1_000;
        assert!(s.window_enabled());
        assert!(!s.sale_active(999));
        assert!(s.sale_active(1_000));
        assert!(s.sale_active(u64::MAX)); // open-ended: end bound unset

        let mut s = snapshot();
        s.sale_end = 2_000;
        assert!(s.window_enabled());
        assert!(s.sale_active(0)); // open start
        assert!(s.sale_active(2_000));
        assert!(!s.sale_active(2_001));
    }

    #[test]
    fn both_bounds_checked_when_set() {
        let mut s = snapshot();
        s.sale_start = 1_000;
        s.sale_end = 2_000;
        assert!(!s.sale_active(999));
        assert!(s.sale_active(1_500));
        assert!(!s.sale_active(2_001));
    }

    #[test]
    fn progress_prefers_token_cap_then_pay_cap_then_implied() {
        let mut s = snapshot();
        s.hard_cap_tokens = U256::from(800u64);
        assert_eq!(s.progress_pct(), Some(50.0));

        s.hard_cap_tokens = U256::ZERO;
        s.hard_cap_pay = U256::from(1_000u64);
        s.raised = U256::from(250u64);
        assert_eq!(s.progress_pct(), Some(25.0));

        s.hard_cap_pay = U256::ZERO;
        // Implied cap: 400 sold of (400 + 600).
        assert_eq!(s.progress_pct(), Some(40.0));
    }

    #[test]
    fn progress_is_clamped_and_absent_without_any_cap() {
        let mut s = snapshot();
        s.hard_cap_tokens = U256::from(100u64);
        s.total_sold = U256::from(250u64);
        assert_eq!(s.progress_pct(), Some(100.0));

        s.hard_cap_tokens = U256::ZERO;
        s.total_sold = U256::ZERO;
        s.tokens_remaining = U256::ZERO;
        assert_eq!(s.progress_pct(), None);
    }
}
