use alloy::primitives::U256;

use crate::dashboard::{DashboardSnapshot, WalletPosition};

/// Sentinel meaning "no limit applies along this dimension".
const UNLIMITED: U256 = U256::MAX;

fn pow10(decimals: u8) -> U256 {
    // 10^decimals as a U256; token decimals are single digits in practice.
    U256::from(10u64).pow(U256::from(decimals))
}

/// Tokens received for `pay_amount` at `price` (price is denominated in
/// pay-token units per whole sale token).
///
/// `tokens = pay_amount * 10^token_decimals / price`. Integer math only.
pub fn tokens_out(pay_amount: U256, price: U256, token_decimals: u8) -> U256 {
    if price.is_zero() {
        return U256::ZERO;
    }
    match pay_amount.checked_mul(pow10(token_decimals)) {
        Some(scaled) => scaled / price,
        None => UNLIMITED,
    }
}

/// Whether the ICO's allowance must be raised before buying.
pub fn needs_approval(allowance: U256, pay_amount: U256) -> bool {
    !pay_amount.is_zero() && allowance < pay_amount
}

/// First rule a proposed purchase violates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum QuoteError {
    #[error("sale is paused")]
    SalePaused,
    #[error("sale is not active (outside the sale window)")]
    SaleInactive,
    #[error("token price is not set")]
    PriceUnset,
    #[error("amount would purchase zero tokens")]
    ZeroTokensOut,
    #[error("insufficient pay-token balance")]
    InsufficientBalance,
    #[error("amount is below the minimum buy")]
    BelowMinimum,
    #[error("amount exceeds this wallet's remaining maximum")]
    AboveWalletMaximum,
    #[error("pay-token hard cap would be exceeded")]
    HardCapExceeded,
    #[error("token hard cap would be exceeded")]
    TokenCapExceeded,
    #[error("not enough tokens left in the contract")]
    InsufficientLiquidity,
}

/// Purchase-limit math for one wallet against one snapshot.
#[derive(Debug, Clone, Copy)]
pub struct QuoteContext<'a> {
    pub snapshot: &'a DashboardSnapshot,
    pub position: &'a WalletPosition,
    /// Chain time, from the latest block.
    pub now: u64,
}

impl QuoteContext<'_> {
    /// Pay amount still allowed for this wallet (0 max-buy means unlimited).
    fn wallet_remaining(&self) -> U256 {
        if self.snapshot.max_buy.is_zero() {
            return UNLIMITED;
        }
        self.snapshot
            .max_buy
            .saturating_sub(self.position.contributed)
    }

    /// Pay amount still accepted before the pay-token hard cap.
    fn hard_cap_remaining(&self) -> U256 {
        if self.snapshot.hard_cap_pay.is_zero() {
            return UNLIMITED;
        }
        self.snapshot.hard_cap_pay.saturating_sub(self.snapshot.raised)
    }

    /// Pay amount whose token output would hit the token hard cap.
    fn token_cap_spend(&self) -> U256 {
        if self.snapshot.hard_cap_tokens.is_zero() || self.snapshot.price.is_zero() {
            return UNLIMITED;
        }
        let cap_left = self
            .snapshot
            .hard_cap_tokens
            .saturating_sub(self.snapshot.total_sold);
        spend_for_tokens(cap_left, self.snapshot.price, self.snapshot.token_decimals)
    }

    /// Pay amount the contract's remaining token inventory can fulfill.
    fn liquidity_spend(&self) -> U256 {
        if self.snapshot.price.is_zero() {
            return U256::ZERO;
        }
        spend_for_tokens(
            self.snapshot.tokens_remaining,
            self.snapshot.price,
            self.snapshot.token_decimals,
        )
    }

    /// Largest pay amount this wallet could spend right now.
    pub fn max_spend(&self) -> U256 {
        [
            self.position.pay_balance,
            self.wallet_remaining(),
            self.hard_cap_remaining(),
            self.token_cap_spend(),
            self.liquidity_spend(),
        ]
        .into_iter()
        .min()
        .unwrap_or(U256::ZERO)
    }

    /// Validate a proposed pay amount against every sale rule, in the order
    /// the purchase form reports them.
    pub fn validate(&self, pay_amount: U256) -> Result<U256, QuoteError> {
        let s = self.snapshot;

        if s.paused {
            return Err(QuoteError::SalePaused);
        }
        if !s.sale_active(self.now) {
            return Err(QuoteError::SaleInactive);
        }
        if s.price.is_zero() {
            return Err(QuoteError::PriceUnset);
        }

        let out = tokens_out(pay_amount, s.price, s.token_decimals);
        if out.is_zero() {
            return Err(QuoteError::ZeroTokensOut);
        }
        if self.position.pay_balance < pay_amount {
            return Err(QuoteError::InsufficientBalance);
        }
        if !s.min_buy.is_zero() && pay_amount < s.min_buy {
            return Err(QuoteError::BelowMinimum);
        }
        if !s.max_buy.is_zero() && pay_amount > self.wallet_remaining() {
            return Err(QuoteError::AboveWalletMaximum);
        }
        if !s.hard_cap_pay.is_zero() && pay_amount > self.hard_cap_remaining() {
            return Err(QuoteError::HardCapExceeded);
        }
        if !s.hard_cap_tokens.is_zero() && pay_amount > self.token_cap_spend() {
            return Err(QuoteError::TokenCapExceeded);
        }
        if pay_amount > self.liquidity_spend() {
            return Err(QuoteError::InsufficientLiquidity);
        }

        Ok(out)
    }
}

/// Pay amount equivalent to `tokens` at `price`.
fn spend_for_tokens(tokens: U256, price: U256, token_decimals: u8) -> U256 {
    match tokens.checked_mul(price) {
        Some(v) => v / pow10(token_decimals),
        None => UNLIMITED,
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::Address;

    use super::*;
    use crate::dashboard::DashboardSnapshot;

    fn eth(n: u64) -> U256 {
        U256::from(n) * U256::from(10u64).pow(U256::from(18u8))
    }

    fn usdt(n: u64) -> U256 {
        U256::from(n) * U256::from(1_000_000u64)
    }

    fn snapshot() -> DashboardSnapshot {
        DashboardSnapshot {
            ico: Address::with_last_byte(1),
            token_addr: Address::with_last_byte(2),
            symbol: "AERA".into(),
            token_decimals: 18,
            pay_token: Address::with_last_byte(3),
            pay_symbol: "USDT".into(),
            pay_decimals: 6,
            // 0.05 USDT per token, stored in 6-decimal pay units.
            price: U256::from(50_000u64),
            tokens_remaining: eth(1_000_000),
            raised: U256::ZERO,
            paused: false,
            sale_start: 0,
            sale_end: 0,
            hard_cap_pay: U256::ZERO,
            hard_cap_tokens: U256::ZERO,
            min_buy: U256::ZERO,
            max_buy: U256::ZERO,
            total_sold: U256::ZERO,
        }
    }

    fn position() -> WalletPosition {
        WalletPosition {
            pay_balance: usdt(10_000),
            token_balance: U256::ZERO,
            allowance: U256::ZERO,
            contributed: U256::ZERO,
        }
    }

    #[test]
    fn hundred_usdt_at_five_cents_buys_two_thousand_tokens() {
        // 100 USDT in 6-decimal units, price 50000 → 2000 tokens at 18 dec.
        let out = tokens_out(usdt(100), U256::from(50_000u64), 18);
        assert_eq!(out, eth(2_000));
        assert_eq!(
            out.to_string(),
            "2000000000000000000000" // 2,000 * 10^18 raw units
        );
    }

    #[test]
    fn validates_the_happy_path() {
        let s = snapshot();
        let p = position();
        let ctx = QuoteContext { snapshot: &s, position: &p, now: 0 };
        assert_eq!(ctx.validate(usdt(100)), Ok(eth(2_000)));
    }

    #[test]
    fn rejects_in_rule_order() {
        let mut s = snapshot();
        let mut p = position();

        s.paused = true;
        let ctx = QuoteContext { snapshot: &s, position: &p, now: 0 };
        assert_eq!(ctx.validate(usdt(100)), Err(QuoteError::SalePaused));

        s.paused = false;
        s.sale_start = 10;
        s.sale_end = 20;
        let ctx = QuoteContext { snapshot: &s, position: &p, now: 30 };
        assert_eq!(ctx.validate(usdt(100)), Err(QuoteError::SaleInactive));

        s.sale_start = 0;
        s.sale_end = 0;
        s.min_buy = usdt(50);
        let ctx = QuoteContext { snapshot: &s, position: &p, now: 0 };
        assert_eq!(ctx.validate(usdt(10)), Err(QuoteError::BelowMinimum));

        s.min_buy = U256::ZERO;
        s.max_buy = usdt(500);
        p.contributed = usdt(450);
        let ctx = QuoteContext { snapshot: &s, position: &p, now: 0 };
        assert_eq!(ctx.validate(usdt(100)), Err(QuoteError::AboveWalletMaximum));

        p.contributed = U256::ZERO;
        s.max_buy = U256::ZERO;
        p.pay_balance = usdt(10);
        let ctx = QuoteContext { snapshot: &s, position: &p, now: 0 };
        assert_eq!(ctx.validate(usdt(100)), Err(QuoteError::InsufficientBalance));
    }

    #[test]
    fn caps_bound_the_spend() {
        let mut s = snapshot();
        s.hard_cap_pay = usdt(1_000);
        s.raised = usdt(950);
        let p = position();
        let ctx = QuoteContext { snapshot: &s, position: &p, now: 0 };
        assert_eq!(ctx.validate(usdt(100)), Err(QuoteError::HardCapExceeded));
        assert_eq!(ctx.validate(usdt(50)), Ok(eth(1_000)));

        let mut s = snapshot();
        s.hard_cap_tokens = eth(1_000);
        s.total_sold = eth(900);
        let ctx = QuoteContext { snapshot: &s, position: &p, now: 0 };
        // 100 tokens left under the cap = 5 USDT at 0.05.
        assert_eq!(ctx.validate(usdt(100)), Err(QuoteError::TokenCapExceeded));
        assert_eq!(ctx.validate(usdt(5)), Ok(eth(100)));
    }

    #[test]
    fn liquidity_is_always_enforced() {
        let mut s = snapshot();
        s.tokens_remaining = eth(100);
        let p = position();
        let ctx = QuoteContext { snapshot: &s, position: &p, now: 0 };
        assert_eq!(ctx.validate(usdt(6)), Err(QuoteError::InsufficientLiquidity));
        assert_eq!(ctx.validate(usdt(5)), Ok(eth(100)));
    }

    #[test]
    fn max_spend_is_the_tightest_limit() {
        let mut s = snapshot();
        s.max_buy = usdt(500);
        s.hard_cap_pay = usdt(10_000);
        s.raised = usdt(9_800);
        let mut p = position();
        p.contributed = usdt(100);

        let ctx = QuoteContext { snapshot: &s, position: &p, now: 0 };
        // balance 10k, wallet remaining 400, cap remaining 200, liquidity 50k.
        assert_eq!(ctx.max_spend(), usdt(200));
    }

    #[test]
    fn approval_needed_only_below_amount() {
        assert!(needs_approval(U256::ZERO, usdt(1)));
        assert!(needs_approval(usdt(1), usdt(2)));
        assert!(!needs_approval(usdt(2), usdt(2)));
        assert!(!needs_approval(U256::ZERO, U256::ZERO));
    }
}
