/// Compute the `from` block for a lookback window ending at `to_block`.
///
/// Also covers "scan from a fixed historical start" by passing
/// `lookback = latest - fixed_start`.
pub fn lookback_range(to_block: u64, lookback: u64) -> u64 {
    to_block.saturating_sub(lookback)
}

#[cfg(test)]
mod tests {
    use super::lookback_range;

    #[test]
    fn subtracts_lookback() {
        assert_eq!(lookback_range(1000, 200), 800);
    }

    #[test]
    fn clamps_at_genesis() {
        assert_eq!(lookback_range(1000, 2000), 0);
        assert_eq!(lookback_range(0, 1), 0);
    }
}
