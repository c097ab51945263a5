/// A provider failure rewritten for display.
///
/// `summary` is the one-sentence message shown to the user; `detail` keeps
/// the raw provider text for a "show details" disclosure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxFailure {
    pub summary: String,
    pub detail: String,
}

impl std::fmt::Display for TxFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.summary)
    }
}

/// Classify a raw provider error message into a human-readable sentence.
///
/// Matching is by substring against the phrases wallets, RPC gateways, and
/// the ICO contract's revert strings actually produce. Raw text is never
/// the primary message.
pub fn classify(raw: &str) -> TxFailure {
    let lower = raw.to_lowercase();

    let summary = if lower.is_empty() {
        "Transaction failed. Please try again."
    } else if lower.contains("user rejected") || lower.contains("rejected the request") {
        "Transaction cancelled in your wallet"
    } else if lower.contains("insufficient funds") {
        "Insufficient BNB for gas fees"
    } else if lower.contains("below min buy") {
        "Amount below minimum purchase limit"
    } else if lower.contains("above max buy") {
        "Amount above maximum purchase limit"
    } else if lower.contains("sale not active") {
        "Presale is not active at this time"
    } else if lower.contains("hard cap") {
        "Presale hard cap would be exceeded"
    } else if lower.contains("not authorized") || lower.contains("caller is not the owner") {
        "This wallet is not authorized for that operation"
    } else if lower.contains("rate limit") || lower.contains("429") {
        "RPC is rate-limiting requests. Please retry in a moment."
    } else if lower.contains("failed to fetch")
        || lower.contains("http request failed")
        || lower.contains("network error")
        || lower.contains("connection refused")
        || lower.contains("timed out")
    {
        "Network connection issue. Please check the RPC endpoint."
    } else if lower.contains("execution reverted") {
        "Transaction reverted by contract. Check amount and sale status."
    } else {
        "Transaction failed. Please try again."
    };

    TxFailure {
        summary: summary.to_string(),
        detail: raw.to_string(),
    }
}

/// Read-path variant: failures here never clear cached data, they only
/// explain the banner shown next to it.
pub fn classify_read(raw: &str) -> String {
    let lower = raw.to_lowercase();

    if lower.contains("failed to fetch")
        || lower.contains("network error")
        || lower.contains("http request failed")
        || lower.contains("connection refused")
        || lower.contains("timed out")
    {
        "Unable to reach the BSC RPC. Please check your connection or RPC URL.".to_string()
    } else if lower.contains("rate limit") || lower.contains("429") {
        "RPC is rate-limiting requests. Please retry in a moment.".to_string()
    } else {
        "Unable to load on-chain data. Please try again.".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_phrases_are_rewritten() {
        let f = classify("MetaMask Tx Signature: User rejected the request.");
        assert_eq!(f.summary, "Transaction cancelled in your wallet");

        let f = classify("execution reverted: Sale not active");
        assert_eq!(f.summary, "Presale is not active at this time");

        let f = classify("execution reverted: below min buy");
        assert_eq!(f.summary, "Amount below minimum purchase limit");

        let f = classify("err: insufficient funds for gas * price + value");
        assert_eq!(f.summary, "Insufficient BNB for gas fees");
    }

    #[test]
    fn raw_detail_is_preserved() {
        let raw = "execution reverted: hard cap exceeded (code -32000)";
        let f = classify(raw);
        assert_eq!(f.summary, "Presale hard cap would be exceeded");
        assert_eq!(f.detail, raw);
    }

    #[test]
    fn unknown_errors_fall_back_to_a_generic_sentence() {
        let f = classify("something nobody has seen before");
        assert_eq!(f.summary, "Transaction failed. Please try again.");
    }

    #[test]
    fn read_failures_mention_the_rpc() {
        let msg = classify_read("error sending request: connection refused");
        assert!(msg.contains("RPC"));
    }
}
