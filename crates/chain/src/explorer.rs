use alloy::primitives::{Address, B256};

/// Block-explorer deep links. URL construction only — no API calls.
#[derive(Debug, Clone)]
pub struct Explorer {
    base: String,
}

impl Explorer {
    pub fn new(base: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    pub fn tx_url(&self, hash: B256) -> String {
        format!("{}/tx/{hash:#x}", self.base)
    }

    pub fn address_url(&self, addr: Address) -> String {
        format!("{}/address/{addr:#x}", self.base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_links_and_trims_trailing_slash() {
        let e = Explorer::new("https://bscscan.com/");
        let addr = Address::with_last_byte(0xab);
        assert_eq!(
            e.address_url(addr),
            "https://bscscan.com/address/0x00000000000000000000000000000000000000ab"
        );
        let tx = B256::with_last_byte(0x01);
        assert!(e.tx_url(tx).starts_with("https://bscscan.com/tx/0x0000"));
    }
}
