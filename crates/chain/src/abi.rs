use alloy::sol;

// ─── TokenIco Presale Contract ──────────────────────────────────────────────
sol! {
    #[allow(missing_docs)]
    #[derive(Debug, PartialEq, Eq)]
    #[sol(rpc)]
    contract TokenIco {
        // === Events ===
        event TokensPurchased(address indexed buyer, uint256 amountPaid, uint256 tokensBought);
        event TokensWithdrawn(address indexed to, uint256 amount);

        // === View functions ===
        function getContractInfo()
            external
            view
            returns (
                address tokenAddr,
                string memory symbol,
                uint8 tokenDecimals,
                uint256 tokenPrice,
                uint256 tokensRemaining,
                uint256 usdtRaised
            );
        function getPresaleSettings()
            external
            view
            returns (
                bool paused,
                uint64 start,
                uint64 end,
                uint256 hardCapUsdt,
                uint256 hardCapTokens,
                uint256 minBuyUsdt,
                uint256 maxBuyUsdt,
                uint256 totalTokensSold
            );
        function payToken() external view returns (address);
        function payDecimals() external view returns (uint8);
        function usdtContributed(address wallet) external view returns (uint256);
        function owner() external view returns (address);
        function treasury() external view returns (address);

        // === State-changing functions (wallet signature required) ===
        function buyToken(uint256 amount) external;
        function updateTokenPrice(uint256 newPrice) external;
        function pause() external;
        function unpause() external;
        function setSaleWindow(uint64 start, uint64 end) external;
        function setSaleToken(address token) external;
        function setTreasuryWallet(address wallet) external;
        function setOperator(address account, bool enabled) external;
        function setTreasurer(address account, bool enabled) external;
        function withdrawTokens(uint256 amount) external;
        function rescueUSDT(uint256 amount) external;
    }
}

// ─── ERC-20 ─────────────────────────────────────────────────────────────────
sol! {
    #[allow(missing_docs)]
    #[derive(Debug, PartialEq, Eq)]
    #[sol(rpc)]
    contract Erc20 {
        event Transfer(address indexed from, address indexed to, uint256 value);
        event Approval(address indexed owner, address indexed spender, uint256 value);

        function name() external view returns (string memory);
        function symbol() external view returns (string memory);
        function decimals() external view returns (uint8);
        function totalSupply() external view returns (uint256);
        function balanceOf(address account) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
        function transfer(address to, uint256 amount) external returns (bool);
    }
}
