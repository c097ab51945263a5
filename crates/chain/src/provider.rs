use alloy::network::EthereumWallet;
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;

/// The BSC RPC provider type used throughout the application.
///
/// Erased so read-only and wallet-filled providers share one signature.
pub type IcoProvider = DynProvider;

/// Create a read-only HTTP provider from an RPC URL string.
pub fn create_provider(rpc_url: &str) -> eyre::Result<IcoProvider> {
    let url = rpc_url.parse()?;
    let provider = ProviderBuilder::new().connect_http(url);
    Ok(provider.erased())
}

/// Create a provider with a local signer attached, for write transactions.
///
/// Nonce, gas and chain-id are filled automatically by the builder.
pub fn create_wallet_provider(rpc_url: &str, private_key: &str) -> eyre::Result<IcoProvider> {
    let url = rpc_url.parse()?;
    let signer: PrivateKeySigner = private_key.trim().parse()?;
    let wallet = EthereumWallet::from(signer);
    let provider = ProviderBuilder::new().wallet(wallet).connect_http(url);
    Ok(provider.erased())
}

/// Parse the signer address out of a private key without building a provider.
pub fn signer_address(private_key: &str) -> eyre::Result<alloy::primitives::Address> {
    let signer: PrivateKeySigner = private_key.trim().parse()?;
    Ok(signer.address())
}
