pub mod abi;
pub mod blocks;
pub mod dashboard;
pub mod decoder;
pub mod errors;
pub mod explorer;
pub mod provider;
pub mod range;
pub mod refresh;
pub mod rows;
pub mod sale;
pub mod scan;
pub mod tx;
pub mod units;

pub use abi::{Erc20, TokenIco};
pub use dashboard::DashboardSnapshot;
pub use decoder::{PurchaseRow, TransferRow, WithdrawalRow};
pub use provider::{IcoProvider, create_provider, create_wallet_provider};
pub use scan::LogScanner;
