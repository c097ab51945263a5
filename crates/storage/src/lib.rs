pub mod cache;
pub mod models;

pub use cache::PurchaseCache;
pub use models::{CacheFile, PurchaseRecord};
