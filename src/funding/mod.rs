pub mod accounts;
pub mod service;

pub use accounts::{AccountFactory, ResolvedAccount};
pub use service::{FundingReceipt, FundingService};
