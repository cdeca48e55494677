//! Services module for business logic

pub mod deposit;
pub mod limits;
pub mod reconciler;
pub mod wallet;
pub mod withdrawal;

pub use deposit::{DepositOutcome, DepositService};
pub use reconciler::{ReconcileOutcome, ReconcilerService};
pub use wallet::{ChainToken, WalletService};
pub use withdrawal::{ApprovedWithdrawal, WithdrawalDetail, WithdrawalService};
