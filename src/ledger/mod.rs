//! Contribution Ledger.
//!
//! Payment transactions tied to rounds, their confirm/fail lifecycle, the
//! dispute adjunct, and the settlement command that couples a confirmation
//! with the round engine's payment marking.

pub mod service;
pub mod settlement;
pub mod types;

pub use service::{ContributionRequest, LedgerService, TransactionFilter, TransactionStats};
pub use settlement::SettlementCoordinator;
pub use types::{
    Dispute, DisputeStatus, PaymentMethod, Transaction, TransactionStatus, TransactionType,
    TxnMetadata,
};
