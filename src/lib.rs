//! Tontine - rotating savings group engine.
//!
//! Members contribute a fixed amount on a schedule; each round one member
//! receives the pooled funds. The crate's core is the round-rotation and
//! settlement engine; everything else is boundary glue around it.
//!
//! # Modules
//!
//! - [`core_types`] - Identifier newtypes (GroupId, RoundId, TxnId, UserId)
//! - [`money`] - Minor-unit amounts and decimal conversion
//! - [`error`] - The failure taxonomy every operation returns
//! - [`store`] - Keyed in-memory stores with per-entity serialized updates
//! - [`registry`] - Member identity, KYC, reliability scoring
//! - [`group`] - Group lifecycle and membership
//! - [`round`] - Round succession, beneficiary rotation, payment tracking
//! - [`ledger`] - Contribution transactions, disputes, settlement saga
//! - [`notify`] - Fire-and-forget notification seam
//! - [`user_auth`] - Password + JWT authentication
//! - [`gateway`] - axum HTTP boundary

pub mod config;
pub mod core_types;
pub mod error;
pub mod gateway;
pub mod group;
pub mod ledger;
pub mod logging;
pub mod money;
pub mod notify;
pub mod registry;
pub mod round;
pub mod store;
pub mod user_auth;

// Convenient re-exports at crate root
pub use core_types::{GroupId, RoundId, TxnId, UserId};
pub use error::{CoreError, CoreResult};
pub use group::{Group, GroupService, GroupStatus};
pub use ledger::{LedgerService, SettlementCoordinator, Transaction, TransactionStatus};
pub use money::Amount;
pub use registry::{MemberDirectory, MemberRegistry};
pub use round::{Round, RoundEngine, RoundStatus};
