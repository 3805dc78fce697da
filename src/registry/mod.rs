//! Member Registry.
//!
//! Leaf component: user identity, KYC status, and the reliability score
//! derived from payment history. The rest of the engine consumes it through
//! the [`MemberDirectory`] trait.

pub mod service;
pub mod types;

pub use service::{MemberDirectory, MemberRegistry};
pub use types::{
    KycRecord, KycStatus, KycSubmission, Member, MemberProfile, PaymentOutcome, Reliability,
    UserRole,
};
