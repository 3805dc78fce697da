//! Shared gateway state and service wiring.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::group::{Group, GroupService};
use crate::ledger::{LedgerService, SettlementCoordinator, Transaction};
use crate::notify::{NotificationSink, TracingSink};
use crate::registry::{MemberDirectory, MemberRegistry};
use crate::round::{Round, RoundEngine};
use crate::store::Store;
use crate::user_auth::UserAuthService;

/// Gateway application state (shared, cheap to clone behind Arc).
pub struct AppState {
    pub registry: Arc<MemberRegistry>,
    pub groups: Arc<GroupService>,
    pub engine: Arc<RoundEngine>,
    pub ledger: Arc<LedgerService>,
    pub settlement: Arc<SettlementCoordinator>,
    pub auth: Arc<UserAuthService>,
}

impl AppState {
    /// Wire stores and services for one process.
    pub fn build(config: &AppConfig) -> Arc<Self> {
        Self::build_with_sink(config, Arc::new(TracingSink))
    }

    /// Same wiring with a caller-supplied notification sink.
    pub fn build_with_sink(config: &AppConfig, notifier: Arc<dyn NotificationSink>) -> Arc<Self> {
        let registry = Arc::new(MemberRegistry::new());
        let directory = registry.clone() as Arc<dyn MemberDirectory>;

        let groups_store: Arc<Store<_, Group>> = Arc::new(Store::new("group"));
        let rounds_store: Arc<Store<_, Round>> = Arc::new(Store::new("round"));
        let txns_store: Arc<Store<_, Transaction>> = Arc::new(Store::new("transaction"));

        let engine = Arc::new(RoundEngine::new(
            Arc::clone(&rounds_store),
            Arc::clone(&groups_store),
            Arc::clone(&directory),
            Arc::clone(&notifier),
        ));
        let groups = Arc::new(GroupService::new(
            Arc::clone(&groups_store),
            Arc::clone(&directory),
            Arc::clone(&notifier),
            Arc::clone(&engine),
        ));
        let ledger = Arc::new(LedgerService::new(
            txns_store,
            rounds_store,
            groups_store,
            Arc::clone(&notifier),
        ));
        let settlement = Arc::new(SettlementCoordinator::new(
            Arc::clone(&ledger),
            Arc::clone(&engine),
        ));
        let auth = Arc::new(UserAuthService::new(
            Arc::clone(&registry),
            config.auth.jwt_secret.clone(),
            config.auth.token_ttl_hours,
            config.auth.admin_emails.clone(),
        ));

        Arc::new(Self {
            registry,
            groups,
            engine,
            ledger,
            settlement,
            auth,
        })
    }
}
