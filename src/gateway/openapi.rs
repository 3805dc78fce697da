//! OpenAPI / Swagger UI documentation.
//!
//! - Swagger UI: `http://localhost:8080/docs`
//! - OpenAPI JSON: `http://localhost:8080/api-docs/openapi.json`

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::gateway::handlers::{HealthResponse, KycReviewBody};
use crate::group::{ContributionSettings, Frequency, GroupRules};
use crate::ledger::{
    DisputeStatus, PaymentMethod, TransactionStats, TransactionStatus, TransactionType,
};
use crate::registry::{KycStatus, KycSubmission, MemberProfile};
use crate::round::{PaymentStatus, RoundStats, RoundStatus};
use crate::user_auth::{AuthResponse, LoginRequest, RegisterRequest};

/// Bearer JWT security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_jwt",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("JWT obtained from /api/v1/auth/login"))
                        .build(),
                ),
            );
        }
    }
}

/// Main API documentation struct
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Tontine API",
        version = "1.0.0",
        description = "Rotating savings group engine: groups, rounds, contributions, disputes.",
        license(name = "MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Development"),
    ),
    paths(
        crate::gateway::handlers::health_check,
        crate::user_auth::handlers::register,
        crate::user_auth::handlers::login,
        crate::gateway::handlers::get_me,
        crate::gateway::handlers::get_member,
        crate::gateway::handlers::submit_kyc,
        crate::gateway::handlers::pending_kyc,
        crate::gateway::handlers::review_kyc,
        crate::gateway::handlers::create_group,
        crate::gateway::handlers::my_groups,
        crate::gateway::handlers::get_group,
        crate::gateway::handlers::update_group,
        crate::gateway::handlers::add_member,
        crate::gateway::handlers::remove_member,
        crate::gateway::handlers::start_group,
        crate::gateway::handlers::end_group,
        crate::gateway::handlers::suspend_group,
        crate::gateway::handlers::resume_group,
        crate::gateway::handlers::group_rounds,
        crate::gateway::handlers::current_round,
        crate::gateway::handlers::group_transactions,
        crate::gateway::handlers::group_transaction_stats,
        crate::gateway::handlers::reconcile_group_totals,
        crate::gateway::handlers::get_round,
        crate::gateway::handlers::late_participants,
        crate::gateway::handlers::round_stats,
        crate::gateway::handlers::advance_round,
        crate::gateway::handlers::cancel_round,
        crate::gateway::handlers::reconcile_round,
        crate::gateway::handlers::create_contribution,
        crate::gateway::handlers::get_transaction,
        crate::gateway::handlers::my_transactions,
        crate::gateway::handlers::confirm_transaction,
        crate::gateway::handlers::settle_transaction,
        crate::gateway::handlers::fail_transaction,
        crate::gateway::handlers::create_dispute,
        crate::gateway::handlers::resolve_dispute,
    ),
    components(
        schemas(
            HealthResponse,
            RegisterRequest,
            LoginRequest,
            AuthResponse,
            MemberProfile,
            KycStatus,
            KycSubmission,
            KycReviewBody,
            ContributionSettings,
            Frequency,
            GroupRules,
            RoundStatus,
            RoundStats,
            PaymentStatus,
            PaymentMethod,
            TransactionType,
            TransactionStatus,
            TransactionStats,
            DisputeStatus,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "System", description = "Health and diagnostics"),
        (name = "Auth", description = "Registration and login"),
        (name = "Members", description = "Profiles and KYC"),
        (name = "Groups", description = "Group lifecycle and membership"),
        (name = "Rounds", description = "Rotation rounds and settlement state"),
        (name = "Transactions", description = "Contribution ledger"),
        (name = "Disputes", description = "Transaction disputes"),
    )
)]
pub struct ApiDoc;
