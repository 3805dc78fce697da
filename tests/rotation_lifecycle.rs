//! End-to-end rotation and settlement scenarios, driven through the public
//! service wiring the gateway uses.

use std::sync::Arc;

use chrono::{Duration, Utc};

use tontine::core_types::{GroupId, RoundId, TxnId, UserId};
use tontine::error::CoreError;
use tontine::group::{
    ContributionSettings, CreateGroupRequest, Frequency, Group, GroupRules, GroupService,
    GroupStatus,
};
use tontine::ledger::{
    ContributionRequest, LedgerService, PaymentMethod, SettlementCoordinator, Transaction,
    TransactionStatus, TxnMetadata,
};
use tontine::money::parse_amount;
use tontine::notify::{NotificationSink, TracingSink};
use tontine::registry::{
    KycSubmission, MemberDirectory, MemberRegistry,
    PaymentOutcome::{self, Missed, OnTime},
};
use tontine::round::{PaymentStatus, Round, RoundEngine, RoundStatus};
use tontine::store::Store;

struct World {
    registry: Arc<MemberRegistry>,
    groups: Arc<GroupService>,
    engine: Arc<RoundEngine>,
    ledger: Arc<LedgerService>,
    settlement: Arc<SettlementCoordinator>,
    rounds_store: Arc<Store<RoundId, Round>>,
}

fn world() -> World {
    let registry = Arc::new(MemberRegistry::new());
    let directory = registry.clone() as Arc<dyn MemberDirectory>;
    let notifier = Arc::new(TracingSink) as Arc<dyn NotificationSink>;

    let groups_store: Arc<Store<GroupId, Group>> = Arc::new(Store::new("group"));
    let rounds_store: Arc<Store<RoundId, Round>> = Arc::new(Store::new("round"));
    let txns_store: Arc<Store<TxnId, Transaction>> = Arc::new(Store::new("transaction"));

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
        Arc::clone(&rounds_store),
        groups_store,
        notifier,
    ));
    let settlement = Arc::new(SettlementCoordinator::new(
        Arc::clone(&ledger),
        Arc::clone(&engine),
    ));

    World {
        registry,
        groups,
        engine,
        ledger,
        settlement,
        rounds_store,
    }
}

/// Register a member and walk them through KYC approval.
fn verified_member(w: &World, name: &str) -> UserId {
    let member = w
        .registry
        .register(name, &format!("{name}@example.com"), "hash".into())
        .unwrap();
    w.registry
        .submit_kyc(
            member.id,
            KycSubmission {
                national_id_number: format!("ID-{name}"),
                national_id_image: "/vault/id.png".into(),
                selfie_image: "/vault/selfie.png".into(),
            },
        )
        .unwrap();
    w.registry
        .review_kyc(member.id, UserId(0), true, None)
        .unwrap();
    member.id
}

async fn seed_outcomes(w: &World, user: UserId, outcome: PaymentOutcome, times: u32) {
    for _ in 0..times {
        w.registry
            .record_payment_outcome(user, outcome)
            .await
            .unwrap();
    }
}

fn monthly_group_request(amount: &str) -> CreateGroupRequest {
    CreateGroupRequest {
        name: "cercle d'epargne".into(),
        description: "monthly rotation".into(),
        contribution_settings: ContributionSettings {
            amount: parse_amount(amount).unwrap(),
            frequency: Frequency::Monthly,
            payment_deadline_day: 5,
        },
        rules: Some(GroupRules {
            min_reliability_score: 0,
            max_members: 10,
        }),
    }
}

/// Pay one participant's obligation through the ledger + settlement path.
async fn contribute_and_settle(w: &World, group: GroupId, round: RoundId, payer: UserId) {
    let txn = w
        .ledger
        .create_contribution(
            payer,
            ContributionRequest {
                group,
                round,
                amount: parse_amount("100.00").unwrap(),
                payment_method: PaymentMethod::MobileMoney,
                metadata: TxnMetadata::default(),
            },
        )
        .unwrap();
    w.settlement.settle_contribution(txn.id).await.unwrap();
    assert_eq!(
        w.ledger.transaction(txn.id).unwrap().status,
        TransactionStatus::Confirmed
    );
}

#[tokio::test]
async fn test_three_member_monthly_rotation() {
    let w = world();
    let m1 = verified_member(&w, "awa");
    let m2 = verified_member(&w, "bintou");
    let m3 = verified_member(&w, "moussa");

    // Give the members distinct histories: m3 has missed twice (score 30),
    // m1 has a solid record (score 56), m2 is fresh (score 50).
    seed_outcomes(&w, m3, Missed, 2).await;
    seed_outcomes(&w, m1, OnTime, 3).await;

    let group = w
        .groups
        .create_group(m1, monthly_group_request("100.00"))
        .await
        .unwrap();
    w.groups.add_member(group.id, m2, m1).await.unwrap();
    w.groups.add_member(group.id, m3, m1).await.unwrap();

    let started = w.groups.start_group(group.id, m1).await.unwrap();
    assert_eq!(started.status, GroupStatus::Active);

    // Round 1: totalAmount = 100.00 x 3, beneficiary is the lowest-score
    // member (m3), deadline one month out.
    let r1 = w.engine.current_round(group.id).unwrap().unwrap();
    assert_eq!(r1.round_number, 1);
    assert_eq!(r1.total_amount, parse_amount("300.00").unwrap());
    assert_eq!(r1.beneficiary.user_id, m3);
    assert!(r1.expected_end_date > Utc::now() + Duration::days(29));

    for payer in [m1, m2, m3] {
        contribute_and_settle(&w, group.id, r1.id, payer).await;
    }

    let r1_done = w.engine.round(r1.id).unwrap();
    assert_eq!(r1_done.status, RoundStatus::Completed);
    assert_eq!(r1_done.collected_amount, parse_amount("300.00").unwrap());
    assert!(r1_done.beneficiary.received);
    assert_eq!(
        r1_done.beneficiary.received_amount,
        parse_amount("300.00").unwrap()
    );

    let g = w.groups.group_details(group.id, m1).unwrap();
    assert_eq!(g.total_collected, parse_amount("300.00").unwrap());
    assert_eq!(g.total_distributed, parse_amount("300.00").unwrap());

    // Advance: the order is re-sorted on fresh scores; after one on-time
    // payment each, m2 holds the middle rank and takes round 2.
    w.engine.complete_round_and_create_next(r1.id).await.unwrap();
    let r2 = w.engine.current_round(group.id).unwrap().unwrap();
    assert_eq!(r2.round_number, 2);
    assert_eq!(r2.beneficiary.user_id, m2);
    assert_eq!(r2.total_amount, parse_amount("300.00").unwrap());

    for payer in [m1, m2, m3] {
        contribute_and_settle(&w, group.id, r2.id, payer).await;
    }
    w.engine.complete_round_and_create_next(r2.id).await.unwrap();

    // Round 3 serves the last remaining member (m1), then the cycle ends.
    let r3 = w.engine.current_round(group.id).unwrap().unwrap();
    assert_eq!(r3.round_number, 3);
    assert_eq!(r3.beneficiary.user_id, m1);
    for payer in [m1, m2, m3] {
        contribute_and_settle(&w, group.id, r3.id, payer).await;
    }
    w.engine.complete_round_and_create_next(r3.id).await.unwrap();

    let finished = w.groups.group_details(group.id, m1).unwrap();
    assert_eq!(finished.status, GroupStatus::Completed);
    assert_eq!(finished.total_rounds, 3);
    assert_eq!(finished.total_collected, parse_amount("900.00").unwrap());
    assert_eq!(finished.total_distributed, parse_amount("900.00").unwrap());
    assert!(finished.actual_end_date.is_some());

    // Each member was beneficiary exactly once.
    let mut beneficiaries: Vec<UserId> = w
        .engine
        .group_rounds(group.id)
        .unwrap()
        .iter()
        .map(|r| r.beneficiary.user_id)
        .collect();
    beneficiaries.sort();
    beneficiaries.dedup();
    assert_eq!(beneficiaries.len(), 3);
}

#[tokio::test]
async fn test_late_payer_tagged_but_round_completes() {
    let w = world();
    let m1 = verified_member(&w, "fatou");
    let m2 = verified_member(&w, "seydou");

    let group = w
        .groups
        .create_group(m1, monthly_group_request("50.00"))
        .await
        .unwrap();
    w.groups.add_member(group.id, m2, m1).await.unwrap();
    w.groups.start_group(group.id, m1).await.unwrap();

    let round = w.engine.current_round(group.id).unwrap().unwrap();

    // m1 pays inside the window.
    w.engine
        .mark_payment_done(round.id, m1, TxnId::new())
        .await
        .unwrap();

    // Deadline passes with m2 outstanding.
    w.rounds_store
        .update(&round.id, |r| {
            r.expected_end_date = Utc::now() - Duration::days(3);
            Ok(())
        })
        .unwrap();
    let late = w.engine.late_participants(round.id).unwrap();
    assert_eq!(late.len(), 1);
    assert_eq!(late[0].user_id, m2);

    // The late payment still settles the round.
    let done = w
        .engine
        .mark_payment_done(round.id, m2, TxnId::new())
        .await
        .unwrap();
    assert_eq!(done.status, RoundStatus::Completed);
    assert_eq!(
        done.participant(m2).unwrap().payment_status,
        PaymentStatus::Late
    );
    assert_eq!(
        done.participant(m1).unwrap().payment_status,
        PaymentStatus::OnTime
    );
    assert_eq!(done.collected_amount, done.total_amount);

    // The miss shows up in m2's reliability history, not m1's.
    assert_eq!(w.registry.get(m2).unwrap().reliability.late_payments, 1);
    assert_eq!(w.registry.get(m1).unwrap().reliability.late_payments, 0);
}

#[tokio::test]
async fn test_confirmed_but_unapplied_contribution_recovers() {
    let w = world();
    let m1 = verified_member(&w, "ada");
    let m2 = verified_member(&w, "koffi");

    let group = w
        .groups
        .create_group(m1, monthly_group_request("75.00"))
        .await
        .unwrap();
    w.groups.add_member(group.id, m2, m1).await.unwrap();
    w.groups.start_group(group.id, m1).await.unwrap();
    let round = w.engine.current_round(group.id).unwrap().unwrap();

    // m2's transaction is confirmed at the ledger, but the round update is
    // lost (the crash window between the two phases).
    let orphan = w
        .ledger
        .create_contribution(
            m2,
            ContributionRequest {
                group: group.id,
                round: round.id,
                amount: parse_amount("75.00").unwrap(),
                payment_method: PaymentMethod::BankTransfer,
                metadata: TxnMetadata::default(),
            },
        )
        .unwrap();
    w.ledger.confirm_transaction(orphan.id).unwrap();
    assert!(!w
        .engine
        .round(round.id)
        .unwrap()
        .participant(m2)
        .unwrap()
        .has_paid);

    // Reconciliation re-drives it; m1 then settles normally and the round
    // completes with the correct total.
    assert_eq!(w.settlement.reconcile_round(round.id).await.unwrap(), 1);
    contribute_and_settle_amount(&w, group.id, round.id, m1, "75.00").await;

    let done = w.engine.round(round.id).unwrap();
    assert_eq!(done.status, RoundStatus::Completed);
    assert_eq!(done.collected_amount, parse_amount("150.00").unwrap());
    assert_eq!(
        done.participant(m2).unwrap().transaction,
        Some(orphan.id)
    );
}

async fn contribute_and_settle_amount(
    w: &World,
    group: GroupId,
    round: RoundId,
    payer: UserId,
    amount: &str,
) {
    let txn = w
        .ledger
        .create_contribution(
            payer,
            ContributionRequest {
                group,
                round,
                amount: parse_amount(amount).unwrap(),
                payment_method: PaymentMethod::Cash,
                metadata: TxnMetadata::default(),
            },
        )
        .unwrap();
    w.settlement.settle_contribution(txn.id).await.unwrap();
}

#[tokio::test]
async fn test_membership_gates_at_the_boundary_of_a_real_group() {
    let w = world();
    let creator = verified_member(&w, "mariam");

    let mut req = monthly_group_request("100.00");
    req.rules = Some(GroupRules {
        min_reliability_score: 45,
        max_members: 3,
    });
    let group = w.groups.create_group(creator, req).await.unwrap();

    // A member whose misses pulled them under the floor is rejected.
    let shaky = verified_member(&w, "issa");
    seed_outcomes(&w, shaky, Missed, 1).await; // 50 - 10 = 40 < 45
    let err = w
        .groups
        .add_member(group.id, shaky, creator)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::PolicyViolation(_)));

    // Unverified KYC is rejected before any scoring.
    let raw = w
        .registry
        .register("paul", "paul@example.com", "hash".into())
        .unwrap();
    let err = w
        .groups
        .add_member(group.id, raw.id, creator)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Unverified(_)));
}

#[tokio::test]
async fn test_total_amount_never_changes_after_creation() {
    let w = world();
    let m1 = verified_member(&w, "aly");
    let m2 = verified_member(&w, "oumou");

    let group = w
        .groups
        .create_group(m1, monthly_group_request("20.00"))
        .await
        .unwrap();
    w.groups.add_member(group.id, m2, m1).await.unwrap();
    w.groups.start_group(group.id, m1).await.unwrap();
    let round = w.engine.current_round(group.id).unwrap().unwrap();
    let fixed_total = round.total_amount;
    assert_eq!(fixed_total, parse_amount("40.00").unwrap());

    contribute_and_settle_amount(&w, group.id, round.id, m1, "20.00").await;
    assert_eq!(w.engine.round(round.id).unwrap().total_amount, fixed_total);
    contribute_and_settle_amount(&w, group.id, round.id, m2, "20.00").await;
    let done = w.engine.round(round.id).unwrap();
    assert_eq!(done.total_amount, fixed_total);
    assert_eq!(done.collected_amount, fixed_total);
}
