//! Wallet lifecycle properties, driven through the public engine API against
//! the in-memory store.

use std::sync::Arc;

use uuid::Uuid;

use mindcare_server::wallet::{
    Decision, EntryDirection, EntryPurpose, MemoryWalletStore, Mutation, TopUpStatus, WalletEngine,
    WalletError,
};

fn engine() -> WalletEngine {
    WalletEngine::new(Arc::new(MemoryWalletStore::new()))
}

async fn funded_account(engine: &WalletEngine, amount_cents: i64, reference: &str) -> Uuid {
    let account = Uuid::new_v4();
    engine.open_account(account).await.unwrap();
    let req = engine
        .submit_top_up(account, amount_cents, reference)
        .await
        .unwrap();
    engine
        .resolve_top_up(req.request_id, Decision::Approve)
        .await
        .unwrap();
    account
}

#[tokio::test]
async fn submit_approve_walkthrough() {
    let engine = engine();
    let account = Uuid::new_v4();
    engine.open_account(account).await.unwrap();
    assert_eq!(engine.account(account).await.unwrap().balance_cents, 0);

    let req = engine.submit_top_up(account, 500, "R1").await.unwrap();
    assert_eq!(req.status, TopUpStatus::Pending);
    assert_eq!(req.amount_cents, 500);

    let resolved = engine
        .resolve_top_up(req.request_id, Decision::Approve)
        .await
        .unwrap();
    assert_eq!(resolved.request.status, TopUpStatus::Completed);
    assert!(resolved.request.resolved_at.is_some());

    assert_eq!(engine.account(account).await.unwrap().balance_cents, 500);

    let entries = engine.entries_for_account(account).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].direction, EntryDirection::Credit);
    assert_eq!(entries[0].purpose, EntryPurpose::TopUp);
    assert_eq!(entries[0].balance_after_cents, 500);
    assert_eq!(entries[0].reference.as_deref(), Some("R1"));
}

#[tokio::test]
async fn duplicate_reference_always_fails() {
    let engine = engine();
    let account = Uuid::new_v4();
    engine.open_account(account).await.unwrap();

    engine.submit_top_up(account, 500, "R1").await.unwrap();
    let err = engine.submit_top_up(account, 300, "R1").await.unwrap_err();
    assert!(matches!(err, WalletError::DuplicateReference(_)));

    // Same reference from a different account is blocked too.
    let other = Uuid::new_v4();
    engine.open_account(other).await.unwrap();
    let err = engine.submit_top_up(other, 300, "R1").await.unwrap_err();
    assert!(matches!(err, WalletError::DuplicateReference(_)));
}

#[tokio::test]
async fn resolving_completed_request_changes_nothing() {
    let engine = engine();
    let account = Uuid::new_v4();
    engine.open_account(account).await.unwrap();

    let req = engine.submit_top_up(account, 500, "R1").await.unwrap();
    engine
        .resolve_top_up(req.request_id, Decision::Approve)
        .await
        .unwrap();

    for decision in [Decision::Approve, Decision::Reject] {
        let err = engine
            .resolve_top_up(req.request_id, decision)
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::AlreadyResolved(_)));
    }

    assert_eq!(engine.account(account).await.unwrap().balance_cents, 500);
    assert_eq!(engine.entries_for_account(account).await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_resolves_credit_exactly_once() {
    for _ in 0..50 {
        let engine = engine();
        let account = Uuid::new_v4();
        engine.open_account(account).await.unwrap();
        let req = engine.submit_top_up(account, 500, "race").await.unwrap();

        let a = {
            let engine = engine.clone();
            let id = req.request_id;
            tokio::spawn(async move { engine.resolve_top_up(id, Decision::Approve).await })
        };
        let b = {
            let engine = engine.clone();
            let id = req.request_id;
            tokio::spawn(async move { engine.resolve_top_up(id, Decision::Approve).await })
        };

        let (ra, rb) = (a.await.unwrap(), b.await.unwrap());
        let wins = [&ra, &rb].iter().filter(|r| r.is_ok()).count();
        assert_eq!(wins, 1, "exactly one resolve must win");
        for r in [ra, rb] {
            if let Err(e) = r {
                assert!(matches!(e, WalletError::AlreadyResolved(_)));
            }
        }

        assert_eq!(engine.account(account).await.unwrap().balance_cents, 500);
        assert_eq!(engine.entries_for_account(account).await.unwrap().len(), 1);
    }
}

#[tokio::test]
async fn debit_never_drives_balance_negative() {
    let engine = engine();
    let account = funded_account(&engine, 50, "seed").await;

    let err = engine
        .apply_mutation(Mutation {
            account_id: account,
            amount_cents: 100,
            direction: EntryDirection::Debit,
            purpose: EntryPurpose::Adjustment,
            reference: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::InsufficientFunds { .. }));
    assert_eq!(engine.account(account).await.unwrap().balance_cents, 50);

    // An exact-balance debit is allowed and lands at zero, not below.
    let outcome = engine
        .apply_mutation(Mutation {
            account_id: account,
            amount_cents: 50,
            direction: EntryDirection::Debit,
            purpose: EntryPurpose::Adjustment,
            reference: None,
        })
        .await
        .unwrap();
    assert_eq!(outcome.balance_cents, 0);
    assert_eq!(outcome.entry.balance_after_cents, 0);
}

#[tokio::test]
async fn credit_overflow_is_rejected_not_wrapped() {
    let engine = engine();
    let account = Uuid::new_v4();
    engine.open_account(account).await.unwrap();

    engine
        .apply_mutation(Mutation {
            account_id: account,
            amount_cents: i64::MAX,
            direction: EntryDirection::Credit,
            purpose: EntryPurpose::Adjustment,
            reference: None,
        })
        .await
        .unwrap();

    // A further credit cannot be represented; it must fail cleanly instead
    // of wrapping the balance negative.
    let err = engine
        .apply_mutation(Mutation {
            account_id: account,
            amount_cents: 100,
            direction: EntryDirection::Credit,
            purpose: EntryPurpose::Adjustment,
            reference: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::BalanceOverflow));

    assert_eq!(
        engine.account(account).await.unwrap().balance_cents,
        i64::MAX
    );
    assert_eq!(engine.entries_for_account(account).await.unwrap().len(), 1);
}

#[tokio::test]
async fn ledger_matches_balance_after_mixed_history() {
    let engine = engine();
    let account = funded_account(&engine, 1000, "seed-1000").await;

    engine
        .apply_mutation(Mutation {
            account_id: account,
            amount_cents: 250,
            direction: EntryDirection::Debit,
            purpose: EntryPurpose::Booking,
            reference: Some("booking-1".into()),
        })
        .await
        .unwrap();
    engine
        .apply_mutation(Mutation {
            account_id: account,
            amount_cents: 100,
            direction: EntryDirection::Credit,
            purpose: EntryPurpose::Refund,
            reference: Some("booking-1".into()),
        })
        .await
        .unwrap();

    let entries = engine.entries_for_account(account).await.unwrap();
    assert_eq!(entries.len(), 3);

    // Replaying the ledger reproduces the stored balance.
    let mut replayed = 0i64;
    for e in &entries {
        match e.direction {
            EntryDirection::Credit => replayed += e.amount_cents,
            EntryDirection::Debit => replayed -= e.amount_cents,
        }
        assert_eq!(e.balance_after_cents, replayed);
        assert!(e.balance_after_cents >= 0);
    }
    assert_eq!(
        engine.account(account).await.unwrap().balance_cents,
        replayed
    );
}

#[tokio::test]
async fn rejected_request_leaves_no_ledger_trace() {
    let engine = engine();
    let account = Uuid::new_v4();
    engine.open_account(account).await.unwrap();

    let req = engine.submit_top_up(account, 700, "R-reject").await.unwrap();
    let resolved = engine
        .resolve_top_up(req.request_id, Decision::Reject)
        .await
        .unwrap();

    assert_eq!(resolved.request.status, TopUpStatus::Failed);
    assert!(resolved.outcome.is_none());
    assert_eq!(engine.account(account).await.unwrap().balance_cents, 0);
    assert!(engine.entries_for_account(account).await.unwrap().is_empty());
}

#[tokio::test]
async fn admin_listing_filters_by_status() {
    let engine = engine();
    let account = Uuid::new_v4();
    engine.open_account(account).await.unwrap();

    let pending = engine.submit_top_up(account, 100, "p1").await.unwrap();
    let approved = engine.submit_top_up(account, 200, "a1").await.unwrap();
    let rejected = engine.submit_top_up(account, 300, "r1").await.unwrap();
    engine
        .resolve_top_up(approved.request_id, Decision::Approve)
        .await
        .unwrap();
    engine
        .resolve_top_up(rejected.request_id, Decision::Reject)
        .await
        .unwrap();

    let all = engine.all_top_ups(None).await.unwrap();
    assert_eq!(all.len(), 3);

    let only_pending = engine.all_top_ups(Some(TopUpStatus::Pending)).await.unwrap();
    assert_eq!(only_pending.len(), 1);
    assert_eq!(only_pending[0].request_id, pending.request_id);

    let only_failed = engine.all_top_ups(Some(TopUpStatus::Failed)).await.unwrap();
    assert_eq!(only_failed.len(), 1);
    assert_eq!(only_failed[0].request_id, rejected.request_id);
}
