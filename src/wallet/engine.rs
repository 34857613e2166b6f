use std::sync::Arc;

use uuid::Uuid;

use super::store::{ResolvedTopUp, WalletError, WalletStore};
use super::types::{
    Account, Decision, LedgerEntry, Mutation, MutationOutcome, TopUpRequest, TopUpStatus,
};

/// The only component the rest of the server talks to for wallet state.
/// Validation lives here; atomicity lives in the store.
#[derive(Clone)]
pub struct WalletEngine {
    store: Arc<dyn WalletStore>,
}

impl WalletEngine {
    pub fn new(store: Arc<dyn WalletStore>) -> Self {
        Self { store }
    }

    /// Open the wallet for a newly registered user (balance 0). Idempotent.
    pub async fn open_account(&self, account_id: Uuid) -> Result<Account, WalletError> {
        self.store.create_account(account_id).await
    }

    pub async fn account(&self, account_id: Uuid) -> Result<Account, WalletError> {
        self.store
            .account(account_id)
            .await?
            .ok_or(WalletError::AccountNotFound(account_id))
    }

    /// Submit a top-up claim for later admin review.
    pub async fn submit_top_up(
        &self,
        account_id: Uuid,
        amount_cents: i64,
        external_reference: &str,
    ) -> Result<TopUpRequest, WalletError> {
        if amount_cents <= 0 {
            return Err(WalletError::InvalidAmount);
        }
        // Submitting against a missing wallet is a caller bug; surface it
        // before the insert would trip the foreign key.
        if self.store.account(account_id).await?.is_none() {
            return Err(WalletError::AccountNotFound(account_id));
        }

        let request = self
            .store
            .insert_request(account_id, amount_cents, external_reference)
            .await?;
        tracing::info!(
            request_id = %request.request_id,
            account_id = %account_id,
            amount_cents,
            "top-up submitted"
        );
        Ok(request)
    }

    /// Resolve a Pending request. Approving credits the wallet and appends
    /// the ledger entry in the same atomic unit as the status transition;
    /// rejecting only flips the status. Any terminal status, Completed or
    /// Failed, makes a second resolve fail with AlreadyResolved.
    pub async fn resolve_top_up(
        &self,
        request_id: Uuid,
        decision: Decision,
    ) -> Result<ResolvedTopUp, WalletError> {
        let resolved = self.store.resolve_request(request_id, decision).await?;
        tracing::info!(
            request_id = %request_id,
            status = ?resolved.request.status,
            "top-up resolved"
        );
        Ok(resolved)
    }

    /// Apply a balance mutation outside the top-up flow (admin adjustments,
    /// refunds). The only write path to account balances.
    pub async fn apply_mutation(&self, mutation: Mutation) -> Result<MutationOutcome, WalletError> {
        if mutation.amount_cents <= 0 {
            return Err(WalletError::InvalidAmount);
        }
        let outcome = self.store.apply_mutation(mutation.clone()).await?;
        tracing::info!(
            account_id = %mutation.account_id,
            direction = ?mutation.direction,
            amount_cents = mutation.amount_cents,
            balance_cents = outcome.balance_cents,
            "wallet mutation applied"
        );
        Ok(outcome)
    }

    /* ---- read-only facade ---- */

    pub async fn top_ups_for_account(
        &self,
        account_id: Uuid,
    ) -> Result<Vec<TopUpRequest>, WalletError> {
        self.store.requests_for_account(account_id).await
    }

    pub async fn all_top_ups(
        &self,
        status: Option<TopUpStatus>,
    ) -> Result<Vec<TopUpRequest>, WalletError> {
        self.store.all_requests(status).await
    }

    pub async fn entries_for_account(
        &self,
        account_id: Uuid,
    ) -> Result<Vec<LedgerEntry>, WalletError> {
        self.store.entries_for_account(account_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::memory::MemoryWalletStore;
    use crate::wallet::types::{EntryDirection, EntryPurpose};

    fn engine() -> WalletEngine {
        WalletEngine::new(Arc::new(MemoryWalletStore::new()))
    }

    #[tokio::test]
    async fn submit_rejects_non_positive_amount() {
        let engine = engine();
        let account = Uuid::new_v4();
        engine.open_account(account).await.unwrap();

        let err = engine.submit_top_up(account, 0, "ref-zero").await.unwrap_err();
        assert!(matches!(err, WalletError::InvalidAmount));

        let err = engine.submit_top_up(account, -5, "ref-neg").await.unwrap_err();
        assert!(matches!(err, WalletError::InvalidAmount));
    }

    #[tokio::test]
    async fn submit_requires_existing_account() {
        let engine = engine();
        let err = engine
            .submit_top_up(Uuid::new_v4(), 100, "ref-1")
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::AccountNotFound(_)));
    }

    #[tokio::test]
    async fn approve_credits_once_and_writes_entry() {
        let engine = engine();
        let account = Uuid::new_v4();
        engine.open_account(account).await.unwrap();

        let req = engine.submit_top_up(account, 500, "R1").await.unwrap();
        assert_eq!(req.status, TopUpStatus::Pending);

        let resolved = engine
            .resolve_top_up(req.request_id, Decision::Approve)
            .await
            .unwrap();
        assert_eq!(resolved.request.status, TopUpStatus::Completed);

        let outcome = resolved.outcome.expect("approve produces a mutation");
        assert_eq!(outcome.balance_cents, 500);
        assert_eq!(outcome.entry.direction, EntryDirection::Credit);
        assert_eq!(outcome.entry.purpose, EntryPurpose::TopUp);
        assert_eq!(outcome.entry.balance_after_cents, 500);
        assert_eq!(outcome.entry.reference.as_deref(), Some("R1"));

        assert_eq!(engine.account(account).await.unwrap().balance_cents, 500);
        assert_eq!(engine.entries_for_account(account).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn reject_leaves_balance_untouched() {
        let engine = engine();
        let account = Uuid::new_v4();
        engine.open_account(account).await.unwrap();

        let req = engine.submit_top_up(account, 300, "R2").await.unwrap();
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
    async fn duplicate_reference_rejected_even_after_failure() {
        let engine = engine();
        let account = Uuid::new_v4();
        engine.open_account(account).await.unwrap();

        let req = engine.submit_top_up(account, 500, "R1").await.unwrap();
        engine
            .resolve_top_up(req.request_id, Decision::Reject)
            .await
            .unwrap();

        // The reference stays burned even though the first request failed.
        let err = engine.submit_top_up(account, 300, "R1").await.unwrap_err();
        assert!(matches!(err, WalletError::DuplicateReference(_)));
    }

    #[tokio::test]
    async fn second_resolve_is_already_resolved() {
        let engine = engine();
        let account = Uuid::new_v4();
        engine.open_account(account).await.unwrap();

        let req = engine.submit_top_up(account, 500, "R3").await.unwrap();
        engine
            .resolve_top_up(req.request_id, Decision::Approve)
            .await
            .unwrap();

        let err = engine
            .resolve_top_up(req.request_id, Decision::Approve)
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::AlreadyResolved(_)));
        assert_eq!(engine.account(account).await.unwrap().balance_cents, 500);

        // Re-rejecting a Failed request is an error too.
        let req2 = engine.submit_top_up(account, 100, "R4").await.unwrap();
        engine
            .resolve_top_up(req2.request_id, Decision::Reject)
            .await
            .unwrap();
        let err = engine
            .resolve_top_up(req2.request_id, Decision::Reject)
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::AlreadyResolved(_)));
    }

    #[tokio::test]
    async fn resolve_unknown_request_is_not_found() {
        let engine = engine();
        let err = engine
            .resolve_top_up(Uuid::new_v4(), Decision::Approve)
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::NotFound(_)));
    }

    #[tokio::test]
    async fn debit_beyond_balance_fails_and_preserves_state() {
        let engine = engine();
        let account = Uuid::new_v4();
        engine.open_account(account).await.unwrap();
        engine
            .apply_mutation(Mutation {
                account_id: account,
                amount_cents: 50,
                direction: EntryDirection::Credit,
                purpose: EntryPurpose::Adjustment,
                reference: None,
            })
            .await
            .unwrap();

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
        assert!(matches!(
            err,
            WalletError::InsufficientFunds {
                balance_cents: 50,
                amount_cents: 100
            }
        ));

        // No balance change and no stray ledger entry from the failed debit.
        assert_eq!(engine.account(account).await.unwrap().balance_cents, 50);
        assert_eq!(engine.entries_for_account(account).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn every_entry_snapshots_the_running_balance() {
        let engine = engine();
        let account = Uuid::new_v4();
        engine.open_account(account).await.unwrap();

        for (i, amount) in [200i64, 300, 150].iter().enumerate() {
            let req = engine
                .submit_top_up(account, *amount, &format!("ref-{i}"))
                .await
                .unwrap();
            engine
                .resolve_top_up(req.request_id, Decision::Approve)
                .await
                .unwrap();
        }

        let entries = engine.entries_for_account(account).await.unwrap();
        let after: Vec<i64> = entries.iter().map(|e| e.balance_after_cents).collect();
        assert_eq!(after, vec![200, 500, 650]);
        assert_eq!(engine.account(account).await.unwrap().balance_cents, 650);
    }
}
