use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use super::types::{
    Account, Decision, LedgerEntry, Mutation, MutationOutcome, TopUpRequest, TopUpStatus,
};

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("amount must be greater than zero")]
    InvalidAmount,

    #[error("external reference {0:?} was already used by another top-up")]
    DuplicateReference(String),

    #[error("top-up request {0} not found")]
    NotFound(Uuid),

    #[error("top-up request {0} is already resolved")]
    AlreadyResolved(Uuid),

    #[error("wallet account {0} not found")]
    AccountNotFound(Uuid),

    #[error("insufficient funds: balance is {balance_cents}, debit of {amount_cents} requested")]
    InsufficientFunds {
        balance_cents: i64,
        amount_cents: i64,
    },

    /// A credit would push the balance past what the ledger can represent.
    #[error("credit would overflow the account balance")]
    BalanceOverflow,

    /// Timeout or connection loss talking to the store. Safe to retry: every
    /// state-changing wallet operation is guarded against double application.
    #[error("store temporarily unavailable: {0}")]
    TransientStoreFailure(String),

    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),
}

impl WalletError {
    /// Split sqlx failures into retryable and not. Unique-constraint hits are
    /// classified by the caller, which knows which constraint it raced on.
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) | sqlx::Error::PoolClosed => {
                WalletError::TransientStoreFailure(err.to_string())
            }
            other => WalletError::Store(other),
        }
    }
}

/// Durable keyed storage for the wallet core. Every `&self` method is one
/// atomic unit: `apply_mutation` and `resolve_request` must commit the
/// balance change, the ledger append, and (for resolve) the status
/// transition together or not at all.
#[async_trait]
pub trait WalletStore: Send + Sync {
    /// Create the account with balance 0. Idempotent: an existing account is
    /// returned unchanged.
    async fn create_account(&self, account_id: Uuid) -> Result<Account, WalletError>;

    async fn account(&self, account_id: Uuid) -> Result<Option<Account>, WalletError>;

    /// Insert a Pending request. Fails with `DuplicateReference` if the
    /// external reference exists on any request, whatever its status.
    async fn insert_request(
        &self,
        account_id: Uuid,
        amount_cents: i64,
        external_reference: &str,
    ) -> Result<TopUpRequest, WalletError>;

    async fn request(&self, request_id: Uuid) -> Result<Option<TopUpRequest>, WalletError>;

    async fn requests_for_account(
        &self,
        account_id: Uuid,
    ) -> Result<Vec<TopUpRequest>, WalletError>;

    async fn all_requests(
        &self,
        status: Option<TopUpStatus>,
    ) -> Result<Vec<TopUpRequest>, WalletError>;

    async fn entries_for_account(&self, account_id: Uuid)
        -> Result<Vec<LedgerEntry>, WalletError>;

    /// Atomically adjust the balance and append the matching ledger entry.
    /// The balance must never be observable without the entry, or vice versa.
    async fn apply_mutation(&self, mutation: Mutation) -> Result<MutationOutcome, WalletError>;

    /// Atomically resolve a Pending request. On approve the credit runs in
    /// the same unit as the Pending -> Completed transition, so two
    /// concurrent resolves produce exactly one credit and one
    /// `AlreadyResolved`.
    async fn resolve_request(
        &self,
        request_id: Uuid,
        decision: Decision,
    ) -> Result<ResolvedTopUp, WalletError>;
}

/// Result of a resolve: the request in its terminal state, plus the mutation
/// outcome when the decision was approve.
#[derive(Debug, Clone)]
pub struct ResolvedTopUp {
    pub request: TopUpRequest,
    pub outcome: Option<MutationOutcome>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeouts_and_io_loss_classify_as_transient() {
        let err = WalletError::from_sqlx(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, WalletError::TransientStoreFailure(_)));

        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let err = WalletError::from_sqlx(sqlx::Error::Io(io));
        assert!(matches!(err, WalletError::TransientStoreFailure(_)));

        // Anything else stays a plain store error and is not retried.
        let err = WalletError::from_sqlx(sqlx::Error::RowNotFound);
        assert!(matches!(err, WalletError::Store(_)));
    }
}
