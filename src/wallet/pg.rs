use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::store::{ResolvedTopUp, WalletError, WalletStore};
use super::types::{
    Account, Decision, EntryDirection, EntryPurpose, EntryStatus, LedgerEntry, Mutation,
    MutationOutcome, TopUpRequest, TopUpStatus,
};

/// Postgres-backed store. Every state-changing method is one transaction;
/// the account row (and for resolve, the request row) is locked with
/// `SELECT ... FOR UPDATE` so mutations on the same account serialize.
#[derive(Clone)]
pub struct PgWalletStore {
    pool: PgPool,
}

impl PgWalletStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Balance change + ledger append against an open transaction. Shared by the
/// standalone mutation path and the approve path so both observe the same
/// contract.
async fn mutate_in_tx(
    conn: &mut PgConnection,
    mutation: &Mutation,
) -> Result<MutationOutcome, WalletError> {
    let balance: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT balance_cents
        FROM wallet_account
        WHERE account_id = $1
        FOR UPDATE
        "#,
    )
    .bind(mutation.account_id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(WalletError::from_sqlx)?;

    let Some(balance) = balance else {
        return Err(WalletError::AccountNotFound(mutation.account_id));
    };

    let new_balance = match mutation.direction {
        EntryDirection::Credit => balance
            .checked_add(mutation.amount_cents)
            .ok_or(WalletError::BalanceOverflow)?,
        EntryDirection::Debit => {
            if mutation.amount_cents > balance {
                return Err(WalletError::InsufficientFunds {
                    balance_cents: balance,
                    amount_cents: mutation.amount_cents,
                });
            }
            balance - mutation.amount_cents
        }
    };

    sqlx::query(
        r#"
        UPDATE wallet_account
        SET balance_cents = $2, updated_at = now()
        WHERE account_id = $1
        "#,
    )
    .bind(mutation.account_id)
    .bind(new_balance)
    .execute(&mut *conn)
    .await
    .map_err(WalletError::from_sqlx)?;

    let entry: LedgerEntry = sqlx::query_as(
        r#"
        INSERT INTO ledger_entry
            (account_id, amount_cents, direction, purpose, status, reference, balance_after_cents)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING entry_id, account_id, amount_cents, direction, purpose, status,
                  reference, balance_after_cents, created_at
        "#,
    )
    .bind(mutation.account_id)
    .bind(mutation.amount_cents)
    .bind(mutation.direction)
    .bind(mutation.purpose)
    .bind(EntryStatus::Completed)
    .bind(mutation.reference.as_deref())
    .bind(new_balance)
    .fetch_one(&mut *conn)
    .await
    .map_err(WalletError::from_sqlx)?;

    Ok(MutationOutcome {
        balance_cents: new_balance,
        entry,
    })
}

#[async_trait]
impl WalletStore for PgWalletStore {
    async fn create_account(&self, account_id: Uuid) -> Result<Account, WalletError> {
        let account: Account = sqlx::query_as(
            r#"
            INSERT INTO wallet_account (account_id)
            VALUES ($1)
            ON CONFLICT (account_id) DO UPDATE SET account_id = EXCLUDED.account_id
            RETURNING account_id, balance_cents, created_at
            "#,
        )
        .bind(account_id)
        .fetch_one(&self.pool)
        .await
        .map_err(WalletError::from_sqlx)?;

        Ok(account)
    }

    async fn account(&self, account_id: Uuid) -> Result<Option<Account>, WalletError> {
        sqlx::query_as(
            r#"
            SELECT account_id, balance_cents, created_at
            FROM wallet_account
            WHERE account_id = $1
            "#,
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(WalletError::from_sqlx)
    }

    async fn insert_request(
        &self,
        account_id: Uuid,
        amount_cents: i64,
        external_reference: &str,
    ) -> Result<TopUpRequest, WalletError> {
        let res: Result<TopUpRequest, sqlx::Error> = sqlx::query_as(
            r#"
            INSERT INTO topup_request (account_id, amount_cents, external_reference, status)
            VALUES ($1, $2, $3, $4)
            RETURNING request_id, account_id, amount_cents, external_reference,
                      status, created_at, resolved_at
            "#,
        )
        .bind(account_id)
        .bind(amount_cents)
        .bind(external_reference)
        .bind(TopUpStatus::Pending)
        .fetch_one(&self.pool)
        .await;

        match res {
            Ok(req) => Ok(req),
            Err(e) => {
                if e.as_database_error()
                    .is_some_and(|db| db.is_unique_violation())
                {
                    Err(WalletError::DuplicateReference(external_reference.to_string()))
                } else {
                    Err(WalletError::from_sqlx(e))
                }
            }
        }
    }

    async fn request(&self, request_id: Uuid) -> Result<Option<TopUpRequest>, WalletError> {
        sqlx::query_as(
            r#"
            SELECT request_id, account_id, amount_cents, external_reference,
                   status, created_at, resolved_at
            FROM topup_request
            WHERE request_id = $1
            "#,
        )
        .bind(request_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(WalletError::from_sqlx)
    }

    async fn requests_for_account(
        &self,
        account_id: Uuid,
    ) -> Result<Vec<TopUpRequest>, WalletError> {
        sqlx::query_as(
            r#"
            SELECT request_id, account_id, amount_cents, external_reference,
                   status, created_at, resolved_at
            FROM topup_request
            WHERE account_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await
        .map_err(WalletError::from_sqlx)
    }

    async fn all_requests(
        &self,
        status: Option<TopUpStatus>,
    ) -> Result<Vec<TopUpRequest>, WalletError> {
        sqlx::query_as(
            r#"
            SELECT request_id, account_id, amount_cents, external_reference,
                   status, created_at, resolved_at
            FROM topup_request
            WHERE ($1::smallint IS NULL OR status = $1)
            ORDER BY created_at ASC
            "#,
        )
        .bind(status)
        .fetch_all(&self.pool)
        .await
        .map_err(WalletError::from_sqlx)
    }

    async fn entries_for_account(
        &self,
        account_id: Uuid,
    ) -> Result<Vec<LedgerEntry>, WalletError> {
        sqlx::query_as(
            r#"
            SELECT entry_id, account_id, amount_cents, direction, purpose, status,
                   reference, balance_after_cents, created_at
            FROM ledger_entry
            WHERE account_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await
        .map_err(WalletError::from_sqlx)
    }

    async fn apply_mutation(&self, mutation: Mutation) -> Result<MutationOutcome, WalletError> {
        let mut tx = self.pool.begin().await.map_err(WalletError::from_sqlx)?;
        let outcome = mutate_in_tx(&mut *tx, &mutation).await?;
        tx.commit().await.map_err(WalletError::from_sqlx)?;
        Ok(outcome)
    }

    async fn resolve_request(
        &self,
        request_id: Uuid,
        decision: Decision,
    ) -> Result<ResolvedTopUp, WalletError> {
        let mut tx = self.pool.begin().await.map_err(WalletError::from_sqlx)?;

        // Row lock serializes concurrent resolves of the same request; the
        // loser re-reads a terminal status and gets AlreadyResolved.
        let request: Option<TopUpRequest> = sqlx::query_as(
            r#"
            SELECT request_id, account_id, amount_cents, external_reference,
                   status, created_at, resolved_at
            FROM topup_request
            WHERE request_id = $1
            FOR UPDATE
            "#,
        )
        .bind(request_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(WalletError::from_sqlx)?;

        let Some(request) = request else {
            return Err(WalletError::NotFound(request_id));
        };
        if request.status != TopUpStatus::Pending {
            return Err(WalletError::AlreadyResolved(request_id));
        }

        let outcome = match decision {
            Decision::Approve => Some(
                mutate_in_tx(
                    &mut *tx,
                    &Mutation {
                        account_id: request.account_id,
                        amount_cents: request.amount_cents,
                        direction: EntryDirection::Credit,
                        purpose: EntryPurpose::TopUp,
                        reference: Some(request.external_reference.clone()),
                    },
                )
                .await?,
            ),
            Decision::Reject => None,
        };

        let new_status = match decision {
            Decision::Approve => TopUpStatus::Completed,
            Decision::Reject => TopUpStatus::Failed,
        };

        let request: TopUpRequest = sqlx::query_as(
            r#"
            UPDATE topup_request
            SET status = $2, resolved_at = now()
            WHERE request_id = $1
            RETURNING request_id, account_id, amount_cents, external_reference,
                      status, created_at, resolved_at
            "#,
        )
        .bind(request_id)
        .bind(new_status)
        .fetch_one(&mut *tx)
        .await
        .map_err(WalletError::from_sqlx)?;

        tx.commit().await.map_err(WalletError::from_sqlx)?;

        Ok(ResolvedTopUp {
            request,
            outcome,
        })
    }
}
