use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::store::{ResolvedTopUp, WalletError, WalletStore};
use super::types::{
    Account, Decision, EntryDirection, EntryPurpose, EntryStatus, LedgerEntry, Mutation,
    MutationOutcome, TopUpRequest, TopUpStatus,
};

#[derive(Default)]
struct MemoryState {
    accounts: HashMap<Uuid, Account>,
    requests: HashMap<Uuid, TopUpRequest>,
    entries: Vec<LedgerEntry>,
}

/// In-memory store for tests. One mutex over the whole ledger state makes
/// every operation atomic, which is exactly the contract the Postgres store
/// provides with per-operation transactions.
#[derive(Clone, Default)]
pub struct MemoryWalletStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryWalletStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn mutate_locked(
    state: &mut MemoryState,
    mutation: &Mutation,
) -> Result<MutationOutcome, WalletError> {
    let account = state
        .accounts
        .get_mut(&mutation.account_id)
        .ok_or(WalletError::AccountNotFound(mutation.account_id))?;

    let new_balance = match mutation.direction {
        EntryDirection::Credit => account
            .balance_cents
            .checked_add(mutation.amount_cents)
            .ok_or(WalletError::BalanceOverflow)?,
        EntryDirection::Debit => {
            if mutation.amount_cents > account.balance_cents {
                return Err(WalletError::InsufficientFunds {
                    balance_cents: account.balance_cents,
                    amount_cents: mutation.amount_cents,
                });
            }
            account.balance_cents - mutation.amount_cents
        }
    };

    account.balance_cents = new_balance;
    let entry = LedgerEntry {
        entry_id: Uuid::new_v4(),
        account_id: mutation.account_id,
        amount_cents: mutation.amount_cents,
        direction: mutation.direction,
        purpose: mutation.purpose,
        status: EntryStatus::Completed,
        reference: mutation.reference.clone(),
        balance_after_cents: new_balance,
        created_at: Utc::now(),
    };
    state.entries.push(entry.clone());

    Ok(MutationOutcome {
        balance_cents: new_balance,
        entry,
    })
}

#[async_trait]
impl WalletStore for MemoryWalletStore {
    async fn create_account(&self, account_id: Uuid) -> Result<Account, WalletError> {
        let mut state = self.state.lock().await;
        let account = state.accounts.entry(account_id).or_insert_with(|| Account {
            account_id,
            balance_cents: 0,
            created_at: Utc::now(),
        });
        Ok(account.clone())
    }

    async fn account(&self, account_id: Uuid) -> Result<Option<Account>, WalletError> {
        let state = self.state.lock().await;
        Ok(state.accounts.get(&account_id).cloned())
    }

    async fn insert_request(
        &self,
        account_id: Uuid,
        amount_cents: i64,
        external_reference: &str,
    ) -> Result<TopUpRequest, WalletError> {
        let mut state = self.state.lock().await;

        // Reference uniqueness is global, including Failed requests.
        if state
            .requests
            .values()
            .any(|r| r.external_reference == external_reference)
        {
            return Err(WalletError::DuplicateReference(external_reference.to_string()));
        }

        let request = TopUpRequest {
            request_id: Uuid::new_v4(),
            account_id,
            amount_cents,
            external_reference: external_reference.to_string(),
            status: TopUpStatus::Pending,
            created_at: Utc::now(),
            resolved_at: None,
        };
        state.requests.insert(request.request_id, request.clone());
        Ok(request)
    }

    async fn request(&self, request_id: Uuid) -> Result<Option<TopUpRequest>, WalletError> {
        let state = self.state.lock().await;
        Ok(state.requests.get(&request_id).cloned())
    }

    async fn requests_for_account(
        &self,
        account_id: Uuid,
    ) -> Result<Vec<TopUpRequest>, WalletError> {
        let state = self.state.lock().await;
        let mut out: Vec<TopUpRequest> = state
            .requests
            .values()
            .filter(|r| r.account_id == account_id)
            .cloned()
            .collect();
        out.sort_by_key(|r| r.created_at);
        Ok(out)
    }

    async fn all_requests(
        &self,
        status: Option<TopUpStatus>,
    ) -> Result<Vec<TopUpRequest>, WalletError> {
        let state = self.state.lock().await;
        let mut out: Vec<TopUpRequest> = state
            .requests
            .values()
            .filter(|r| status.is_none_or(|s| r.status == s))
            .cloned()
            .collect();
        out.sort_by_key(|r| r.created_at);
        Ok(out)
    }

    async fn entries_for_account(
        &self,
        account_id: Uuid,
    ) -> Result<Vec<LedgerEntry>, WalletError> {
        let state = self.state.lock().await;
        Ok(state
            .entries
            .iter()
            .filter(|e| e.account_id == account_id)
            .cloned()
            .collect())
    }

    async fn apply_mutation(&self, mutation: Mutation) -> Result<MutationOutcome, WalletError> {
        let mut state = self.state.lock().await;
        mutate_locked(&mut state, &mutation)
    }

    async fn resolve_request(
        &self,
        request_id: Uuid,
        decision: Decision,
    ) -> Result<ResolvedTopUp, WalletError> {
        let mut state = self.state.lock().await;

        let current = state
            .requests
            .get(&request_id)
            .ok_or(WalletError::NotFound(request_id))?
            .clone();
        if current.status != TopUpStatus::Pending {
            return Err(WalletError::AlreadyResolved(request_id));
        }

        let outcome = match decision {
            Decision::Approve => Some(mutate_locked(
                &mut state,
                &Mutation {
                    account_id: current.account_id,
                    amount_cents: current.amount_cents,
                    direction: EntryDirection::Credit,
                    purpose: EntryPurpose::TopUp,
                    reference: Some(current.external_reference.clone()),
                },
            )?),
            Decision::Reject => None,
        };

        let request = state
            .requests
            .get_mut(&request_id)
            .ok_or(WalletError::NotFound(request_id))?;
        request.status = match decision {
            Decision::Approve => TopUpStatus::Completed,
            Decision::Reject => TopUpStatus::Failed,
        };
        request.resolved_at = Some(Utc::now());

        Ok(ResolvedTopUp {
            request: request.clone(),
            outcome,
        })
    }
}
