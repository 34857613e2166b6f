//! Wallet ledger core: accounts, top-up requests, and the append-only ledger.
//!
//! All balance changes funnel through [`WalletEngine`], which delegates the
//! atomic pieces to a [`WalletStore`]. The Postgres store runs each
//! state-changing operation inside one transaction; the in-memory store backs
//! the test suite.

pub mod engine;
pub mod memory;
pub mod pg;
pub mod store;
pub mod types;

pub use engine::WalletEngine;
pub use memory::MemoryWalletStore;
pub use pg::PgWalletStore;
pub use store::{ResolvedTopUp, WalletError, WalletStore};
pub use types::{
    Account, Decision, EntryDirection, EntryPurpose, EntryStatus, LedgerEntry, Mutation,
    MutationOutcome, TopUpRequest, TopUpStatus,
};
