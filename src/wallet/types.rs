use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One wallet per user; `account_id` equals the owning user's id.
/// `balance_cents` never goes negative and is only written together with a
/// matching [`LedgerEntry`].
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Account {
    pub account_id: Uuid,
    pub balance_cents: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "smallint")]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum TopUpStatus {
    Pending = 0,
    Completed = 1,
    Failed = 2,
}

/// A user's claim that an out-of-band payment happened, awaiting admin
/// verification. Terminal once Completed or Failed.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TopUpRequest {
    pub request_id: Uuid,
    pub account_id: Uuid,
    pub amount_cents: i64,
    pub external_reference: String,
    pub status: TopUpStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "smallint")]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum EntryDirection {
    Credit = 0,
    Debit = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "smallint")]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum EntryPurpose {
    TopUp = 0,
    Booking = 1,
    Refund = 2,
    Adjustment = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "smallint")]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum EntryStatus {
    Pending = 0,
    Completed = 1,
    Failed = 2,
}

/// Append-only audit record of one balance change. Never updated or deleted.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct LedgerEntry {
    pub entry_id: Uuid,
    pub account_id: Uuid,
    pub amount_cents: i64,
    pub direction: EntryDirection,
    pub purpose: EntryPurpose,
    pub status: EntryStatus,
    pub reference: Option<String>,
    pub balance_after_cents: i64,
    pub created_at: DateTime<Utc>,
}

/// Input to the mutation engine. `amount_cents` is always positive; the
/// direction carries the sign.
#[derive(Debug, Clone)]
pub struct Mutation {
    pub account_id: Uuid,
    pub amount_cents: i64,
    pub direction: EntryDirection,
    pub purpose: EntryPurpose,
    pub reference: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MutationOutcome {
    pub balance_cents: i64,
    pub entry: LedgerEntry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject,
}
