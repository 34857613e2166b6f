use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::ApiError,
    middleware::auth_context::{AdminContext, AuthContext},
    models::{ApiOk, AppState},
    wallet::{
        Decision, EntryDirection, EntryPurpose, LedgerEntry, Mutation, TopUpRequest, TopUpStatus,
    },
};

pub fn router() -> Router<AppState> {
    Router::new()
        // user-facing wallet
        .route("/wallet", get(get_wallet))
        .route("/wallet/topups", post(submit_top_up).get(list_my_top_ups))
        .route("/wallet/entries", get(list_my_entries))
        // admin review & resolution
        .route("/admin/topups", get(admin_list_top_ups))
        .route("/admin/topups/{request_id}/approve", post(approve_top_up))
        .route("/admin/topups/{request_id}/reject", post(reject_top_up))
        .route("/admin/wallet/{account_id}/adjust", post(admin_adjust))
}

/* ============================================================
   DTOs
   ============================================================ */

#[derive(Debug, Serialize)]
pub struct WalletDto {
    pub account_id: Uuid,
    pub balance_cents: i64,
}

#[derive(Debug, Deserialize)]
pub struct SubmitTopUpRequest {
    pub amount_cents: i64,
    pub external_reference: String,
}

#[derive(Debug, Serialize)]
pub struct ResolvedTopUpDto {
    pub request: TopUpRequest,
    /// Present on approve only.
    pub balance_cents: Option<i64>,
    pub entry: Option<LedgerEntry>,
}

#[derive(Debug, Deserialize)]
pub struct AdminTopUpsQuery {
    pub status: Option<TopUpStatus>,
}

#[derive(Debug, Deserialize)]
pub struct AdjustRequest {
    pub amount_cents: i64,
    pub direction: EntryDirection,
    pub note: Option<String>,
}

/* ============================================================
   User-facing wallet
   ============================================================ */

pub async fn get_wallet(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<ApiOk<WalletDto>>, ApiError> {
    let account = state.wallet.account(auth.user_id).await?;
    Ok(Json(ApiOk {
        data: WalletDto {
            account_id: account.account_id,
            balance_cents: account.balance_cents,
        },
    }))
}

pub async fn submit_top_up(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<SubmitTopUpRequest>,
) -> Result<(StatusCode, Json<ApiOk<TopUpRequest>>), ApiError> {
    let reference = req.external_reference.trim();
    if reference.is_empty() {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "external_reference is required".into(),
        ));
    }

    let request = state
        .wallet
        .submit_top_up(auth.user_id, req.amount_cents, reference)
        .await?;

    Ok((StatusCode::CREATED, Json(ApiOk { data: request })))
}

pub async fn list_my_top_ups(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<ApiOk<Vec<TopUpRequest>>>, ApiError> {
    let requests = state.wallet.top_ups_for_account(auth.user_id).await?;
    Ok(Json(ApiOk { data: requests }))
}

pub async fn list_my_entries(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<ApiOk<Vec<LedgerEntry>>>, ApiError> {
    let entries = state.wallet.entries_for_account(auth.user_id).await?;
    Ok(Json(ApiOk { data: entries }))
}

/* ============================================================
   Admin review & resolution
   ============================================================ */

pub async fn admin_list_top_ups(
    State(state): State<AppState>,
    _admin: AdminContext,
    Query(q): Query<AdminTopUpsQuery>,
) -> Result<Json<ApiOk<Vec<TopUpRequest>>>, ApiError> {
    let requests = state.wallet.all_top_ups(q.status).await?;
    Ok(Json(ApiOk { data: requests }))
}

async fn resolve(
    state: &AppState,
    admin: &AdminContext,
    request_id: Uuid,
    decision: Decision,
) -> Result<Json<ApiOk<ResolvedTopUpDto>>, ApiError> {
    let resolved = state.wallet.resolve_top_up(request_id, decision).await?;

    tracing::info!(
        %request_id,
        admin_user_id = %admin.auth.user_id,
        status = ?resolved.request.status,
        "admin resolved top-up"
    );

    let (balance_cents, entry) = match resolved.outcome {
        Some(outcome) => (Some(outcome.balance_cents), Some(outcome.entry)),
        None => (None, None),
    };

    Ok(Json(ApiOk {
        data: ResolvedTopUpDto {
            request: resolved.request,
            balance_cents,
            entry,
        },
    }))
}

pub async fn approve_top_up(
    State(state): State<AppState>,
    admin: AdminContext,
    Path(request_id): Path<Uuid>,
) -> Result<Json<ApiOk<ResolvedTopUpDto>>, ApiError> {
    resolve(&state, &admin, request_id, Decision::Approve).await
}

pub async fn reject_top_up(
    State(state): State<AppState>,
    admin: AdminContext,
    Path(request_id): Path<Uuid>,
) -> Result<Json<ApiOk<ResolvedTopUpDto>>, ApiError> {
    resolve(&state, &admin, request_id, Decision::Reject).await
}

#[derive(Debug, Serialize)]
pub struct AdjustmentDto {
    pub balance_cents: i64,
    pub entry: LedgerEntry,
}

/// Manual balance correction, recorded in the ledger like any other change.
pub async fn admin_adjust(
    State(state): State<AppState>,
    admin: AdminContext,
    Path(account_id): Path<Uuid>,
    Json(req): Json<AdjustRequest>,
) -> Result<Json<ApiOk<AdjustmentDto>>, ApiError> {
    let direction = req.direction;
    let outcome = state
        .wallet
        .apply_mutation(Mutation {
            account_id,
            amount_cents: req.amount_cents,
            direction,
            purpose: EntryPurpose::Adjustment,
            reference: req.note,
        })
        .await?;

    tracing::info!(
        %account_id,
        admin_user_id = %admin.auth.user_id,
        ?direction,
        amount_cents = req.amount_cents,
        "admin wallet adjustment"
    );

    Ok(Json(ApiOk {
        data: AdjustmentDto {
            balance_cents: outcome.balance_cents,
            entry: outcome.entry,
        },
    }))
}
