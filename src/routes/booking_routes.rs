use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Row;
use uuid::Uuid;

use crate::{
    error::ApiError,
    middleware::auth_context::{AdminContext, AuthContext},
    models::{ApiOk, AppState, OkData, OkResponse},
};

// Sanity bound for a single session slot.
const MAX_SLOT_HOURS: i64 = 8;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/slots", get(list_open_slots))
        .route("/appointments", post(book_appointment).get(list_my_appointments))
        .route("/admin/slots", post(create_slot))
        .route("/admin/slots/{slot_id}", delete(delete_slot))
}

/* ============================================================
   DTOs
   ============================================================ */

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct SlotDto {
    pub slot_id: Uuid,
    pub therapist_name: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub is_booked: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateSlotRequest {
    pub therapist_name: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct BookRequest {
    pub slot_id: Uuid,
    pub note: Option<String>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct AppointmentDto {
    pub appointment_id: Uuid,
    pub slot_id: Uuid,
    pub therapist_name: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/* ============================================================
   Admin: availability management
   ============================================================ */

pub async fn create_slot(
    State(state): State<AppState>,
    admin: AdminContext,
    Json(req): Json<CreateSlotRequest>,
) -> Result<(StatusCode, Json<ApiOk<SlotDto>>), ApiError> {
    let therapist = req.therapist_name.trim();
    if therapist.is_empty() {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "therapist_name is required".into(),
        ));
    }
    if req.end_at <= req.start_at {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "end_at must be > start_at".into(),
        ));
    }
    if req.start_at <= Utc::now() {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "start_at must be in the future".into(),
        ));
    }
    if req.end_at - req.start_at > chrono::Duration::hours(MAX_SLOT_HOURS) {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            format!("slot may not be longer than {MAX_SLOT_HOURS} hours"),
        ));
    }

    let slot: SlotDto = sqlx::query_as(
        r#"
        INSERT INTO availability_slot (therapist_name, start_at, end_at)
        VALUES ($1, $2, $3)
        RETURNING slot_id, therapist_name, start_at, end_at, is_booked
        "#,
    )
    .bind(therapist)
    .bind(req.start_at)
    .bind(req.end_at)
    .fetch_one(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    tracing::info!(slot_id = %slot.slot_id, admin_user_id = %admin.auth.user_id, "slot created");

    Ok((StatusCode::CREATED, Json(ApiOk { data: slot })))
}

pub async fn delete_slot(
    State(state): State<AppState>,
    _admin: AdminContext,
    Path(slot_id): Path<Uuid>,
) -> Result<Json<OkResponse>, ApiError> {
    let res = sqlx::query(
        r#"
        DELETE FROM availability_slot
        WHERE slot_id = $1
          AND is_booked = false
        "#,
    )
    .bind(slot_id)
    .execute(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    if res.rows_affected() == 0 {
        // Either missing or already booked; booked slots keep their history.
        let exists: Option<bool> =
            sqlx::query_scalar(r#"SELECT is_booked FROM availability_slot WHERE slot_id = $1"#)
                .bind(slot_id)
                .fetch_optional(&state.db)
                .await
                .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;
        return match exists {
            Some(_) => Err(ApiError::Conflict(
                "SLOT_BOOKED",
                "Booked slots cannot be deleted".into(),
            )),
            None => Err(ApiError::NotFound("NOT_FOUND", "slot not found".into())),
        };
    }

    Ok(Json(OkResponse {
        data: OkData { ok: true },
    }))
}

/* ============================================================
   User: browse & book
   ============================================================ */

pub async fn list_open_slots(
    State(state): State<AppState>,
    _auth: AuthContext,
) -> Result<Json<ApiOk<Vec<SlotDto>>>, ApiError> {
    let slots: Vec<SlotDto> = sqlx::query_as(
        r#"
        SELECT slot_id, therapist_name, start_at, end_at, is_booked
        FROM availability_slot
        WHERE is_booked = false
          AND start_at > now()
        ORDER BY start_at ASC
        "#,
    )
    .fetch_all(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    Ok(Json(ApiOk { data: slots }))
}

pub async fn book_appointment(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<BookRequest>,
) -> Result<(StatusCode, Json<ApiOk<AppointmentDto>>), ApiError> {
    let mut tx = state
        .db
        .begin()
        .await
        .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    // Lock the slot row so two concurrent bookings serialize; the loser sees
    // is_booked = true.
    let slot = sqlx::query(
        r#"
        SELECT therapist_name, start_at, end_at, is_booked
        FROM availability_slot
        WHERE slot_id = $1
        FOR UPDATE
        "#,
    )
    .bind(req.slot_id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    let Some(slot) = slot else {
        return Err(ApiError::NotFound("NOT_FOUND", "slot not found".into()));
    };

    let is_booked: bool = slot
        .try_get("is_booked")
        .map_err(|e| ApiError::Internal(format!("row decode error: {e}")))?;
    if is_booked {
        return Err(ApiError::Conflict(
            "SLOT_TAKEN",
            "Slot was already booked".into(),
        ));
    }

    let start_at: DateTime<Utc> = slot
        .try_get("start_at")
        .map_err(|e| ApiError::Internal(format!("row decode error: {e}")))?;
    if start_at <= Utc::now() {
        return Err(ApiError::BadRequest(
            "SLOT_IN_PAST",
            "Slot start time has already passed".into(),
        ));
    }

    let end_at: DateTime<Utc> = slot
        .try_get("end_at")
        .map_err(|e| ApiError::Internal(format!("row decode error: {e}")))?;
    let therapist_name: String = slot
        .try_get("therapist_name")
        .map_err(|e| ApiError::Internal(format!("row decode error: {e}")))?;

    let row = sqlx::query(
        r#"
        INSERT INTO appointment (slot_id, user_id, note)
        VALUES ($1, $2, $3)
        RETURNING appointment_id, created_at
        "#,
    )
    .bind(req.slot_id)
    .bind(auth.user_id)
    .bind(req.note.as_deref())
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    sqlx::query(r#"UPDATE availability_slot SET is_booked = true WHERE slot_id = $1"#)
        .bind(req.slot_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    tx.commit()
        .await
        .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    let appointment_id: Uuid = row
        .try_get("appointment_id")
        .map_err(|e| ApiError::Internal(format!("row decode error: {e}")))?;
    let created_at: DateTime<Utc> = row
        .try_get("created_at")
        .map_err(|e| ApiError::Internal(format!("row decode error: {e}")))?;

    tracing::info!(%appointment_id, user_id = %auth.user_id, "appointment booked");

    Ok((
        StatusCode::CREATED,
        Json(ApiOk {
            data: AppointmentDto {
                appointment_id,
                slot_id: req.slot_id,
                therapist_name,
                start_at,
                end_at,
                note: req.note,
                created_at,
            },
        }),
    ))
}

pub async fn list_my_appointments(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<ApiOk<Vec<AppointmentDto>>>, ApiError> {
    let appointments: Vec<AppointmentDto> = sqlx::query_as(
        r#"
        SELECT
          a.appointment_id,
          a.slot_id,
          s.therapist_name,
          s.start_at,
          s.end_at,
          a.note,
          a.created_at
        FROM appointment a
        JOIN availability_slot s ON s.slot_id = a.slot_id
        WHERE a.user_id = $1
        ORDER BY s.start_at ASC
        "#,
    )
    .bind(auth.user_id)
    .fetch_all(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    Ok(Json(ApiOk { data: appointments }))
}
