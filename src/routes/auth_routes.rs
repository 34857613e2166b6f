use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::{
    auth::{generate_access_token, hash_access_token, hash_password, verify_password},
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::{role_to_string, *},
};

const MIN_PASSWORD_LEN: usize = 8;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me))
        .route("/logout", post(logout))
}

/* ============================================================
   POST /auth/register
   ============================================================ */

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiOk<UserProfile>>), ApiError> {
    let username = req.username.trim();
    if username.is_empty() || req.display_name.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "username and display_name are required".into(),
        ));
    }
    if req.password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            format!("password must be at least {MIN_PASSWORD_LEN} characters"),
        ));
    }

    let password_hash = hash_password(&req.password).map_err(ApiError::Internal)?;

    // User row and their zero-balance wallet are created together; a crash
    // can never leave a registered user without a wallet.
    let mut tx = state
        .db
        .begin()
        .await
        .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    let res: Result<(Uuid,), sqlx::Error> = sqlx::query_as(
        r#"
        INSERT INTO app_user (username, display_name, password_hash, role)
        VALUES ($1, $2, $3, 0)
        RETURNING user_id
        "#,
    )
    .bind(username)
    .bind(req.display_name.trim())
    .bind(&password_hash)
    .fetch_one(&mut *tx)
    .await;

    let user_id = match res {
        Ok((id,)) => id,
        Err(e) => {
            if e.as_database_error()
                .is_some_and(|db| db.is_unique_violation())
            {
                return Err(ApiError::Conflict(
                    "USERNAME_TAKEN",
                    "Username is already in use".into(),
                ));
            }
            return Err(ApiError::Internal(format!("db error: {e}")));
        }
    };

    sqlx::query(r#"INSERT INTO wallet_account (account_id) VALUES ($1)"#)
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    tx.commit()
        .await
        .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    tracing::info!(%user_id, username, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(ApiOk {
            data: UserProfile {
                user_id,
                username: username.to_string(),
                display_name: req.display_name.trim().to_string(),
                role: role_to_string(ROLE_USER),
            },
        }),
    ))
}

/* ============================================================
   POST /auth/login
   ============================================================ */

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let username = req.username.trim();
    if username.is_empty() || req.password.is_empty() {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "username and password are required".into(),
        ));
    }

    let user: UserRow = sqlx::query_as::<_, UserRow>(
        r#"
        SELECT user_id, username, display_name, password_hash, role, is_active
        FROM app_user
        WHERE username = $1
        "#,
    )
    .bind(username)
    .fetch_optional(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?
    .ok_or_else(ApiError::invalid_credentials)?;

    if !user.is_active {
        return Err(ApiError::Forbidden("FORBIDDEN", "Account is disabled".into()));
    }

    if !verify_password(&req.password, &user.password_hash) {
        return Err(ApiError::invalid_credentials());
    }

    let access_token = generate_access_token();
    let token_hash = hash_access_token(&access_token);
    let expires_at = Utc::now() + Duration::hours(state.session_ttl_hours);

    let session: SessionTokenRow = sqlx::query_as::<_, SessionTokenRow>(
        r#"
        INSERT INTO session_token (user_id, session_token_hash, device_name, expires_at)
        VALUES ($1, $2, $3, $4)
        RETURNING session_token_id, expires_at
        "#,
    )
    .bind(user.user_id)
    .bind(&token_hash)
    .bind(req.device_name.as_deref())
    .bind(expires_at)
    .fetch_one(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    Ok(Json(LoginResponse {
        data: LoginResponseData {
            access_token,
            expires_at: session.expires_at,
            user: UserProfile {
                user_id: user.user_id,
                username: user.username,
                display_name: user.display_name,
                role: role_to_string(user.role),
            },
        },
    }))
}

/* ============================================================
   GET /auth/me
   ============================================================ */

pub async fn me(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<MeResponse>, ApiError> {
    let user: UserRow = sqlx::query_as::<_, UserRow>(
        r#"
        SELECT user_id, username, display_name, password_hash, role, is_active
        FROM app_user
        WHERE user_id = $1
        "#,
    )
    .bind(auth.user_id)
    .fetch_optional(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?
    .ok_or_else(ApiError::session_expired)?;

    if !user.is_active {
        return Err(ApiError::session_expired());
    }

    let session: SessionTokenRow = sqlx::query_as::<_, SessionTokenRow>(
        r#"
        SELECT session_token_id, expires_at
        FROM session_token
        WHERE session_token_id = $1
          AND user_id = $2
          AND revoked_at IS NULL
          AND expires_at > now()
        "#,
    )
    .bind(auth.session_token_id)
    .bind(auth.user_id)
    .fetch_optional(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?
    .ok_or_else(ApiError::session_expired)?;

    Ok(Json(MeResponse {
        data: MeResponseData {
            user: UserProfile {
                user_id: user.user_id,
                username: user.username,
                display_name: user.display_name,
                role: role_to_string(user.role),
            },
            session: SessionInfo {
                session_token_id: session.session_token_id,
                expires_at: session.expires_at,
            },
        },
    }))
}

/* ============================================================
   POST /auth/logout
   ============================================================ */

pub async fn logout(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<OkResponse>, ApiError> {
    let rows = sqlx::query(
        r#"
        UPDATE session_token
        SET revoked_at = now()
        WHERE session_token_id = $1
          AND user_id = $2
          AND revoked_at IS NULL
        "#,
    )
    .bind(auth.session_token_id)
    .bind(auth.user_id)
    .execute(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    if rows.rows_affected() == 0 {
        return Err(ApiError::session_expired());
    }

    Ok(Json(OkResponse {
        data: OkData { ok: true },
    }))
}
