use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use tower_cookies::{Cookie, Cookies};
use uuid::Uuid;

use crate::{
    error::{is_unique_violation, AppError, AppResult},
    middleware::{current_user, require_admin, CurrentUser},
    models::{CreateUser, LoginRequest, UpdateUser, User, UserResponse},
    utils::{create_token, hash_password, verify_password},
    AppState,
};

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserResponse,
}

pub async fn login(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1 AND is_active = TRUE")
        .bind(payload.email.trim())
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::Unauthorized)?;

    if !verify_password(&payload.password, &user.password_hash) {
        return Err(AppError::Unauthorized);
    }

    let token = create_token(user.id, user.email.clone(), user.role.clone(), &state.config.jwt_secret)
        .map_err(|e| AppError::Internal(format!("token creation failed: {e}")))?;

    sqlx::query("UPDATE users SET last_login = NOW() WHERE id = $1")
        .bind(user.id)
        .execute(&state.db)
        .await?;

    let cookie = Cookie::build(("auth_token", token.clone()))
        .path("/")
        .http_only(true)
        .build();
    cookies.add(cookie);

    Ok(Json(LoginResponse {
        token,
        user: UserResponse::from(user),
    }))
}

pub async fn logout(cookies: Cookies) -> Json<Value> {
    cookies.remove(Cookie::build(("auth_token", "")).path("/").build());
    Json(json!({ "status": "logged_out" }))
}

pub async fn me(
    State(state): State<AppState>,
    headers: HeaderMap,
    cookies: Cookies,
) -> AppResult<Json<CurrentUser>> {
    let user = current_user(&state, &headers, &cookies).await?;
    Ok(Json(user))
}

/// Staff accounts are provisioned by an admin; there is no open signup.
pub async fn create_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    cookies: Cookies,
    Json(payload): Json<CreateUser>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    let user = current_user(&state, &headers, &cookies).await?;
    require_admin(&user)?;

    payload.validate().map_err(AppError::Validation)?;

    let password_hash = hash_password(&payload.password)
        .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))?;

    let created = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (email, password_hash, first_name, last_name, role)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(payload.email.trim())
    .bind(&password_hash)
    .bind(payload.first_name.trim())
    .bind(payload.last_name.trim())
    .bind(&payload.role)
    .fetch_one(&state.db)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::conflict("A user with this email already exists.")
        } else {
            AppError::Database(e)
        }
    })?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(created))))
}

pub async fn list_users(
    State(state): State<AppState>,
    headers: HeaderMap,
    cookies: Cookies,
) -> AppResult<Json<Vec<UserResponse>>> {
    let user = current_user(&state, &headers, &cookies).await?;
    require_admin(&user)?;

    let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY email")
        .fetch_all(&state.db)
        .await?;

    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

pub async fn get_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    cookies: Cookies,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<UserResponse>> {
    let user = current_user(&state, &headers, &cookies).await?;
    require_admin(&user)?;

    let found = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::NotFound("user"))?;

    Ok(Json(UserResponse::from(found)))
}

/// Admin edit: rename, change email or role, set a new password, or
/// deactivate. Omitted password/role/is_active keep their stored values.
pub async fn update_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    cookies: Cookies,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<UpdateUser>,
) -> AppResult<Json<UserResponse>> {
    let user = current_user(&state, &headers, &cookies).await?;
    require_admin(&user)?;

    payload.validate().map_err(AppError::Validation)?;

    let password_hash = match &payload.password {
        Some(password) => Some(
            hash_password(password)
                .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))?,
        ),
        None => None,
    };

    let updated = sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET email = $1, first_name = $2, last_name = $3,
            password_hash = COALESCE($4, password_hash),
            role = COALESCE($5, role),
            is_active = COALESCE($6, is_active),
            updated_at = NOW()
        WHERE id = $7
        RETURNING *
        "#,
    )
    .bind(payload.email.trim())
    .bind(payload.first_name.trim())
    .bind(payload.last_name.trim())
    .bind(password_hash)
    .bind(&payload.role)
    .bind(payload.is_active)
    .bind(user_id)
    .fetch_optional(&state.db)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::conflict("A user with this email already exists.")
        } else {
            AppError::Database(e)
        }
    })?
    .ok_or(AppError::NotFound("user"))?;

    Ok(Json(UserResponse::from(updated)))
}
