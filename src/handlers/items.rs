use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tower_cookies::Cookies;
use uuid::Uuid;

use crate::{
    error::{is_foreign_key_violation, is_unique_violation, AppError, AppResult},
    middleware::{current_user, require_admin},
    models::{Item, ItemPayload},
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct ItemListQuery {
    pub search: Option<String>,
}

pub async fn list_items(
    State(state): State<AppState>,
    headers: HeaderMap,
    cookies: Cookies,
    Query(query): Query<ItemListQuery>,
) -> AppResult<Json<Vec<Item>>> {
    current_user(&state, &headers, &cookies).await?;

    let pattern = query
        .search
        .as_deref()
        .map(|s| format!("%{}%", s.trim()))
        .filter(|p| p != "%%");

    let items = sqlx::query_as::<_, Item>(
        r#"
        SELECT * FROM items
        WHERE ($1::text IS NULL OR name ILIKE $1 OR sku ILIKE $1)
        ORDER BY created_at DESC
        "#,
    )
    .bind(pattern)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(items))
}

pub async fn create_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    cookies: Cookies,
    Json(payload): Json<ItemPayload>,
) -> AppResult<(StatusCode, Json<Item>)> {
    let user = current_user(&state, &headers, &cookies).await?;
    require_admin(&user)?;

    payload.validate().map_err(AppError::Validation)?;

    let item = sqlx::query_as::<_, Item>(
        r#"
        INSERT INTO items (name, sku, unit, brand, price, gst_percent)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(payload.name.trim())
    .bind(payload.sku.trim())
    .bind(&payload.unit)
    .bind(payload.brand.trim())
    .bind(payload.price)
    .bind(payload.gst_percent)
    .fetch_one(&state.db)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::conflict("An item with this SKU already exists.")
        } else {
            AppError::Database(e)
        }
    })?;

    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn get_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    cookies: Cookies,
    Path(item_id): Path<Uuid>,
) -> AppResult<Json<Item>> {
    current_user(&state, &headers, &cookies).await?;

    let item = sqlx::query_as::<_, Item>("SELECT * FROM items WHERE id = $1")
        .bind(item_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::NotFound("item"))?;

    Ok(Json(item))
}

/// Cached stock fields are owned by the ledger and never writable here.
pub async fn update_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    cookies: Cookies,
    Path(item_id): Path<Uuid>,
    Json(payload): Json<ItemPayload>,
) -> AppResult<Json<Item>> {
    let user = current_user(&state, &headers, &cookies).await?;
    require_admin(&user)?;

    payload.validate().map_err(AppError::Validation)?;

    let item = sqlx::query_as::<_, Item>(
        r#"
        UPDATE items
        SET name = $1, sku = $2, unit = $3, brand = $4, price = $5, gst_percent = $6,
            updated_at = NOW()
        WHERE id = $7
        RETURNING *
        "#,
    )
    .bind(payload.name.trim())
    .bind(payload.sku.trim())
    .bind(&payload.unit)
    .bind(payload.brand.trim())
    .bind(payload.price)
    .bind(payload.gst_percent)
    .bind(item_id)
    .fetch_optional(&state.db)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::conflict("An item with this SKU already exists.")
        } else {
            AppError::Database(e)
        }
    })?
    .ok_or(AppError::NotFound("item"))?;

    Ok(Json(item))
}

pub async fn delete_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    cookies: Cookies,
    Path(item_id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let user = current_user(&state, &headers, &cookies).await?;
    require_admin(&user)?;

    // Items on an invoice are kept for the billing history (ON DELETE RESTRICT)
    let result = sqlx::query("DELETE FROM items WHERE id = $1")
        .bind(item_id)
        .execute(&state.db)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                AppError::conflict("This item appears on existing invoices and cannot be deleted.")
            } else {
                AppError::Database(e)
            }
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("item"));
    }

    Ok(Json(json!({ "status": "deleted" })))
}
