use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};
use tower_cookies::Cookies;

use crate::{
    config::parse_threshold,
    error::{AppError, AppResult},
    ledger,
    middleware::{current_user, require_admin},
    models::{
        stock::TXN_OUT, CreateStockTransaction, Item, StockAggregateRow, StockReportEntry,
        StockTransaction, StockTransactionFilter, StockTransactionRow,
    },
    AppState,
};

pub async fn list_transactions(
    State(state): State<AppState>,
    headers: HeaderMap,
    cookies: Cookies,
    Query(filter): Query<StockTransactionFilter>,
) -> AppResult<Json<Vec<StockTransactionRow>>> {
    current_user(&state, &headers, &cookies).await?;

    // Unknown txn_type values are ignored rather than rejected, as are
    // non-positive limits.
    let txn_type = filter
        .txn_type
        .filter(|t| t == "IN" || t == "OUT");
    let limit = filter.limit.filter(|l| *l > 0);

    let rows = sqlx::query_as::<_, StockTransactionRow>(
        r#"
        SELECT st.id, st.item_id, i.name AS item_name, i.sku AS item_sku,
               st.txn_type, st.quantity, st.note, st.created_at
        FROM stock_transactions st
        JOIN items i ON i.id = st.item_id
        WHERE ($1::uuid IS NULL OR st.item_id = $1)
          AND ($2::text IS NULL OR st.txn_type = $2)
        ORDER BY st.created_at DESC
        LIMIT $3
        "#,
    )
    .bind(filter.item)
    .bind(txn_type)
    .bind(limit)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(rows))
}

pub async fn create_transaction(
    State(state): State<AppState>,
    headers: HeaderMap,
    cookies: Cookies,
    Json(payload): Json<CreateStockTransaction>,
) -> AppResult<(StatusCode, Json<StockTransaction>)> {
    let user = current_user(&state, &headers, &cookies).await?;
    require_admin(&user)?;

    payload.validate().map_err(AppError::Validation)?;

    let mut tx = state.db.begin().await?;

    // Lock the item row so concurrent debits serialize on the stock check.
    let item = sqlx::query_as::<_, Item>("SELECT * FROM items WHERE id = $1 FOR UPDATE")
        .bind(payload.item)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotFound("item"))?;

    if payload.txn_type == TXN_OUT {
        let available = ledger::current_stock_for_item(&mut tx, item.id).await?;
        if payload.quantity > available {
            return Err(AppError::conflict(format!(
                "Cannot OUT {}. Only {} in stock.",
                payload.quantity, available
            )));
        }
    }

    let created = sqlx::query_as::<_, StockTransaction>(
        r#"
        INSERT INTO stock_transactions (item_id, txn_type, quantity, note)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(item.id)
    .bind(&payload.txn_type)
    .bind(payload.quantity)
    .bind(payload.note.trim())
    .fetch_one(&mut *tx)
    .await?;

    // Bring the cached totals up to date with the new ledger row.
    ledger::current_stock_for_item(&mut tx, item.id).await?;

    tx.commit().await?;

    let post_commit = state.clone();
    let item_id = item.id;
    tokio::spawn(async move {
        ledger::run_low_stock_check(&post_commit, item_id).await;
    });

    Ok((StatusCode::CREATED, Json(created)))
}

#[derive(Debug, Deserialize)]
pub struct StockReportQuery {
    pub threshold: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StockReportResponse {
    pub threshold: rust_decimal::Decimal,
    pub count: usize,
    pub results: Vec<StockReportEntry>,
}

async fn ledger_aggregates(
    state: &AppState,
    search: Option<&str>,
) -> AppResult<Vec<StockAggregateRow>> {
    let pattern = search
        .map(|s| format!("%{}%", s.trim()))
        .filter(|p| p != "%%");

    let rows = sqlx::query_as::<_, StockAggregateRow>(
        r#"
        SELECT i.id AS item_id, i.name, i.sku, i.unit,
               COALESCE(SUM(st.quantity) FILTER (WHERE st.txn_type = 'IN'), 0) AS total_in,
               COALESCE(SUM(st.quantity) FILTER (WHERE st.txn_type = 'OUT'), 0) AS total_out
        FROM items i
        LEFT JOIN stock_transactions st ON st.item_id = i.id
        WHERE ($1::text IS NULL OR i.name ILIKE $1 OR i.sku ILIKE $1)
        GROUP BY i.id, i.name, i.sku, i.unit
        ORDER BY i.name
        "#,
    )
    .bind(pattern)
    .fetch_all(&state.db)
    .await?;

    Ok(rows)
}

pub async fn stock_report(
    State(state): State<AppState>,
    headers: HeaderMap,
    cookies: Cookies,
    Query(query): Query<StockReportQuery>,
) -> AppResult<Json<StockReportResponse>> {
    current_user(&state, &headers, &cookies).await?;

    let threshold = parse_threshold(query.threshold.as_deref());
    let results: Vec<StockReportEntry> = ledger_aggregates(&state, query.search.as_deref())
        .await?
        .into_iter()
        .map(|row| StockReportEntry::from_aggregate(row, threshold))
        .collect();

    Ok(Json(StockReportResponse {
        threshold,
        count: results.len(),
        results,
    }))
}

pub async fn low_stock(
    State(state): State<AppState>,
    headers: HeaderMap,
    cookies: Cookies,
    Query(query): Query<StockReportQuery>,
) -> AppResult<Json<StockReportResponse>> {
    current_user(&state, &headers, &cookies).await?;

    let threshold = parse_threshold(query.threshold.as_deref());
    let results: Vec<StockReportEntry> = ledger_aggregates(&state, None)
        .await?
        .into_iter()
        .map(|row| StockReportEntry::from_aggregate(row, threshold))
        .filter(|entry| entry.is_low_stock)
        .collect();

    Ok(Json(StockReportResponse {
        threshold,
        count: results.len(),
        results,
    }))
}

pub async fn current_stock(
    State(state): State<AppState>,
    headers: HeaderMap,
    cookies: Cookies,
    Query(query): Query<StockReportQuery>,
) -> AppResult<Json<Vec<StockReportEntry>>> {
    current_user(&state, &headers, &cookies).await?;

    let threshold = parse_threshold(query.threshold.as_deref());
    let results = ledger_aggregates(&state, None)
        .await?
        .into_iter()
        .map(|row| StockReportEntry::from_aggregate(row, threshold))
        .collect();

    Ok(Json(results))
}
