use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tower_cookies::Cookies;
use uuid::Uuid;

use crate::{
    config::parse_threshold,
    error::{AppError, AppResult},
    handlers::invoices::invoices_for_customer,
    middleware::{current_user, require_admin},
    models::{Customer, InvoiceResponse, StockAggregateRow, StockReportEntry},
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct DateRangeQuery {
    pub start: Option<String>,
    pub end: Option<String>,
    pub search: Option<String>,
    pub threshold: Option<String>,
}

/// Malformed dates are treated as absent, matching the list filters.
fn parse_date(value: Option<&str>) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value?, "%Y-%m-%d").ok()
}

#[derive(Debug, Serialize)]
struct RangeFilters {
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct DailySalesRow {
    pub day: NaiveDate,
    pub invoice_count: i64,
    pub subtotal: Decimal,
    pub gst_total: Decimal,
    pub discount_total: Decimal,
    pub payable_total: Decimal,
}

#[derive(Debug, Serialize, FromRow)]
pub struct SalesSummary {
    pub invoice_count: i64,
    pub subtotal: Decimal,
    pub gst_total: Decimal,
    pub discount_total: Decimal,
    pub payable_total: Decimal,
}

#[derive(Debug, Serialize)]
pub struct DailySalesReport {
    filters: RangeFilters,
    summary: SalesSummary,
    results: Vec<DailySalesRow>,
}

pub async fn daily_sales(
    State(state): State<AppState>,
    headers: HeaderMap,
    cookies: Cookies,
    Query(query): Query<DateRangeQuery>,
) -> AppResult<Json<DailySalesReport>> {
    let user = current_user(&state, &headers, &cookies).await?;
    require_admin(&user)?;

    let start = parse_date(query.start.as_deref());
    let end = parse_date(query.end.as_deref());

    let results = sqlx::query_as::<_, DailySalesRow>(
        r#"
        SELECT date::date AS day,
               COUNT(*) AS invoice_count,
               COALESCE(SUM(total_amount), 0) AS subtotal,
               COALESCE(SUM(gst_amount), 0) AS gst_total,
               COALESCE(SUM(discount), 0) AS discount_total,
               COALESCE(SUM(total_amount + gst_amount - discount), 0) AS payable_total
        FROM invoices
        WHERE ($1::date IS NULL OR date::date >= $1)
          AND ($2::date IS NULL OR date::date <= $2)
        GROUP BY day
        ORDER BY day DESC
        "#,
    )
    .bind(start)
    .bind(end)
    .fetch_all(&state.db)
    .await?;

    let summary = sqlx::query_as::<_, SalesSummary>(
        r#"
        SELECT COUNT(*) AS invoice_count,
               COALESCE(SUM(total_amount), 0) AS subtotal,
               COALESCE(SUM(gst_amount), 0) AS gst_total,
               COALESCE(SUM(discount), 0) AS discount_total,
               COALESCE(SUM(total_amount + gst_amount - discount), 0) AS payable_total
        FROM invoices
        WHERE ($1::date IS NULL OR date::date >= $1)
          AND ($2::date IS NULL OR date::date <= $2)
        "#,
    )
    .bind(start)
    .bind(end)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(DailySalesReport {
        filters: RangeFilters { start, end },
        summary,
        results,
    }))
}

#[derive(Debug, Serialize)]
pub struct StockReport {
    threshold: Decimal,
    count: usize,
    results: Vec<StockReportEntry>,
}

/// Reads the cached totals on items; the ledger-derived variant lives under
/// /api/inventory/stock-report.
pub async fn stock_report(
    State(state): State<AppState>,
    headers: HeaderMap,
    cookies: Cookies,
    Query(query): Query<DateRangeQuery>,
) -> AppResult<Json<StockReport>> {
    let user = current_user(&state, &headers, &cookies).await?;
    require_admin(&user)?;

    let threshold = parse_threshold(query.threshold.as_deref());
    let pattern = query
        .search
        .as_deref()
        .map(|s| format!("%{}%", s.trim()))
        .filter(|p| p != "%%");

    let rows = sqlx::query_as::<_, StockAggregateRow>(
        r#"
        SELECT id AS item_id, name, sku, unit,
               total_in_stock AS total_in, total_out_stock AS total_out
        FROM items
        WHERE ($1::text IS NULL OR name ILIKE $1 OR sku ILIKE $1)
        ORDER BY name
        "#,
    )
    .bind(pattern)
    .fetch_all(&state.db)
    .await?;

    let results: Vec<StockReportEntry> = rows
        .into_iter()
        .map(|row| StockReportEntry::from_aggregate(row, threshold))
        .collect();

    Ok(Json(StockReport {
        threshold,
        count: results.len(),
        results,
    }))
}

#[derive(Debug, Serialize)]
pub struct CustomerHistoryReport {
    customer: Customer,
    summary: SalesSummary,
    invoices: Vec<InvoiceResponse>,
}

pub async fn customer_history(
    State(state): State<AppState>,
    headers: HeaderMap,
    cookies: Cookies,
    Path(customer_id): Path<Uuid>,
) -> AppResult<Json<CustomerHistoryReport>> {
    let user = current_user(&state, &headers, &cookies).await?;
    require_admin(&user)?;

    let customer = sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = $1")
        .bind(customer_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::NotFound("customer"))?;

    let summary = sqlx::query_as::<_, SalesSummary>(
        r#"
        SELECT COUNT(*) AS invoice_count,
               COALESCE(SUM(total_amount), 0) AS subtotal,
               COALESCE(SUM(gst_amount), 0) AS gst_total,
               COALESCE(SUM(discount), 0) AS discount_total,
               COALESCE(SUM(total_amount + gst_amount - discount), 0) AS payable_total
        FROM invoices
        WHERE customer_id = $1
        "#,
    )
    .bind(customer_id)
    .fetch_one(&state.db)
    .await?;

    let invoices = invoices_for_customer(&state.db, customer_id).await?;

    Ok(Json(CustomerHistoryReport {
        customer,
        summary,
        invoices,
    }))
}

#[derive(Debug, Serialize, FromRow)]
pub struct ItemSalesRow {
    pub item_id: Uuid,
    pub name: String,
    pub sku: String,
    pub unit: String,
    pub total_quantity: Decimal,
    pub subtotal: Decimal,
    pub gst_total: Decimal,
    pub invoice_count: i64,
}

#[derive(Debug, Serialize)]
pub struct ItemSalesSummary {
    pub items: usize,
    pub total_quantity: Decimal,
    pub subtotal: Decimal,
    pub gst_total: Decimal,
    pub payable_total: Decimal,
}

#[derive(Debug, Serialize)]
pub struct ItemSalesReport {
    filters: RangeFilters,
    summary: ItemSalesSummary,
    results: Vec<ItemSalesRow>,
}

pub async fn item_sales(
    State(state): State<AppState>,
    headers: HeaderMap,
    cookies: Cookies,
    Query(query): Query<DateRangeQuery>,
) -> AppResult<Json<ItemSalesReport>> {
    let user = current_user(&state, &headers, &cookies).await?;
    require_admin(&user)?;

    let start = parse_date(query.start.as_deref());
    let end = parse_date(query.end.as_deref());
    let pattern = query
        .search
        .as_deref()
        .map(|s| format!("%{}%", s.trim()))
        .filter(|p| p != "%%");

    let results = sqlx::query_as::<_, ItemSalesRow>(
        r#"
        SELECT ii.item_id, it.name, it.sku, it.unit,
               SUM(ii.quantity) AS total_quantity,
               SUM(ii.price * ii.quantity) AS subtotal,
               SUM(ii.price * ii.quantity * ii.gst_percent / 100) AS gst_total,
               COUNT(DISTINCT ii.invoice_id) AS invoice_count
        FROM invoice_items ii
        JOIN items it ON it.id = ii.item_id
        JOIN invoices i ON i.id = ii.invoice_id
        WHERE ($1::date IS NULL OR i.date::date >= $1)
          AND ($2::date IS NULL OR i.date::date <= $2)
          AND ($3::text IS NULL OR it.name ILIKE $3 OR it.sku ILIKE $3)
        GROUP BY ii.item_id, it.name, it.sku, it.unit
        ORDER BY subtotal DESC
        "#,
    )
    .bind(start)
    .bind(end)
    .bind(pattern)
    .fetch_all(&state.db)
    .await?;

    let summary = summarize_item_sales(&results);

    Ok(Json(ItemSalesReport {
        filters: RangeFilters { start, end },
        summary,
        results,
    }))
}

fn summarize_item_sales(rows: &[ItemSalesRow]) -> ItemSalesSummary {
    let mut total_quantity = Decimal::ZERO;
    let mut subtotal = Decimal::ZERO;
    let mut gst_total = Decimal::ZERO;

    for row in rows {
        total_quantity += row.total_quantity;
        subtotal += row.subtotal;
        gst_total += row.gst_total;
    }

    ItemSalesSummary {
        items: rows.len(),
        total_quantity,
        subtotal,
        gst_total,
        payable_total: subtotal + gst_total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_parsing_tolerates_garbage() {
        assert_eq!(
            parse_date(Some("2026-08-01")),
            NaiveDate::from_ymd_opt(2026, 8, 1)
        );
        assert_eq!(parse_date(Some("01/08/2026")), None);
        assert_eq!(parse_date(None), None);
    }

    #[test]
    fn item_sales_summary_totals() {
        let rows = vec![
            ItemSalesRow {
                item_id: Uuid::new_v4(),
                name: "A".into(),
                sku: "A1".into(),
                unit: "pcs".into(),
                total_quantity: Decimal::from(4),
                subtotal: Decimal::from(100),
                gst_total: Decimal::from(18),
                invoice_count: 2,
            },
            ItemSalesRow {
                item_id: Uuid::new_v4(),
                name: "B".into(),
                sku: "B1".into(),
                unit: "kg".into(),
                total_quantity: Decimal::from(1),
                subtotal: Decimal::from(50),
                gst_total: Decimal::from(9),
                invoice_count: 1,
            },
        ];

        let summary = summarize_item_sales(&rows);
        assert_eq!(summary.items, 2);
        assert_eq!(summary.total_quantity, Decimal::from(5));
        assert_eq!(summary.subtotal, Decimal::from(150));
        assert_eq!(summary.gst_total, Decimal::from(27));
        assert_eq!(summary.payable_total, Decimal::from(177));
    }

    #[test]
    fn empty_item_sales_summary_is_zero() {
        let summary = summarize_item_sales(&[]);
        assert_eq!(summary.items, 0);
        assert_eq!(summary.payable_total, Decimal::ZERO);
    }
}
