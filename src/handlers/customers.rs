use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tower_cookies::Cookies;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    handlers::invoices::invoices_for_customer,
    models::{Customer, CustomerExportRow, CustomerPayload, InvoiceResponse},
    AppState,
};
use crate::middleware::current_user;

#[derive(Debug, Deserialize)]
pub struct CustomerListQuery {
    pub search: Option<String>,
}

pub async fn list_customers(
    State(state): State<AppState>,
    headers: HeaderMap,
    cookies: Cookies,
    Query(query): Query<CustomerListQuery>,
) -> AppResult<Json<Vec<Customer>>> {
    current_user(&state, &headers, &cookies).await?;

    let pattern = query
        .search
        .as_deref()
        .map(|s| format!("%{}%", s.trim()))
        .filter(|p| p != "%%");

    let customers = sqlx::query_as::<_, Customer>(
        r#"
        SELECT * FROM customers
        WHERE ($1::text IS NULL OR name ILIKE $1 OR phone ILIKE $1)
        ORDER BY created_at DESC
        "#,
    )
    .bind(pattern)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(customers))
}

pub async fn create_customer(
    State(state): State<AppState>,
    headers: HeaderMap,
    cookies: Cookies,
    Json(payload): Json<CustomerPayload>,
) -> AppResult<(StatusCode, Json<Customer>)> {
    current_user(&state, &headers, &cookies).await?;

    payload.validate().map_err(AppError::Validation)?;

    let customer = sqlx::query_as::<_, Customer>(
        r#"
        INSERT INTO customers (name, phone, email, address)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(payload.name.trim())
    .bind(payload.phone.trim())
    .bind(&payload.email)
    .bind(&payload.address)
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(customer)))
}

pub async fn get_customer(
    State(state): State<AppState>,
    headers: HeaderMap,
    cookies: Cookies,
    Path(customer_id): Path<Uuid>,
) -> AppResult<Json<Customer>> {
    current_user(&state, &headers, &cookies).await?;

    let customer = fetch_customer(&state, customer_id).await?;
    Ok(Json(customer))
}

pub async fn update_customer(
    State(state): State<AppState>,
    headers: HeaderMap,
    cookies: Cookies,
    Path(customer_id): Path<Uuid>,
    Json(payload): Json<CustomerPayload>,
) -> AppResult<Json<Customer>> {
    current_user(&state, &headers, &cookies).await?;

    payload.validate().map_err(AppError::Validation)?;

    let customer = sqlx::query_as::<_, Customer>(
        r#"
        UPDATE customers
        SET name = $1, phone = $2, email = $3, address = $4
        WHERE id = $5
        RETURNING *
        "#,
    )
    .bind(payload.name.trim())
    .bind(payload.phone.trim())
    .bind(&payload.email)
    .bind(&payload.address)
    .bind(customer_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or(AppError::NotFound("customer"))?;

    Ok(Json(customer))
}

pub async fn delete_customer(
    State(state): State<AppState>,
    headers: HeaderMap,
    cookies: Cookies,
    Path(customer_id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    current_user(&state, &headers, &cookies).await?;

    let result = sqlx::query("DELETE FROM customers WHERE id = $1")
        .bind(customer_id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("customer"));
    }

    Ok(Json(json!({ "status": "deleted" })))
}

/// Invoices for one customer, newest first.
pub async fn customer_history(
    State(state): State<AppState>,
    headers: HeaderMap,
    cookies: Cookies,
    Path(customer_id): Path<Uuid>,
) -> AppResult<Json<Vec<InvoiceResponse>>> {
    current_user(&state, &headers, &cookies).await?;

    fetch_customer(&state, customer_id).await?;
    let invoices = invoices_for_customer(&state.db, customer_id).await?;
    Ok(Json(invoices))
}

/// Directory export with billing totals per customer.
pub async fn export_customers(
    State(state): State<AppState>,
    headers: HeaderMap,
    cookies: Cookies,
) -> AppResult<impl IntoResponse> {
    current_user(&state, &headers, &cookies).await?;

    let rows = sqlx::query_as::<_, CustomerExportRow>(
        r#"
        SELECT c.name, c.phone, c.email, c.address,
               COUNT(i.id) AS invoice_count,
               COALESCE(SUM(i.total_amount + i.gst_amount - i.discount), 0) AS lifetime_value
        FROM customers c
        LEFT JOIN invoices i ON i.customer_id = c.id
        GROUP BY c.id, c.name, c.phone, c.email, c.address
        ORDER BY c.name
        "#,
    )
    .fetch_all(&state.db)
    .await?;

    let body = render_customer_csv(&rows);

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=customers.csv",
            ),
        ],
        body,
    ))
}

async fn fetch_customer(state: &AppState, customer_id: Uuid) -> AppResult<Customer> {
    sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = $1")
        .bind(customer_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::NotFound("customer"))
}

fn render_customer_csv(rows: &[CustomerExportRow]) -> String {
    let mut out = String::from("Name,Phone,Email,Address,Invoices,Total Billed\n");
    for row in rows {
        let fields = [
            row.name.as_str(),
            row.phone.as_str(),
            row.email.as_deref().unwrap_or(""),
            row.address.as_deref().unwrap_or(""),
            &row.invoice_count.to_string(),
            &row.lifetime_value.to_string(),
        ]
        .map(csv_escape);
        out.push_str(&fields.join(","));
        out.push('\n');
    }
    out
}

fn csv_escape(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn csv_escape_doubles_quotes() {
        assert_eq!(csv_escape("plain"), "\"plain\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn csv_render_includes_header_and_rows() {
        let rows = vec![CustomerExportRow {
            name: "Acme, Inc".into(),
            phone: "123".into(),
            email: None,
            address: Some("1 Main St".into()),
            invoice_count: 2,
            lifetime_value: Decimal::from(500),
        }];
        let csv = render_customer_csv(&rows);
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("Name,Phone,Email,Address,Invoices,Total Billed"));
        assert_eq!(
            lines.next(),
            Some("\"Acme, Inc\",\"123\",\"\",\"1 Main St\",\"2\",\"500\"")
        );
    }
}
