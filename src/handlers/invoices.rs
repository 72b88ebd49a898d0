use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use rust_decimal::Decimal;
use sqlx::PgConnection;
use tower_cookies::Cookies;
use uuid::Uuid;

use crate::{
    database::Database,
    error::{AppError, AppResult},
    ledger,
    middleware::current_user,
    models::{
        invoice::{line_gst, line_total, payable_amount, payment_status_for, STATUS_PENDING},
        stock::TXN_OUT,
        CreateInvoice, InvoiceItemRow, InvoiceResponse, InvoiceRow, Item, PaymentPayload,
    },
    AppState,
};

const INVOICE_COLUMNS: &str = r#"
    i.id, i.invoice_no, i.customer_id, c.name AS customer_name, i.date,
    i.total_amount, i.gst_amount, i.discount, i.payment_status,
    i.paid_amount, i.payment_method, i.payment_reference, i.paid_at
"#;

pub async fn list_invoices(
    State(state): State<AppState>,
    headers: HeaderMap,
    cookies: Cookies,
) -> AppResult<Json<Vec<InvoiceResponse>>> {
    current_user(&state, &headers, &cookies).await?;

    let rows = sqlx::query_as::<_, InvoiceRow>(&format!(
        r#"
        SELECT {INVOICE_COLUMNS}
        FROM invoices i
        LEFT JOIN customers c ON c.id = i.customer_id
        ORDER BY i.date DESC
        "#
    ))
    .fetch_all(&state.db)
    .await?;

    let mut invoices = Vec::with_capacity(rows.len());
    for row in rows {
        let items = load_invoice_items(&state.db, row.id).await?;
        invoices.push(InvoiceResponse::new(row, items));
    }

    Ok(Json(invoices))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    headers: HeaderMap,
    cookies: Cookies,
    Path(invoice_id): Path<Uuid>,
) -> AppResult<Json<InvoiceResponse>> {
    current_user(&state, &headers, &cookies).await?;

    let row = fetch_invoice_row(&state.db, invoice_id)
        .await?
        .ok_or(AppError::NotFound("invoice"))?;
    let items = load_invoice_items(&state.db, invoice_id).await?;

    Ok(Json(InvoiceResponse::new(row, items)))
}

/// Creates an invoice in one database transaction: issue the next invoice
/// number under a row lock, snapshot price/GST per line, re-derive available
/// stock from the ledger and debit it, then write the totals. Any failure
/// rolls the whole thing back, including the number.
pub async fn create_invoice(
    State(state): State<AppState>,
    headers: HeaderMap,
    cookies: Cookies,
    Json(payload): Json<CreateInvoice>,
) -> AppResult<(StatusCode, Json<InvoiceResponse>)> {
    current_user(&state, &headers, &cookies).await?;

    payload.validate().map_err(AppError::Validation)?;

    let mut tx = state.db.begin().await?;

    if let Some(customer_id) = payload.customer {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM customers WHERE id = $1)",
        )
        .bind(customer_id)
        .fetch_one(&mut *tx)
        .await?;
        if !exists {
            return Err(AppError::NotFound("customer"));
        }
    }

    let invoice_no = next_invoice_number(&mut tx).await?.to_string();

    let invoice_id = sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO invoices (invoice_no, customer_id, discount, payment_status)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(&invoice_no)
    .bind(payload.customer)
    .bind(payload.discount)
    .bind(STATUS_PENDING)
    .fetch_one(&mut *tx)
    .await?;

    let mut subtotal = Decimal::ZERO;
    let mut gst_total = Decimal::ZERO;
    let mut affected_items: Vec<Uuid> = Vec::new();

    for line in &payload.items {
        let item = sqlx::query_as::<_, Item>("SELECT * FROM items WHERE id = $1 FOR UPDATE")
            .bind(line.item)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AppError::NotFound("item"))?;

        let price = line.price.unwrap_or(item.price);
        let gst_percent = line.gst_percent.unwrap_or(item.gst_percent);

        let available = ledger::current_stock_for_item(&mut tx, item.id).await?;
        if line.quantity > available {
            let mut message = format!(
                "Not enough stock for {} ({}). Available: {}",
                item.name, item.sku, available
            );
            if available == Decimal::ZERO {
                message.push_str(". Please add Stock IN transactions first.");
            }
            return Err(AppError::conflict(message));
        }

        sqlx::query(
            r#"
            INSERT INTO invoice_items (invoice_id, item_id, quantity, price, gst_percent)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(invoice_id)
        .bind(item.id)
        .bind(line.quantity)
        .bind(price)
        .bind(gst_percent)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO stock_transactions (item_id, txn_type, quantity, note)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(item.id)
        .bind(TXN_OUT)
        .bind(line.quantity)
        .bind(format!("Invoice {invoice_no}"))
        .execute(&mut *tx)
        .await?;

        ledger::current_stock_for_item(&mut tx, item.id).await?;

        subtotal += line_total(price, line.quantity);
        gst_total += line_gst(price, line.quantity, gst_percent);
        if !affected_items.contains(&item.id) {
            affected_items.push(item.id);
        }
    }

    if payload.discount > subtotal + gst_total {
        return Err(AppError::validation("Discount exceeds invoice total."));
    }

    sqlx::query("UPDATE invoices SET total_amount = $1, gst_amount = $2 WHERE id = $3")
        .bind(subtotal)
        .bind(gst_total)
        .bind(invoice_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    let row = fetch_invoice_row(&state.db, invoice_id)
        .await?
        .ok_or(AppError::NotFound("invoice"))?;
    let items = load_invoice_items(&state.db, invoice_id).await?;
    let response = InvoiceResponse::new(row, items);

    let post_commit = state.clone();
    tokio::spawn(async move {
        if let Ok(Some(row)) = fetch_invoice_row(&post_commit.db, invoice_id).await {
            let payable = payable_amount(row.total_amount, row.gst_amount, row.discount);
            post_commit
                .notifier
                .invoice_created(&post_commit.db, &row, payable)
                .await;
        }
        for item_id in affected_items {
            ledger::run_low_stock_check(&post_commit, item_id).await;
        }
    });

    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn confirm_payment(
    State(state): State<AppState>,
    headers: HeaderMap,
    cookies: Cookies,
    Path(invoice_id): Path<Uuid>,
    Json(payload): Json<PaymentPayload>,
) -> AppResult<Json<InvoiceResponse>> {
    current_user(&state, &headers, &cookies).await?;

    payload.validate().map_err(AppError::Validation)?;

    let mut tx = state.db.begin().await?;

    let row = sqlx::query_as::<_, InvoiceRow>(&format!(
        r#"
        SELECT {INVOICE_COLUMNS}
        FROM invoices i
        LEFT JOIN customers c ON c.id = i.customer_id
        WHERE i.id = $1
        FOR UPDATE OF i
        "#
    ))
    .bind(invoice_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound("invoice"))?;

    let due = payable_amount(row.total_amount, row.gst_amount, row.discount);
    let status = payment_status_for(payload.amount, due);

    sqlx::query(
        r#"
        UPDATE invoices
        SET payment_status = $1, paid_amount = $2, payment_method = $3,
            payment_reference = $4, paid_at = NOW()
        WHERE id = $5
        "#,
    )
    .bind(status)
    .bind(payload.amount)
    .bind(payload.method.trim())
    .bind(payload.reference.trim())
    .bind(invoice_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    let row = fetch_invoice_row(&state.db, invoice_id)
        .await?
        .ok_or(AppError::NotFound("invoice"))?;
    let items = load_invoice_items(&state.db, invoice_id).await?;
    let response = InvoiceResponse::new(row, items);

    let post_commit = state.clone();
    let amount = payload.amount;
    let method = payload.method.trim().to_string();
    let reference = payload.reference.trim().to_string();
    tokio::spawn(async move {
        if let Ok(Some(row)) = fetch_invoice_row(&post_commit.db, invoice_id).await {
            post_commit
                .notifier
                .payment_confirmed(&post_commit.db, &row, amount, &method, &reference)
                .await;
        }
    });

    Ok(Json(response))
}

/// Next sequential invoice number, issued under FOR UPDATE on the singleton
/// counter row. Caps at max_number.
async fn next_invoice_number(conn: &mut PgConnection) -> AppResult<i32> {
    let row = sqlx::query_as::<_, (i32, i32)>(
        "SELECT current, max_number FROM invoice_number_sequence WHERE id = 1 FOR UPDATE",
    )
    .fetch_optional(&mut *conn)
    .await?;

    let (current, max_number) = match row {
        Some(row) => row,
        None => {
            // Seed row missing (fresh database restored without it)
            sqlx::query(
                "INSERT INTO invoice_number_sequence (id) VALUES (1) ON CONFLICT (id) DO NOTHING",
            )
            .execute(&mut *conn)
            .await?;
            sqlx::query_as::<_, (i32, i32)>(
                "SELECT current, max_number FROM invoice_number_sequence WHERE id = 1 FOR UPDATE",
            )
            .fetch_one(&mut *conn)
            .await?
        }
    };

    if current >= max_number {
        return Err(AppError::conflict(
            "Maximum invoice number reached. Please reset the tracker.",
        ));
    }

    sqlx::query("UPDATE invoice_number_sequence SET current = current + 1 WHERE id = 1")
        .execute(&mut *conn)
        .await?;

    Ok(current + 1)
}

pub async fn fetch_invoice_row(
    db: &Database,
    invoice_id: Uuid,
) -> Result<Option<InvoiceRow>, sqlx::Error> {
    sqlx::query_as::<_, InvoiceRow>(&format!(
        r#"
        SELECT {INVOICE_COLUMNS}
        FROM invoices i
        LEFT JOIN customers c ON c.id = i.customer_id
        WHERE i.id = $1
        "#
    ))
    .bind(invoice_id)
    .fetch_optional(db)
    .await
}

pub async fn load_invoice_items(
    db: &Database,
    invoice_id: Uuid,
) -> Result<Vec<InvoiceItemRow>, sqlx::Error> {
    sqlx::query_as::<_, InvoiceItemRow>(
        r#"
        SELECT ii.id, ii.item_id, it.name AS item_name, it.sku AS item_sku,
               ii.quantity, ii.price, ii.gst_percent
        FROM invoice_items ii
        JOIN items it ON it.id = ii.item_id
        WHERE ii.invoice_id = $1
        "#,
    )
    .bind(invoice_id)
    .fetch_all(db)
    .await
}

pub async fn invoices_for_customer(
    db: &Database,
    customer_id: Uuid,
) -> Result<Vec<InvoiceResponse>, sqlx::Error> {
    let rows = sqlx::query_as::<_, InvoiceRow>(&format!(
        r#"
        SELECT {INVOICE_COLUMNS}
        FROM invoices i
        LEFT JOIN customers c ON c.id = i.customer_id
        WHERE i.customer_id = $1
        ORDER BY i.date DESC
        "#
    ))
    .bind(customer_id)
    .fetch_all(db)
    .await?;

    let mut invoices = Vec::with_capacity(rows.len());
    for row in rows {
        let items = load_invoice_items(db, row.id).await?;
        invoices.push(InvoiceResponse::new(row, items));
    }

    Ok(invoices)
}
